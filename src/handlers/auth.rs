use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{self, password, Role};
use crate::config;
use crate::error::{on_unique_violation, ApiError};
use crate::middleware::AuthUser;
use crate::models::{AccountRow, AccountSummary, CreatedAccount};
use crate::response::{ApiResponse, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub role: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub role: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: AccountRow,
    pub token: String,
}

/// POST /api/auth/create-user - self-registration into a role partition
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<CreatedAccount> {
    let (Some(role_tag), Some(name), Some(email), Some(plain)) =
        (body.role, body.name, body.email, body.password)
    else {
        return Err(ApiError::bad_request("Please provide all required fields"));
    };

    let hashed = password::hash(&plain, config::config().security.bcrypt_cost)?;

    // The supplied role tag selects the partition; unrecognized tags land in
    // the generic users table with their tag stored verbatim.
    let partition = Role::parse(&role_tag).partition();
    let sql = format!(
        "INSERT INTO {} (role, name, password, email) VALUES ($1, $2, $3, $4) \
         RETURNING id, name, email, role, created_at",
        partition.table
    );

    let account: CreatedAccount = sqlx::query_as(&sql)
        .bind(&role_tag)
        .bind(&name)
        .bind(&hashed)
        .bind(&email)
        .fetch_one(state.db.pool())
        .await
        .map_err(|e| on_unique_violation(e, "Email already exists"))?;

    Ok(ApiResponse::created("User created successfully", account))
}

/// POST /api/auth/login - authenticate and mint a token
///
/// The role argument picks which partition to query; it is never derived from
/// the stored row. All failure causes share one client-facing message, with
/// the distinguishing reason logged server-side only.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let (Some(role_tag), Some(email), Some(plain)) = (body.role, body.email, body.password) else {
        return Err(ApiError::bad_request(
            "Please provide email, password, and role",
        ));
    };

    let partition = Role::parse(&role_tag).partition();
    let sql = format!(
        "SELECT {} FROM {} WHERE email = $1",
        partition.account_columns, partition.table
    );

    let account: Option<AccountRow> = sqlx::query_as(&sql)
        .bind(&email)
        .fetch_optional(state.db.pool())
        .await?;

    let Some(account) = account else {
        tracing::debug!("Login failed: no {} account for {}", partition.table, email);
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    if !password::verify(&plain, &account.password) {
        tracing::debug!("Login failed: password mismatch for {}", email);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    if account.role != role_tag {
        tracing::debug!(
            "Login failed: role mismatch for {} (stored {}, supplied {})",
            email,
            account.role,
            role_tag
        );
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let security = &config::config().security;
    let claims = auth::Claims::new(
        account.id,
        account.email.clone(),
        Role::parse(&account.role),
        security.jwt_expiry_hours,
    );
    let token = auth::generate_jwt(&claims, &security.jwt_secret)?;

    Ok(ApiResponse::ok(
        "User logged in successfully",
        LoginResponse {
            user: account,
            token,
        },
    ))
}

/// GET /api/auth/user - resolve the authenticated caller in its partition
pub async fn get_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<AccountSummary> {
    let partition = user.role.partition();
    let sql = format!(
        "SELECT id, name, email, role FROM {} WHERE id = $1",
        partition.table
    );

    let account: Option<AccountSummary> = sqlx::query_as(&sql)
        .bind(user.id)
        .fetch_optional(state.db.pool())
        .await?;

    match account {
        Some(account) => Ok(ApiResponse::ok("User retrieved successfully", account)),
        None => Err(ApiError::not_found("User not found")),
    }
}

/// POST /api/auth/logout - stateless acknowledgment; tokens expire on their own
pub async fn logout() -> ApiResult<()> {
    Ok(ApiResponse::message_only("User logged out successfully"))
}
