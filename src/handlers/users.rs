//! Admin management of the generic `users` partition.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::password;
use crate::config;
use crate::error::{on_unique_violation, ApiError};
use crate::models::{CreatedAccount, UserRow};
use crate::response::{ApiResponse, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Patch for a generic user; omitted fields are kept.
#[derive(Debug, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub query: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    pub users_by_role: Vec<RoleCount>,
}

const USER_COLUMNS: &str = "id, name, email, role, created_at, updated_at";

/// GET /api/users (admin)
pub async fn get_all_users(State(state): State<AppState>) -> ApiResult<Vec<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
    let users: Vec<UserRow> = sqlx::query_as(&sql).fetch_all(state.db.pool()).await?;

    Ok(ApiResponse::ok("Users retrieved successfully", users))
}

/// GET /api/users/:id (admin)
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<UserRow> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let user: Option<UserRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(state.db.pool())
        .await?;

    match user {
        Some(user) => Ok(ApiResponse::ok("User retrieved successfully", user)),
        None => Err(ApiError::not_found("User not found")),
    }
}

/// POST /api/users (admin)
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<CreatedAccount> {
    let (Some(name), Some(email), Some(plain), Some(role)) =
        (body.name, body.email, body.password, body.role)
    else {
        return Err(ApiError::bad_request(
            "Please provide name, email, password, and role",
        ));
    };

    let hashed = password::hash(&plain, config::config().security.bcrypt_cost)?;

    let user: CreatedAccount = sqlx::query_as(
        "INSERT INTO users (name, email, password, role) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, name, email, role, created_at",
    )
    .bind(&name)
    .bind(&email)
    .bind(&hashed)
    .bind(&role)
    .fetch_one(state.db.pool())
    .await
    .map_err(|e| on_unique_violation(e, "User with this email already exists"))?;

    Ok(ApiResponse::created("User created successfully", user))
}

/// PUT /api/users/:id (admin)
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<UserPatch>,
) -> ApiResult<UserRow> {
    let sql = format!(
        "UPDATE users \
         SET name = COALESCE($1, name), \
             email = COALESCE($2, email), \
             role = COALESCE($3, role), \
             updated_at = NOW() \
         WHERE id = $4 \
         RETURNING {USER_COLUMNS}"
    );
    let updated: Option<UserRow> = sqlx::query_as(&sql)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.role)
        .bind(id)
        .fetch_optional(state.db.pool())
        .await?;

    match updated {
        Some(user) => Ok(ApiResponse::ok("User updated successfully", user)),
        None => Err(ApiError::not_found("User not found")),
    }
}

/// DELETE /api/users/:id (admin)
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<()> {
    let deleted: Option<i32> = sqlx::query_scalar("DELETE FROM users WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(state.db.pool())
        .await?;

    match deleted {
        Some(_) => Ok(ApiResponse::message_only("User deleted successfully")),
        None => Err(ApiError::not_found("User not found")),
    }
}

/// GET /api/users/search (admin)
pub async fn search_users(
    State(state): State<AppState>,
    Query(filter): Query<UserSearchQuery>,
) -> ApiResult<Vec<UserRow>> {
    let mut sql = format!("SELECT {USER_COLUMNS} FROM users");

    let mut conditions: Vec<String> = Vec::new();
    let mut n = 0;
    if filter.query.is_some() {
        n += 1;
        conditions.push(format!("(name ILIKE ${n} OR email ILIKE ${n})"));
    }
    if filter.role.is_some() {
        n += 1;
        conditions.push(format!("role = ${n}"));
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut query = sqlx::query_as::<_, UserRow>(&sql);
    if let Some(term) = &filter.query {
        query = query.bind(format!("%{term}%"));
    }
    if let Some(role) = &filter.role {
        query = query.bind(role);
    }

    let users = query.fetch_all(state.db.pool()).await?;

    Ok(ApiResponse::ok("Users search completed", users))
}

/// GET /api/users/stats (admin)
pub async fn get_user_stats(State(state): State<AppState>) -> ApiResult<UserStats> {
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(state.db.pool())
        .await?;

    let active_users: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE updated_at >= NOW() - INTERVAL '30 days'",
    )
    .fetch_one(state.db.pool())
    .await?;

    let users_by_role: Vec<RoleCount> =
        sqlx::query_as("SELECT role, COUNT(*) AS count FROM users GROUP BY role")
            .fetch_all(state.db.pool())
            .await?;

    Ok(ApiResponse::ok(
        "User statistics retrieved successfully",
        UserStats {
            total_users,
            active_users,
            users_by_role,
        },
    ))
}
