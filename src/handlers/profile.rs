//! Profile endpoints for every authenticated role. The caller's partition is
//! resolved through the role registry, so these handlers never branch on the
//! role themselves.

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{password, Role};
use crate::config;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{AccountRow, AccountSummary, ApplicationWithOrg, Organization, Report};
use crate::response::{ApiResponse, ApiResult};
use crate::AppState;

/// Patch for the caller's own profile. Which fields actually apply depends on
/// the caller's partition (`RolePartition::patch_columns`); the rest are
/// ignored. Omitted fields are kept.
#[derive(Debug, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub course: Option<String>,
    pub student_id: Option<String>,
}

impl ProfilePatch {
    fn value(&self, column: &str) -> Option<&str> {
        match column {
            "name" => self.name.as_deref(),
            "email" => self.email.as_deref(),
            "phone" => self.phone.as_deref(),
            "department" => self.department.as_deref(),
            "course" => self.course.as_deref(),
            "student_id" => self.student_id.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// GET /api/profile/get-profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<AccountRow> {
    let partition = user.role.partition();
    let sql = format!(
        "SELECT {} FROM {} WHERE id = $1",
        partition.account_columns, partition.table
    );

    let account: Option<AccountRow> = sqlx::query_as(&sql)
        .bind(user.id)
        .fetch_optional(state.db.pool())
        .await?;

    match account {
        Some(account) => Ok(ApiResponse::ok("Profile retrieved successfully", account)),
        None => Err(ApiError::not_found("Profile not found")),
    }
}

/// PUT /api/profile/update-profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<ProfilePatch>,
) -> ApiResult<AccountRow> {
    let partition = user.role.partition();

    let mut sql = format!("UPDATE {} SET ", partition.table);
    for (i, column) in partition.patch_columns.iter().enumerate() {
        sql.push_str(&format!("{column} = COALESCE(${}, {column}), ", i + 1));
    }
    sql.push_str(&format!(
        "updated_at = NOW() WHERE id = ${} RETURNING {}",
        partition.patch_columns.len() + 1,
        partition.account_columns
    ));

    let mut query = sqlx::query_as::<_, AccountRow>(&sql);
    for column in partition.patch_columns {
        query = query.bind(patch.value(column));
    }
    query = query.bind(user.id);

    let updated: Option<AccountRow> = query.fetch_optional(state.db.pool()).await?;

    match updated {
        Some(account) => Ok(ApiResponse::ok("Profile updated successfully", account)),
        None => Err(ApiError::not_found("Profile not found")),
    }
}

/// PUT /api/profile/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<AccountSummary> {
    let (Some(current), Some(new_password)) = (body.current_password, body.new_password) else {
        return Err(ApiError::bad_request(
            "Please provide current password and new password",
        ));
    };

    if new_password.len() < 6 {
        return Err(ApiError::bad_request(
            "New password must be at least 6 characters long",
        ));
    }

    let partition = user.role.partition();
    let sql = format!(
        "SELECT {} FROM {} WHERE id = $1",
        partition.account_columns, partition.table
    );
    let account: Option<AccountRow> = sqlx::query_as(&sql)
        .bind(user.id)
        .fetch_optional(state.db.pool())
        .await?;

    let Some(account) = account else {
        return Err(ApiError::not_found("User not found"));
    };

    if !password::verify(&current, &account.password) {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }

    let hashed = password::hash(&new_password, config::config().security.bcrypt_cost)?;

    let sql = format!(
        "UPDATE {} SET password = $1, updated_at = NOW() WHERE id = $2 \
         RETURNING id, name, email, role",
        partition.table
    );
    let updated: AccountSummary = sqlx::query_as(&sql)
        .bind(&hashed)
        .bind(user.id)
        .fetch_one(state.db.pool())
        .await?;

    Ok(ApiResponse::ok("Password changed successfully", updated))
}

/// GET /api/profile/get-activity
///
/// Recent activity shaped per role: students see their own applications and
/// reports, school supervisors their students' progress, host supervisors
/// their organization's roster.
pub async fn get_user_activity(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let pool = state.db.pool();

    let activity = match user.role {
        Role::Student => {
            let applications: Vec<ApplicationWithOrg> = sqlx::query_as(
                "SELECT a.*, o.name AS organization_name, o.location, o.description \
                 FROM applications a \
                 JOIN organizations o ON a.organization_id = o.id \
                 WHERE a.student_id = $1 \
                 ORDER BY a.created_at DESC \
                 LIMIT 10",
            )
            .bind(user.id)
            .fetch_all(pool)
            .await?;

            let reports: Vec<Report> = sqlx::query_as(
                "SELECT * FROM reports WHERE student_id = $1 ORDER BY created_at DESC LIMIT 10",
            )
            .bind(user.id)
            .fetch_all(pool)
            .await?;

            json!({ "applications": applications, "reports": reports })
        }
        Role::SchoolSupervisor => {
            let students: Vec<crate::models::StudentWithStats> = sqlx::query_as(
                &format!(
                    "SELECT {}, \
                            COUNT(DISTINCT a.id) AS total_applications, \
                            COUNT(DISTINCT CASE WHEN a.status = 'approved' THEN a.id END) \
                                AS approved_applications, \
                            COUNT(DISTINCT r.id) AS total_reports \
                     FROM students s \
                     LEFT JOIN applications a ON s.id = a.student_id \
                     LEFT JOIN reports r ON s.id = r.student_id \
                     WHERE s.school_supervisor_id = $1 \
                     GROUP BY s.id \
                     ORDER BY s.name",
                    crate::models::STUDENT_COLUMNS
                ),
            )
            .bind(user.id)
            .fetch_all(pool)
            .await?;

            let recent_reports: Vec<crate::handlers::admin::ReportActivity> = sqlx::query_as(
                "SELECT r.*, s.name AS student_name \
                 FROM reports r \
                 JOIN students s ON r.student_id = s.id \
                 WHERE s.school_supervisor_id = $1 \
                 ORDER BY r.created_at DESC \
                 LIMIT 10",
            )
            .bind(user.id)
            .fetch_all(pool)
            .await?;

            json!({ "students": students, "recentReports": recent_reports })
        }
        Role::HostSupervisor => {
            let organization: Option<Organization> =
                sqlx::query_as("SELECT * FROM organizations WHERE host_supervisor_id = $1")
                    .bind(user.id)
                    .fetch_optional(pool)
                    .await?;

            let students: Vec<crate::models::RosterStudent> = sqlx::query_as(
                &format!(
                    "SELECT {}, a.start_date, a.end_date, a.status AS application_status \
                     FROM students s \
                     JOIN applications a ON s.id = a.student_id \
                     WHERE a.organization_id = \
                           (SELECT id FROM organizations WHERE host_supervisor_id = $1) \
                       AND a.status = 'approved' \
                     ORDER BY s.name",
                    crate::models::STUDENT_COLUMNS
                ),
            )
            .bind(user.id)
            .fetch_all(pool)
            .await?;

            json!({ "organization": organization, "students": students })
        }
        Role::Admin | Role::Generic => json!({}),
    };

    Ok(ApiResponse::ok(
        "User activity retrieved successfully",
        activity,
    ))
}
