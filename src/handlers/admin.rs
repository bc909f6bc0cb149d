//! Admin console: system statistics, analytics, recent activity, and
//! school-supervisor account management.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::password;
use crate::config;
use crate::error::{on_unique_violation, ApiError};
use crate::models::{Supervisor, SupervisorWithStats, SUPERVISOR_COLUMNS};
use crate::response::{ApiResponse, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_students: i64,
    pub total_organizations: i64,
    pub total_applications: i64,
    pub total_reports: i64,
    pub pending_applications: i64,
    pub completed_attachments: i64,
    pub total_supervisors: i64,
    pub total_admins: i64,
}

#[derive(Debug, FromRow, Serialize)]
pub struct MonthlyApplications {
    pub month: DateTime<Utc>,
    pub count: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Debug, FromRow, Serialize)]
pub struct OrganizationPopularity {
    pub name: String,
    pub total_applications: i64,
    pub approved_applications: i64,
}

#[derive(Debug, FromRow, Serialize)]
pub struct CourseDistribution {
    pub course: Option<String>,
    pub student_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemAnalytics {
    pub monthly_applications: Vec<MonthlyApplications>,
    pub organization_stats: Vec<OrganizationPopularity>,
    pub course_distribution: Vec<CourseDistribution>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct ApplicationActivity {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: crate::models::Application,
    pub student_name: String,
    pub organization_name: String,
}

#[derive(Debug, FromRow, Serialize)]
pub struct ReportActivity {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub report: crate::models::Report,
    pub student_name: String,
}

#[derive(Debug, Serialize)]
pub struct RecentActivities {
    pub applications: Vec<ApplicationActivity>,
    pub reports: Vec<ReportActivity>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupervisorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
}

/// Patch for a school supervisor; omitted fields are kept.
#[derive(Debug, Deserialize)]
pub struct SupervisorPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
}

/// GET /api/admin/stats
pub async fn get_admin_stats(State(state): State<AppState>) -> ApiResult<AdminStats> {
    let pool = state.db.pool();

    let counts: (i64, i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM students), \
                (SELECT COUNT(*) FROM organizations), \
                (SELECT COUNT(*) FROM applications), \
                (SELECT COUNT(*) FROM reports), \
                (SELECT COUNT(*) FROM applications WHERE status = 'pending'), \
                (SELECT COUNT(*) FROM applications \
                  WHERE status = 'approved' AND end_date < CURRENT_DATE), \
                (SELECT COUNT(*) FROM school_supervisor), \
                (SELECT COUNT(*) FROM admin)",
    )
    .fetch_one(pool)
    .await?;

    let stats = AdminStats {
        total_students: counts.0,
        total_organizations: counts.1,
        total_applications: counts.2,
        total_reports: counts.3,
        pending_applications: counts.4,
        completed_attachments: counts.5,
        total_supervisors: counts.6,
        total_admins: counts.7,
    };

    Ok(ApiResponse::ok(
        "Admin statistics retrieved successfully",
        stats,
    ))
}

/// GET /api/admin/analytics
pub async fn get_system_analytics(State(state): State<AppState>) -> ApiResult<SystemAnalytics> {
    let pool = state.db.pool();

    let monthly_applications: Vec<MonthlyApplications> = sqlx::query_as(
        "SELECT DATE_TRUNC('month', created_at) AS month, \
                COUNT(*) AS count, \
                COUNT(CASE WHEN status = 'approved' THEN 1 END) AS approved, \
                COUNT(CASE WHEN status = 'rejected' THEN 1 END) AS rejected \
         FROM applications \
         WHERE created_at >= NOW() - INTERVAL '12 months' \
         GROUP BY DATE_TRUNC('month', created_at) \
         ORDER BY month DESC",
    )
    .fetch_all(pool)
    .await?;

    let organization_stats: Vec<OrganizationPopularity> = sqlx::query_as(
        "SELECT o.name, \
                COUNT(a.id) AS total_applications, \
                COUNT(CASE WHEN a.status = 'approved' THEN 1 END) AS approved_applications \
         FROM organizations o \
         LEFT JOIN applications a ON o.id = a.organization_id \
         GROUP BY o.id, o.name \
         ORDER BY total_applications DESC \
         LIMIT 10",
    )
    .fetch_all(pool)
    .await?;

    let course_distribution: Vec<CourseDistribution> = sqlx::query_as(
        "SELECT course, COUNT(*) AS student_count \
         FROM students \
         GROUP BY course \
         ORDER BY student_count DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::ok(
        "System analytics retrieved successfully",
        SystemAnalytics {
            monthly_applications,
            organization_stats,
            course_distribution,
        },
    ))
}

/// GET /api/admin/activities
pub async fn get_recent_activities(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<RecentActivities> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let pool = state.db.pool();

    let applications: Vec<ApplicationActivity> = sqlx::query_as(
        "SELECT a.*, s.name AS student_name, o.name AS organization_name \
         FROM applications a \
         JOIN students s ON a.student_id = s.id \
         JOIN organizations o ON a.organization_id = o.id \
         ORDER BY a.created_at DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let reports: Vec<ReportActivity> = sqlx::query_as(
        "SELECT r.*, s.name AS student_name \
         FROM reports r \
         JOIN students s ON r.student_id = s.id \
         ORDER BY r.created_at DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::ok(
        "Recent activities retrieved successfully",
        RecentActivities {
            applications,
            reports,
        },
    ))
}

/// GET /api/admin/supervisors
pub async fn get_all_supervisors(
    State(state): State<AppState>,
) -> ApiResult<Vec<SupervisorWithStats>> {
    let sql = format!(
        "SELECT {SUPERVISOR_COLUMNS}, COUNT(st.id) AS total_students \
         FROM school_supervisor s \
         LEFT JOIN students st ON s.id = st.school_supervisor_id \
         GROUP BY s.id \
         ORDER BY s.name"
    );
    let supervisors: Vec<SupervisorWithStats> =
        sqlx::query_as(&sql).fetch_all(state.db.pool()).await?;

    Ok(ApiResponse::ok(
        "Supervisors retrieved successfully",
        supervisors,
    ))
}

/// POST /api/admin/supervisors
pub async fn create_supervisor(
    State(state): State<AppState>,
    Json(body): Json<CreateSupervisorRequest>,
) -> ApiResult<Supervisor> {
    let (Some(name), Some(email), Some(plain), Some(department)) =
        (body.name, body.email, body.password, body.department)
    else {
        return Err(ApiError::bad_request(
            "Please provide name, email, password, and department",
        ));
    };

    let mut tx = state.db.pool().begin().await?;

    let existing: Option<i32> =
        sqlx::query_scalar("SELECT id FROM school_supervisor WHERE email = $1")
            .bind(&email)
            .fetch_optional(&mut *tx)
            .await?;

    if existing.is_some() {
        return Err(ApiError::bad_request(
            "Supervisor with this email already exists",
        ));
    }

    let hashed = password::hash(&plain, config::config().security.bcrypt_cost)?;

    let sql = format!(
        "INSERT INTO school_supervisor (name, email, password, department, phone, role) \
         VALUES ($1, $2, $3, $4, $5, 'school_supervisor') \
         RETURNING {}",
        SUPERVISOR_COLUMNS.replace("s.", "")
    );
    let supervisor: Supervisor = sqlx::query_as(&sql)
        .bind(&name)
        .bind(&email)
        .bind(&hashed)
        .bind(&department)
        .bind(&body.phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| on_unique_violation(e, "Supervisor with this email already exists"))?;

    tx.commit().await?;

    Ok(ApiResponse::created(
        "Supervisor created successfully",
        supervisor,
    ))
}

/// PUT /api/admin/supervisors/:id
pub async fn update_supervisor(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<SupervisorPatch>,
) -> ApiResult<Supervisor> {
    let sql = format!(
        "UPDATE school_supervisor \
         SET name = COALESCE($1, name), \
             email = COALESCE($2, email), \
             department = COALESCE($3, department), \
             phone = COALESCE($4, phone), \
             updated_at = NOW() \
         WHERE id = $5 \
         RETURNING {}",
        SUPERVISOR_COLUMNS.replace("s.", "")
    );
    let updated: Option<Supervisor> = sqlx::query_as(&sql)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.department)
        .bind(&patch.phone)
        .bind(id)
        .fetch_optional(state.db.pool())
        .await?;

    match updated {
        Some(supervisor) => Ok(ApiResponse::ok(
            "Supervisor updated successfully",
            supervisor,
        )),
        None => Err(ApiError::not_found("Supervisor not found")),
    }
}

/// DELETE /api/admin/supervisors/:id
///
/// Blocked while any student is assigned to this supervisor.
pub async fn delete_supervisor(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<()> {
    let students: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE school_supervisor_id = $1")
            .bind(id)
            .fetch_one(state.db.pool())
            .await?;

    if students > 0 {
        return Err(ApiError::bad_request(
            "Cannot delete supervisor with assigned students",
        ));
    }

    let deleted: Option<i32> =
        sqlx::query_scalar("DELETE FROM school_supervisor WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(state.db.pool())
            .await?;

    match deleted {
        Some(_) => Ok(ApiResponse::message_only("Supervisor deleted successfully")),
        None => Err(ApiError::not_found("Supervisor not found")),
    }
}
