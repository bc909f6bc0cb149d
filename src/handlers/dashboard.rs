//! Per-role dashboard aggregates. Pure reads; every query is scoped to the
//! caller where the role implies ownership.

use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::middleware::AuthUser;
use crate::models::{
    ApplicationWithOrg, Evaluation, Organization, Report, RosterStudent, STUDENT_COLUMNS,
};
use crate::response::{ApiResponse, ApiResult};
use crate::AppState;

use super::admin::{ApplicationActivity, ReportActivity};

/// GET /api/dashboard/admin
pub async fn admin_dashboard(State(state): State<AppState>) -> ApiResult<Value> {
    let pool = state.db.pool();

    let counts: (i64, i64, i64, i64, i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM students), \
                (SELECT COUNT(*) FROM organizations), \
                (SELECT COUNT(*) FROM applications), \
                (SELECT COUNT(*) FROM reports), \
                (SELECT COUNT(*) FROM applications WHERE status = 'pending'), \
                (SELECT COUNT(*) FROM applications \
                  WHERE status = 'approved' AND end_date < CURRENT_DATE)",
    )
    .fetch_one(pool)
    .await?;

    let recent_applications: Vec<ApplicationActivity> = sqlx::query_as(
        "SELECT a.*, s.name AS student_name, o.name AS organization_name \
         FROM applications a \
         JOIN students s ON a.student_id = s.id \
         JOIN organizations o ON a.organization_id = o.id \
         ORDER BY a.created_at DESC \
         LIMIT 5",
    )
    .fetch_all(pool)
    .await?;

    let recent_reports: Vec<ReportActivity> = sqlx::query_as(
        "SELECT r.*, s.name AS student_name \
         FROM reports r \
         JOIN students s ON r.student_id = s.id \
         ORDER BY r.created_at DESC \
         LIMIT 5",
    )
    .fetch_all(pool)
    .await?;

    let data = json!({
        "statistics": {
            "totalStudents": counts.0,
            "totalOrganizations": counts.1,
            "totalApplications": counts.2,
            "totalReports": counts.3,
            "pendingApplications": counts.4,
            "completedAttachments": counts.5,
        },
        "recentActivities": {
            "applications": recent_applications,
            "reports": recent_reports,
        },
    });

    Ok(ApiResponse::ok(
        "Admin dashboard data retrieved successfully",
        data,
    ))
}

/// GET /api/dashboard/student
pub async fn student_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let pool = state.db.pool();

    let applications: Vec<ApplicationWithOrg> = sqlx::query_as(
        "SELECT a.*, o.name AS organization_name, o.location, o.description \
         FROM applications a \
         JOIN organizations o ON a.organization_id = o.id \
         WHERE a.student_id = $1 \
         ORDER BY a.created_at DESC",
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?;

    let reports: Vec<Report> =
        sqlx::query_as("SELECT * FROM reports WHERE student_id = $1 ORDER BY created_at DESC")
            .bind(user.id)
            .fetch_all(pool)
            .await?;

    let profile: Option<crate::models::Student> = sqlx::query_as(&format!(
        "SELECT {STUDENT_COLUMNS} FROM students s WHERE s.id = $1"
    ))
    .bind(user.id)
    .fetch_optional(pool)
    .await?;

    let counts: (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM applications WHERE student_id = $1), \
                (SELECT COUNT(*) FROM applications WHERE student_id = $1 AND status = 'approved'), \
                (SELECT COUNT(*) FROM applications WHERE student_id = $1 AND status = 'pending'), \
                (SELECT COUNT(*) FROM reports WHERE student_id = $1)",
    )
    .bind(user.id)
    .fetch_one(pool)
    .await?;

    let data = json!({
        "profile": profile,
        "statistics": {
            "totalApplications": counts.0,
            "approvedApplications": counts.1,
            "pendingApplications": counts.2,
            "totalReports": counts.3,
        },
        "applications": applications,
        "reports": reports,
    });

    Ok(ApiResponse::ok(
        "Student dashboard data retrieved successfully",
        data,
    ))
}

/// GET /api/dashboard/school-supervisor
pub async fn school_supervisor_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let pool = state.db.pool();

    let students: Vec<crate::models::StudentWithStats> = sqlx::query_as(&format!(
        "SELECT {STUDENT_COLUMNS}, \
                COUNT(DISTINCT a.id) AS total_applications, \
                COUNT(DISTINCT CASE WHEN a.status = 'approved' THEN a.id END) \
                    AS approved_applications, \
                COUNT(DISTINCT r.id) AS total_reports \
         FROM students s \
         LEFT JOIN applications a ON s.id = a.student_id \
         LEFT JOIN reports r ON s.id = r.student_id \
         WHERE s.school_supervisor_id = $1 \
         GROUP BY s.id \
         ORDER BY s.name"
    ))
    .bind(user.id)
    .fetch_all(pool)
    .await?;

    let recent_reports: Vec<ReportActivity> = sqlx::query_as(
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

    let pending_evaluations: Vec<PendingEvaluation> = sqlx::query_as(
        "SELECT e.*, s.name AS student_name, o.name AS organization_name \
         FROM evaluations e \
         JOIN students s ON e.student_id = s.id \
         JOIN organizations o ON e.organization_id = o.id \
         WHERE s.school_supervisor_id = $1 AND e.status = 'pending' \
         ORDER BY e.created_at DESC",
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?;

    let counts: (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM students WHERE school_supervisor_id = $1), \
                (SELECT COUNT(*) FROM reports r \
                   JOIN students s ON r.student_id = s.id \
                  WHERE s.school_supervisor_id = $1), \
                (SELECT COUNT(*) FROM evaluations e \
                   JOIN students s ON e.student_id = s.id \
                  WHERE s.school_supervisor_id = $1 AND e.status = 'pending'), \
                (SELECT COUNT(*) FROM evaluations e \
                   JOIN students s ON e.student_id = s.id \
                  WHERE s.school_supervisor_id = $1 AND e.status = 'completed')",
    )
    .bind(user.id)
    .fetch_one(pool)
    .await?;

    let data = json!({
        "statistics": {
            "totalStudents": counts.0,
            "totalReports": counts.1,
            "pendingEvaluations": counts.2,
            "completedEvaluations": counts.3,
        },
        "students": students,
        "recentReports": recent_reports,
        "pendingEvaluations": pending_evaluations,
    });

    Ok(ApiResponse::ok(
        "School supervisor dashboard data retrieved successfully",
        data,
    ))
}

/// GET /api/dashboard/host-supervisor
pub async fn host_supervisor_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let pool = state.db.pool();

    let organization: Option<Organization> =
        sqlx::query_as("SELECT * FROM organizations WHERE host_supervisor_id = $1")
            .bind(user.id)
            .fetch_optional(pool)
            .await?;

    let students: Vec<RosterStudent> = sqlx::query_as(&format!(
        "SELECT {STUDENT_COLUMNS}, a.start_date, a.end_date, a.status AS application_status \
         FROM students s \
         JOIN applications a ON s.id = a.student_id \
         WHERE a.organization_id = (SELECT id FROM organizations WHERE host_supervisor_id = $1) \
           AND a.status = 'approved' \
         ORDER BY s.name"
    ))
    .bind(user.id)
    .fetch_all(pool)
    .await?;

    let attendance_records: Vec<AttendanceActivity> = sqlx::query_as(
        "SELECT a.*, s.name AS student_name \
         FROM attendance a \
         JOIN students s ON a.student_id = s.id \
         WHERE a.organization_id = (SELECT id FROM organizations WHERE host_supervisor_id = $1) \
         ORDER BY a.date DESC \
         LIMIT 20",
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?;

    let pending_evaluations: Vec<EvaluationActivity> = sqlx::query_as(
        "SELECT e.*, s.name AS student_name \
         FROM evaluations e \
         JOIN students s ON e.student_id = s.id \
         WHERE e.organization_id = (SELECT id FROM organizations WHERE host_supervisor_id = $1) \
           AND e.status = 'pending' \
         ORDER BY e.created_at DESC",
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?;

    let counts: (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM students s \
                   JOIN applications a ON s.id = a.student_id \
                  WHERE a.organization_id = \
                        (SELECT id FROM organizations WHERE host_supervisor_id = $1) \
                    AND a.status = 'approved'), \
                (SELECT COUNT(*) FROM attendance \
                  WHERE organization_id = \
                        (SELECT id FROM organizations WHERE host_supervisor_id = $1)), \
                (SELECT COUNT(*) FROM evaluations \
                  WHERE organization_id = \
                        (SELECT id FROM organizations WHERE host_supervisor_id = $1) \
                    AND status = 'pending'), \
                (SELECT COUNT(*) FROM evaluations \
                  WHERE organization_id = \
                        (SELECT id FROM organizations WHERE host_supervisor_id = $1) \
                    AND status = 'completed')",
    )
    .bind(user.id)
    .fetch_one(pool)
    .await?;

    let data = json!({
        "organization": organization,
        "statistics": {
            "totalStudents": counts.0,
            "totalAttendanceRecords": counts.1,
            "pendingEvaluations": counts.2,
            "completedEvaluations": counts.3,
        },
        "students": students,
        "attendanceRecords": attendance_records,
        "pendingEvaluations": pending_evaluations,
    });

    Ok(ApiResponse::ok(
        "Host supervisor dashboard data retrieved successfully",
        data,
    ))
}

#[derive(Debug, sqlx::FromRow, serde::Serialize)]
struct PendingEvaluation {
    #[sqlx(flatten)]
    #[serde(flatten)]
    evaluation: Evaluation,
    student_name: String,
    organization_name: String,
}

#[derive(Debug, sqlx::FromRow, serde::Serialize)]
struct EvaluationActivity {
    #[sqlx(flatten)]
    #[serde(flatten)]
    evaluation: Evaluation,
    student_name: String,
}

#[derive(Debug, sqlx::FromRow, serde::Serialize)]
struct AttendanceActivity {
    #[sqlx(flatten)]
    #[serde(flatten)]
    attendance: crate::models::Attendance,
    student_name: String,
}
