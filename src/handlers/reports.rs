use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::error::{on_unique_violation, ApiError};
use crate::middleware::AuthUser;
use crate::models::{Report, ReportWithOrg, ReportWithStudent};
use crate::response::{ApiResponse, ApiResult};
use crate::services::status::{self, Status, TransitionScope, REPORTS};
use crate::AppState;

const DUPLICATE_WEEK: &str = "Report for this week already exists";

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub report_title: Option<String>,
    pub week_number: Option<i32>,
    pub activities: Option<String>,
    pub achievements: Option<String>,
    pub challenges: Option<String>,
    pub key_learnings: Option<String>,
    pub next_weeks_plans: Option<String>,
    pub attachment_url: Option<String>,
}

/// Patch for a student's own pending report; omitted fields are kept.
#[derive(Debug, Deserialize)]
pub struct ReportPatch {
    pub report_title: Option<String>,
    pub activities: Option<String>,
    pub achievements: Option<String>,
    pub challenges: Option<String>,
    pub key_learnings: Option<String>,
    pub next_weeks_plans: Option<String>,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportStatusRequest {
    pub status: Option<String>,
    pub feedback: Option<String>,
    pub grade: Option<String>,
}

const REPORT_WITH_STUDENT_SELECT: &str =
    "SELECT r.*, s.name AS student_name, s.email AS student_email, s.course, \
            o.name AS organization_name \
     FROM reports r \
     JOIN students s ON r.student_id = s.id \
     LEFT JOIN applications a ON s.id = a.student_id AND a.status = 'approved' \
     LEFT JOIN organizations o ON a.organization_id = o.id";

/// POST /api/reports/create-report (student)
pub async fn create_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateReportRequest>,
) -> ApiResult<Report> {
    let (
        Some(report_title),
        Some(week_number),
        Some(activities),
        Some(achievements),
        Some(challenges),
        Some(key_learnings),
        Some(next_weeks_plans),
    ) = (
        body.report_title,
        body.week_number,
        body.activities,
        body.achievements,
        body.challenges,
        body.key_learnings,
        body.next_weeks_plans,
    )
    else {
        return Err(ApiError::bad_request("Please provide all details"));
    };

    if week_number < 1 {
        return Err(ApiError::bad_request("Week number must be a positive integer"));
    }

    let mut tx = state.db.pool().begin().await?;

    // Reports are only accepted once the student holds an approved placement
    let approved: Option<i32> = sqlx::query_scalar(
        "SELECT id FROM applications WHERE student_id = $1 AND status = 'approved' LIMIT 1",
    )
    .bind(user.id)
    .fetch_optional(&mut *tx)
    .await?;

    if approved.is_none() {
        return Err(ApiError::bad_request(
            "You must have an approved application to submit reports",
        ));
    }

    let existing: Option<i32> =
        sqlx::query_scalar("SELECT id FROM reports WHERE student_id = $1 AND week_number = $2")
            .bind(user.id)
            .bind(week_number)
            .fetch_optional(&mut *tx)
            .await?;

    if existing.is_some() {
        return Err(ApiError::bad_request(DUPLICATE_WEEK));
    }

    let report: Report = sqlx::query_as(
        "INSERT INTO reports (student_id, report_title, week_number, activities, achievements, \
                              challenges, key_learnings, next_weeks_plans, attachment_url, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending') \
         RETURNING *",
    )
    .bind(user.id)
    .bind(&report_title)
    .bind(week_number)
    .bind(&activities)
    .bind(&achievements)
    .bind(&challenges)
    .bind(&key_learnings)
    .bind(&next_weeks_plans)
    .bind(&body.attachment_url)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| on_unique_violation(e, DUPLICATE_WEEK))?;

    tx.commit().await?;

    Ok(ApiResponse::created("Report submitted successfully", report))
}

/// GET /api/reports/get-student-reports (student)
pub async fn get_student_reports(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<ReportWithOrg>> {
    let reports: Vec<ReportWithOrg> = sqlx::query_as(
        "SELECT r.*, o.name AS organization_name \
         FROM reports r \
         LEFT JOIN applications a ON r.student_id = a.student_id AND a.status = 'approved' \
         LEFT JOIN organizations o ON a.organization_id = o.id \
         WHERE r.student_id = $1 \
         ORDER BY r.week_number DESC",
    )
    .bind(user.id)
    .fetch_all(state.db.pool())
    .await?;

    Ok(ApiResponse::ok(
        "Student reports retrieved successfully",
        reports,
    ))
}

/// PUT /api/reports/update-report/:id (student, pending only)
pub async fn update_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(patch): Json<ReportPatch>,
) -> ApiResult<Report> {
    let updated: Option<Report> = sqlx::query_as(
        "UPDATE reports \
         SET report_title = COALESCE($1, report_title), \
             activities = COALESCE($2, activities), \
             achievements = COALESCE($3, achievements), \
             challenges = COALESCE($4, challenges), \
             key_learnings = COALESCE($5, key_learnings), \
             next_weeks_plans = COALESCE($6, next_weeks_plans), \
             attachment_url = COALESCE($7, attachment_url), \
             updated_at = NOW() \
         WHERE id = $8 AND student_id = $9 AND status = 'pending' \
         RETURNING *",
    )
    .bind(&patch.report_title)
    .bind(&patch.activities)
    .bind(&patch.achievements)
    .bind(&patch.challenges)
    .bind(&patch.key_learnings)
    .bind(&patch.next_weeks_plans)
    .bind(&patch.attachment_url)
    .bind(id)
    .bind(user.id)
    .fetch_optional(state.db.pool())
    .await?;

    match updated {
        Some(report) => Ok(ApiResponse::ok("Report updated successfully", report)),
        None => Err(status::blocked(
            state.db.pool(),
            REPORTS,
            id,
            TransitionScope::Student(user.id),
            "update",
        )
        .await),
    }
}

/// DELETE /api/reports/delete-report/:id (student, pending only)
pub async fn delete_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    let deleted: Option<i32> = sqlx::query_scalar(
        "DELETE FROM reports WHERE id = $1 AND student_id = $2 AND status = 'pending' RETURNING id",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(state.db.pool())
    .await?;

    match deleted {
        Some(_) => Ok(ApiResponse::message_only("Report deleted successfully")),
        None => Err(status::blocked(
            state.db.pool(),
            REPORTS,
            id,
            TransitionScope::Student(user.id),
            "delete",
        )
        .await),
    }
}

/// GET /api/reports/get-all-reports (admin)
pub async fn get_all_reports(State(state): State<AppState>) -> ApiResult<Vec<ReportWithStudent>> {
    let sql = format!("{} ORDER BY r.created_at DESC", REPORT_WITH_STUDENT_SELECT);
    let reports: Vec<ReportWithStudent> = sqlx::query_as(&sql).fetch_all(state.db.pool()).await?;

    Ok(ApiResponse::ok("Reports retrieved successfully", reports))
}

/// GET /api/reports/get-pending-reports (admin)
pub async fn get_pending_reports(
    State(state): State<AppState>,
) -> ApiResult<Vec<ReportWithStudent>> {
    let sql = format!(
        "{} WHERE r.status = 'pending' ORDER BY r.created_at DESC",
        REPORT_WITH_STUDENT_SELECT
    );
    let reports: Vec<ReportWithStudent> = sqlx::query_as(&sql).fetch_all(state.db.pool()).await?;

    Ok(ApiResponse::ok(
        "Pending reports retrieved successfully",
        reports,
    ))
}

/// GET /api/reports/get-supervisor-reports (supervisor)
///
/// Reports of the students assigned to the calling school supervisor.
pub async fn get_supervisor_reports(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<ReportWithStudent>> {
    let sql = format!(
        "{} WHERE s.school_supervisor_id = $1 ORDER BY r.created_at DESC",
        REPORT_WITH_STUDENT_SELECT
    );
    let reports: Vec<ReportWithStudent> = sqlx::query_as(&sql)
        .bind(user.id)
        .fetch_all(state.db.pool())
        .await?;

    Ok(ApiResponse::ok(
        "Supervisor reports retrieved successfully",
        reports,
    ))
}

/// GET /api/reports/get-report/:id (supervisor or admin)
pub async fn get_report_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<ReportWithStudent> {
    let sql = format!("{} WHERE r.id = $1", REPORT_WITH_STUDENT_SELECT);
    let report: Option<ReportWithStudent> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(state.db.pool())
        .await?;

    match report {
        Some(report) => Ok(ApiResponse::ok("Report retrieved successfully", report)),
        None => Err(ApiError::not_found("Report not found")),
    }
}

/// PUT /api/reports/update-report-status/:id (supervisor or admin)
pub async fn update_report_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<ReportStatusRequest>,
) -> ApiResult<Report> {
    let status = body
        .status
        .as_deref()
        .and_then(Status::parse)
        .filter(|s| s.is_review_status())
        .ok_or_else(|| {
            ApiError::bad_request("Please provide a valid status (pending, approved, rejected)")
        })?;

    let updated: Option<Report> = sqlx::query_as(
        "UPDATE reports \
         SET status = $1, feedback = $2, grade = $3, updated_at = NOW() \
         WHERE id = $4 AND status = 'pending' \
         RETURNING *",
    )
    .bind(status.as_str())
    .bind(&body.feedback)
    .bind(&body.grade)
    .bind(id)
    .fetch_optional(state.db.pool())
    .await?;

    match updated {
        Some(report) => Ok(ApiResponse::ok(
            "Report status updated successfully",
            report,
        )),
        None => Err(status::blocked(state.db.pool(), REPORTS, id, TransitionScope::Any, "update").await),
    }
}

/// PUT /api/reports/approve-report/:id (supervisor or admin)
pub async fn approve_report(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Report> {
    transition_report(&state, id, Status::Approved, "approve").await
}

/// PUT /api/reports/reject-report/:id (supervisor or admin)
pub async fn reject_report(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Report> {
    transition_report(&state, id, Status::Rejected, "reject").await
}

async fn transition_report(state: &AppState, id: i32, to: Status, verb: &str) -> ApiResult<Report> {
    let updated: Option<Report> = sqlx::query_as(
        "UPDATE reports SET status = $1, updated_at = NOW() \
         WHERE id = $2 AND status = 'pending' \
         RETURNING *",
    )
    .bind(to.as_str())
    .bind(id)
    .fetch_optional(state.db.pool())
    .await?;

    match updated {
        Some(report) => Ok(ApiResponse::ok(
            format!("Report {} successfully", to.as_str()),
            report,
        )),
        None => Err(status::blocked(state.db.pool(), REPORTS, id, TransitionScope::Any, verb).await),
    }
}
