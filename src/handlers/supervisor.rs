//! Host-supervisor workspace: own organization, assigned students,
//! attendance and evaluations. Every write is scoped to the supervisor's own
//! organization; students visible here must hold an approved application in
//! that organization.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;

use crate::error::{on_unique_violation, ApiError};
use crate::middleware::AuthUser;
use crate::models::{
    AssignedStudent, Attendance, AttendanceWithStudent, Evaluation, EvaluationWithStudent,
    OrganizationWithStats, STUDENT_COLUMNS,
};
use crate::response::{ApiResponse, ApiResult};
use crate::services::status::{self, TransitionScope, EVALUATIONS};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MarkAttendanceRequest {
    pub student_id: Option<i32>,
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub student_id: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEvaluationRequest {
    pub student_id: Option<i32>,
    pub evaluation_period: Option<String>,
    pub technical_skills: Option<i32>,
    pub communication_skills: Option<i32>,
    pub teamwork: Option<i32>,
    pub problem_solving: Option<i32>,
    pub overall_rating: Option<i32>,
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluationQuery {
    pub student_id: Option<i32>,
    pub status: Option<String>,
}

/// Patch for a pending evaluation; omitted fields are kept.
#[derive(Debug, Deserialize)]
pub struct EvaluationPatch {
    pub technical_skills: Option<i32>,
    pub communication_skills: Option<i32>,
    pub teamwork: Option<i32>,
    pub problem_solving: Option<i32>,
    pub overall_rating: Option<i32>,
    pub comments: Option<String>,
}

const ATTENDANCE_STATUSES: &[&str] = &["present", "absent", "late"];

fn rating_in_range(rating: i32) -> bool {
    (1..=5).contains(&rating)
}

/// Resolve the acting supervisor's organization id.
async fn own_organization_id(pool: &PgPool, supervisor_id: i32) -> Result<i32, ApiError> {
    let id: Option<i32> =
        sqlx::query_scalar("SELECT id FROM organizations WHERE host_supervisor_id = $1")
            .bind(supervisor_id)
            .fetch_optional(pool)
            .await?;

    id.ok_or_else(|| ApiError::not_found("Organization not found"))
}

/// True when the student holds an approved application in the organization.
async fn student_assigned(
    pool: &PgPool,
    student_id: i32,
    organization_id: i32,
) -> Result<bool, ApiError> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT s.id FROM students s \
         JOIN applications a ON s.id = a.student_id \
         WHERE s.id = $1 AND a.organization_id = $2 AND a.status = 'approved'",
    )
    .bind(student_id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

/// GET /api/supervisor/organization
pub async fn get_organization(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<OrganizationWithStats> {
    let organization: Option<OrganizationWithStats> = sqlx::query_as(
        "SELECT o.*, \
                COUNT(a.id) AS total_applications, \
                COUNT(CASE WHEN a.status = 'approved' THEN 1 END) AS approved_applications \
         FROM organizations o \
         LEFT JOIN applications a ON o.id = a.organization_id \
         WHERE o.host_supervisor_id = $1 \
         GROUP BY o.id",
    )
    .bind(user.id)
    .fetch_optional(state.db.pool())
    .await?;

    match organization {
        Some(organization) => Ok(ApiResponse::ok(
            "Organization retrieved successfully",
            organization,
        )),
        None => Err(ApiError::not_found("Organization not found")),
    }
}

/// GET /api/supervisor/students
pub async fn get_assigned_students(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<AssignedStudent>> {
    let sql = format!(
        "SELECT {STUDENT_COLUMNS}, a.start_date, a.end_date, a.status AS application_status, \
                COUNT(r.id) AS total_reports, \
                COUNT(CASE WHEN r.status = 'approved' THEN 1 END) AS approved_reports \
         FROM students s \
         JOIN applications a ON s.id = a.student_id \
         LEFT JOIN reports r ON s.id = r.student_id \
         WHERE a.organization_id = (SELECT id FROM organizations WHERE host_supervisor_id = $1) \
           AND a.status = 'approved' \
         GROUP BY s.id, a.start_date, a.end_date, a.status \
         ORDER BY s.name"
    );

    let students: Vec<AssignedStudent> = sqlx::query_as(&sql)
        .bind(user.id)
        .fetch_all(state.db.pool())
        .await?;

    Ok(ApiResponse::ok(
        "Assigned students retrieved successfully",
        students,
    ))
}

/// POST /api/supervisor/attendance
pub async fn mark_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<MarkAttendanceRequest>,
) -> ApiResult<Attendance> {
    let (Some(student_id), Some(date), Some(status)) = (body.student_id, body.date, body.status)
    else {
        return Err(ApiError::bad_request(
            "Please provide student_id, date, and status",
        ));
    };

    if !ATTENDANCE_STATUSES.contains(&status.as_str()) {
        return Err(ApiError::bad_request(
            "Status must be present, absent, or late",
        ));
    }

    let organization_id = own_organization_id(state.db.pool(), user.id).await?;

    let mut tx = state.db.pool().begin().await?;

    if !student_assigned(state.db.pool(), student_id, organization_id).await? {
        return Err(ApiError::not_found(
            "Student not found or not assigned to your organization",
        ));
    }

    let existing: Option<i32> =
        sqlx::query_scalar("SELECT id FROM attendance WHERE student_id = $1 AND date = $2")
            .bind(student_id)
            .bind(date)
            .fetch_optional(&mut *tx)
            .await?;

    if existing.is_some() {
        return Err(ApiError::bad_request("Attendance already marked for this date"));
    }

    let attendance: Attendance = sqlx::query_as(
        "INSERT INTO attendance (student_id, organization_id, date, status, notes, marked_by) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(student_id)
    .bind(organization_id)
    .bind(date)
    .bind(&status)
    .bind(&body.notes)
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| on_unique_violation(e, "Attendance already marked for this date"))?;

    tx.commit().await?;

    Ok(ApiResponse::created(
        "Attendance marked successfully",
        attendance,
    ))
}

/// GET /api/supervisor/attendance
pub async fn get_attendance_records(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<AttendanceQuery>,
) -> ApiResult<Vec<AttendanceWithStudent>> {
    let mut sql = String::from(
        "SELECT a.*, s.name AS student_name, s.email AS student_email \
         FROM attendance a \
         JOIN students s ON a.student_id = s.id \
         WHERE a.organization_id = (SELECT id FROM organizations WHERE host_supervisor_id = $1)",
    );

    // Optional filters are ANDed in, in bind order
    let mut n = 1;
    if filter.student_id.is_some() {
        n += 1;
        sql.push_str(&format!(" AND a.student_id = ${n}"));
    }
    if filter.start_date.is_some() {
        n += 1;
        sql.push_str(&format!(" AND a.date >= ${n}"));
    }
    if filter.end_date.is_some() {
        n += 1;
        sql.push_str(&format!(" AND a.date <= ${n}"));
    }
    sql.push_str(" ORDER BY a.date DESC, s.name");

    let mut query = sqlx::query_as::<_, AttendanceWithStudent>(&sql).bind(user.id);
    if let Some(student_id) = filter.student_id {
        query = query.bind(student_id);
    }
    if let Some(start_date) = filter.start_date {
        query = query.bind(start_date);
    }
    if let Some(end_date) = filter.end_date {
        query = query.bind(end_date);
    }

    let records = query.fetch_all(state.db.pool()).await?;

    Ok(ApiResponse::ok(
        "Attendance records retrieved successfully",
        records,
    ))
}

/// POST /api/supervisor/evaluations
pub async fn create_evaluation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateEvaluationRequest>,
) -> ApiResult<Evaluation> {
    let (Some(student_id), Some(evaluation_period), Some(overall_rating)) =
        (body.student_id, body.evaluation_period, body.overall_rating)
    else {
        return Err(ApiError::bad_request(
            "Please provide student_id, evaluation_period, and overall_rating",
        ));
    };

    if !rating_in_range(overall_rating) {
        return Err(ApiError::bad_request("Overall rating must be between 1 and 5"));
    }

    for score in [
        body.technical_skills,
        body.communication_skills,
        body.teamwork,
        body.problem_solving,
    ]
    .into_iter()
    .flatten()
    {
        if !rating_in_range(score) {
            return Err(ApiError::bad_request("Skill scores must be between 1 and 5"));
        }
    }

    let organization_id = own_organization_id(state.db.pool(), user.id).await?;

    let mut tx = state.db.pool().begin().await?;

    if !student_assigned(state.db.pool(), student_id, organization_id).await? {
        return Err(ApiError::not_found(
            "Student not found or not assigned to your organization",
        ));
    }

    let existing: Option<i32> = sqlx::query_scalar(
        "SELECT id FROM evaluations WHERE student_id = $1 AND evaluation_period = $2",
    )
    .bind(student_id)
    .bind(&evaluation_period)
    .fetch_optional(&mut *tx)
    .await?;

    if existing.is_some() {
        return Err(ApiError::bad_request("Evaluation already exists for this period"));
    }

    let evaluation: Evaluation = sqlx::query_as(
        "INSERT INTO evaluations (student_id, organization_id, evaluation_period, \
                                  technical_skills, communication_skills, teamwork, \
                                  problem_solving, overall_rating, comments, evaluated_by, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending') \
         RETURNING *",
    )
    .bind(student_id)
    .bind(organization_id)
    .bind(&evaluation_period)
    .bind(body.technical_skills)
    .bind(body.communication_skills)
    .bind(body.teamwork)
    .bind(body.problem_solving)
    .bind(overall_rating)
    .bind(&body.comments)
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| on_unique_violation(e, "Evaluation already exists for this period"))?;

    tx.commit().await?;

    Ok(ApiResponse::created(
        "Evaluation created successfully",
        evaluation,
    ))
}

/// GET /api/supervisor/evaluations
pub async fn get_evaluations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<EvaluationQuery>,
) -> ApiResult<Vec<EvaluationWithStudent>> {
    let mut sql = String::from(
        "SELECT e.*, s.name AS student_name, s.email AS student_email \
         FROM evaluations e \
         JOIN students s ON e.student_id = s.id \
         WHERE e.organization_id = (SELECT id FROM organizations WHERE host_supervisor_id = $1)",
    );

    let mut n = 1;
    if filter.student_id.is_some() {
        n += 1;
        sql.push_str(&format!(" AND e.student_id = ${n}"));
    }
    if filter.status.is_some() {
        n += 1;
        sql.push_str(&format!(" AND e.status = ${n}"));
    }
    sql.push_str(" ORDER BY e.created_at DESC");

    let mut query = sqlx::query_as::<_, EvaluationWithStudent>(&sql).bind(user.id);
    if let Some(student_id) = filter.student_id {
        query = query.bind(student_id);
    }
    if let Some(status) = &filter.status {
        query = query.bind(status);
    }

    let evaluations = query.fetch_all(state.db.pool()).await?;

    Ok(ApiResponse::ok(
        "Evaluations retrieved successfully",
        evaluations,
    ))
}

/// PUT /api/supervisor/evaluations/:id (pending only, own organization)
pub async fn update_evaluation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(patch): Json<EvaluationPatch>,
) -> ApiResult<Evaluation> {
    for score in [
        patch.technical_skills,
        patch.communication_skills,
        patch.teamwork,
        patch.problem_solving,
        patch.overall_rating,
    ]
    .into_iter()
    .flatten()
    {
        if !rating_in_range(score) {
            return Err(ApiError::bad_request("Skill scores must be between 1 and 5"));
        }
    }

    let updated: Option<Evaluation> = sqlx::query_as(
        "UPDATE evaluations \
         SET technical_skills = COALESCE($1, technical_skills), \
             communication_skills = COALESCE($2, communication_skills), \
             teamwork = COALESCE($3, teamwork), \
             problem_solving = COALESCE($4, problem_solving), \
             overall_rating = COALESCE($5, overall_rating), \
             comments = COALESCE($6, comments), \
             updated_at = NOW() \
         WHERE id = $7 \
           AND organization_id = (SELECT id FROM organizations WHERE host_supervisor_id = $8) \
           AND status = 'pending' \
         RETURNING *",
    )
    .bind(patch.technical_skills)
    .bind(patch.communication_skills)
    .bind(patch.teamwork)
    .bind(patch.problem_solving)
    .bind(patch.overall_rating)
    .bind(&patch.comments)
    .bind(id)
    .bind(user.id)
    .fetch_optional(state.db.pool())
    .await?;

    match updated {
        Some(evaluation) => Ok(ApiResponse::ok(
            "Evaluation updated successfully",
            evaluation,
        )),
        None => Err(status::blocked(
            state.db.pool(),
            EVALUATIONS,
            id,
            TransitionScope::HostOrganization(user.id),
            "update",
        )
        .await),
    }
}

/// PUT /api/supervisor/evaluations/:id/complete (pending only, own organization)
pub async fn complete_evaluation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> ApiResult<Evaluation> {
    let updated: Option<Evaluation> = sqlx::query_as(
        "UPDATE evaluations \
         SET status = 'completed', updated_at = NOW() \
         WHERE id = $1 \
           AND organization_id = (SELECT id FROM organizations WHERE host_supervisor_id = $2) \
           AND status = 'pending' \
         RETURNING *",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(state.db.pool())
    .await?;

    match updated {
        Some(evaluation) => Ok(ApiResponse::ok(
            "Evaluation completed successfully",
            evaluation,
        )),
        None => Err(status::blocked(
            state.db.pool(),
            EVALUATIONS,
            id,
            TransitionScope::HostOrganization(user.id),
            "complete",
        )
        .await),
    }
}
