use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{on_unique_violation, ApiError};
use crate::middleware::AuthUser;
use crate::models::{Application, ApplicationDetail, ApplicationReviewRow, ApplicationWithOrg};
use crate::response::{ApiResponse, ApiResult};
use crate::services::status::{self, Status, TransitionScope, APPLICATIONS};
use crate::AppState;

const DUPLICATE_APPLICATION: &str = "You have already applied to this organization";

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub organization_id: Option<i32>,
    pub position: Option<String>,
    pub attachment_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub motivation: Option<String>,
    pub skills: Option<String>,
    pub experience: Option<String>,
    pub availability: Option<String>,
    pub cover_letter: Option<String>,
}

/// Patch for a student's own pending application; omitted fields are kept.
#[derive(Debug, Deserialize)]
pub struct ApplicationPatch {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub cover_letter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
    pub feedback: Option<String>,
}

/// POST /api/applications/create-application (student)
pub async fn create_application(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateApplicationRequest>,
) -> ApiResult<Application> {
    let (Some(organization_id), Some(start_date), Some(end_date)) =
        (body.organization_id, body.start_date, body.end_date)
    else {
        return Err(ApiError::bad_request(
            "Please provide organization_id, start_date, and end_date",
        ));
    };

    let mut tx = state.db.pool().begin().await?;

    // One application per (student, organization); the unique index backs
    // this check up against concurrent submissions.
    let existing: Option<i32> = sqlx::query_scalar(
        "SELECT id FROM applications WHERE student_id = $1 AND organization_id = $2",
    )
    .bind(user.id)
    .bind(organization_id)
    .fetch_optional(&mut *tx)
    .await?;

    if existing.is_some() {
        return Err(ApiError::bad_request(DUPLICATE_APPLICATION));
    }

    let application: Application = sqlx::query_as(
        "INSERT INTO applications (student_id, organization_id, position, attachment_type, \
                                   start_date, end_date, motivation, skills, experience, \
                                   availability, cover_letter, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending') \
         RETURNING *",
    )
    .bind(user.id)
    .bind(organization_id)
    .bind(&body.position)
    .bind(&body.attachment_type)
    .bind(start_date)
    .bind(end_date)
    .bind(&body.motivation)
    .bind(&body.skills)
    .bind(&body.experience)
    .bind(&body.availability)
    .bind(&body.cover_letter)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| on_unique_violation(e, DUPLICATE_APPLICATION))?;

    tx.commit().await?;

    Ok(ApiResponse::created(
        "Application submitted successfully",
        application,
    ))
}

/// GET /api/applications/get-applications (student)
pub async fn get_student_applications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<ApplicationWithOrg>> {
    let applications: Vec<ApplicationWithOrg> = sqlx::query_as(
        "SELECT a.*, o.name AS organization_name, o.location, o.description \
         FROM applications a \
         JOIN organizations o ON a.organization_id = o.id \
         WHERE a.student_id = $1 \
         ORDER BY a.created_at DESC",
    )
    .bind(user.id)
    .fetch_all(state.db.pool())
    .await?;

    Ok(ApiResponse::ok(
        "Student applications retrieved successfully",
        applications,
    ))
}

/// PUT /api/applications/update-application/:id (student, pending only)
pub async fn update_application(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(patch): Json<ApplicationPatch>,
) -> ApiResult<Application> {
    let updated: Option<Application> = sqlx::query_as(
        "UPDATE applications \
         SET start_date = COALESCE($1, start_date), \
             end_date = COALESCE($2, end_date), \
             cover_letter = COALESCE($3, cover_letter), \
             updated_at = NOW() \
         WHERE id = $4 AND student_id = $5 AND status = 'pending' \
         RETURNING *",
    )
    .bind(patch.start_date)
    .bind(patch.end_date)
    .bind(&patch.cover_letter)
    .bind(id)
    .bind(user.id)
    .fetch_optional(state.db.pool())
    .await?;

    match updated {
        Some(application) => Ok(ApiResponse::ok(
            "Application updated successfully",
            application,
        )),
        None => Err(status::blocked(
            state.db.pool(),
            APPLICATIONS,
            id,
            TransitionScope::Student(user.id),
            "update",
        )
        .await),
    }
}

/// DELETE /api/applications/delete-application/:id (student, pending only)
pub async fn delete_application(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    let deleted: Option<i32> = sqlx::query_scalar(
        "DELETE FROM applications \
         WHERE id = $1 AND student_id = $2 AND status = 'pending' \
         RETURNING id",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(state.db.pool())
    .await?;

    match deleted {
        Some(_) => Ok(ApiResponse::message_only("Application deleted successfully")),
        None => Err(status::blocked(
            state.db.pool(),
            APPLICATIONS,
            id,
            TransitionScope::Student(user.id),
            "delete",
        )
        .await),
    }
}

/// GET /api/applications/get-all-applications (admin)
pub async fn get_all_applications(
    State(state): State<AppState>,
) -> ApiResult<Vec<ApplicationReviewRow>> {
    let applications: Vec<ApplicationReviewRow> = sqlx::query_as(
        "SELECT a.*, s.name AS student_name, s.email AS student_email, \
                o.name AS organization_name, o.location AS organization_location \
         FROM applications a \
         JOIN students s ON a.student_id = s.id \
         JOIN organizations o ON a.organization_id = o.id \
         ORDER BY a.created_at DESC",
    )
    .fetch_all(state.db.pool())
    .await?;

    Ok(ApiResponse::ok(
        "Applications retrieved successfully",
        applications,
    ))
}

/// GET /api/applications/get-pending-applications (supervisor or admin)
pub async fn get_pending_applications(
    State(state): State<AppState>,
) -> ApiResult<Vec<ApplicationReviewRow>> {
    let applications: Vec<ApplicationReviewRow> = sqlx::query_as(
        "SELECT a.*, s.name AS student_name, s.email AS student_email, \
                o.name AS organization_name, o.location AS organization_location \
         FROM applications a \
         JOIN students s ON a.student_id = s.id \
         JOIN organizations o ON a.organization_id = o.id \
         WHERE a.status = 'pending' \
         ORDER BY a.created_at DESC",
    )
    .fetch_all(state.db.pool())
    .await?;

    Ok(ApiResponse::ok(
        "Pending applications retrieved successfully",
        applications,
    ))
}

/// GET /api/applications/get-application/:id (supervisor or admin)
pub async fn get_application_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<ApplicationDetail> {
    let application: Option<ApplicationDetail> = sqlx::query_as(
        "SELECT a.*, s.name AS student_name, s.email AS student_email, s.course, \
                o.name AS organization_name, o.location \
         FROM applications a \
         JOIN students s ON a.student_id = s.id \
         JOIN organizations o ON a.organization_id = o.id \
         WHERE a.id = $1",
    )
    .bind(id)
    .fetch_optional(state.db.pool())
    .await?;

    match application {
        Some(application) => Ok(ApiResponse::ok(
            "Application retrieved successfully",
            application,
        )),
        None => Err(ApiError::not_found("Application not found")),
    }
}

/// PUT /api/applications/update-application-status/:id (supervisor or admin)
pub async fn update_application_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<StatusUpdateRequest>,
) -> ApiResult<Application> {
    let status = body
        .status
        .as_deref()
        .and_then(Status::parse)
        .filter(|s| s.is_review_status())
        .ok_or_else(|| {
            ApiError::bad_request("Please provide a valid status (pending, approved, rejected)")
        })?;

    let updated: Option<Application> = sqlx::query_as(
        "UPDATE applications \
         SET status = $1, feedback = $2, updated_at = NOW() \
         WHERE id = $3 AND status = 'pending' \
         RETURNING *",
    )
    .bind(status.as_str())
    .bind(&body.feedback)
    .bind(id)
    .fetch_optional(state.db.pool())
    .await?;

    match updated {
        Some(application) => Ok(ApiResponse::ok(
            "Application status updated successfully",
            application,
        )),
        None => Err(status::blocked(
            state.db.pool(),
            APPLICATIONS,
            id,
            TransitionScope::Any,
            "update",
        )
        .await),
    }
}

/// PUT /api/applications/approve-application/:id (supervisor or admin)
pub async fn approve_application(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Application> {
    transition_application(&state, id, Status::Approved, "approve").await
}

/// PUT /api/applications/reject-application/:id (supervisor or admin)
pub async fn reject_application(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Application> {
    transition_application(&state, id, Status::Rejected, "reject").await
}

async fn transition_application(
    state: &AppState,
    id: i32,
    to: Status,
    verb: &str,
) -> ApiResult<Application> {
    let updated: Option<Application> = sqlx::query_as(
        "UPDATE applications \
         SET status = $1, updated_at = NOW() \
         WHERE id = $2 AND status = 'pending' \
         RETURNING *",
    )
    .bind(to.as_str())
    .bind(id)
    .fetch_optional(state.db.pool())
    .await?;

    match updated {
        Some(application) => Ok(ApiResponse::ok(
            format!("Application {} successfully", to.as_str()),
            application,
        )),
        None => Err(status::blocked(
            state.db.pool(),
            APPLICATIONS,
            id,
            TransitionScope::Any,
            verb,
        )
        .await),
    }
}
