use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{on_unique_violation, ApiError};
use crate::models::{Application, Organization, OrganizationWithStats, RosterStudent, STUDENT_COLUMNS};
use crate::response::{ApiResponse, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub capacity: Option<i32>,
    pub host_supervisor_id: Option<i32>,
}

/// Patch for an organization; omitted fields are kept.
#[derive(Debug, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub capacity: Option<i32>,
    pub host_supervisor_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationSearchQuery {
    pub query: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentRequest {
    pub student_id: Option<i32>,
    pub organization_id: Option<i32>,
}

/// Organization plus the approved students currently attached to it
#[derive(Debug, Serialize)]
pub struct OrganizationDetail {
    #[serde(flatten)]
    pub organization: Organization,
    pub students: Vec<RosterStudent>,
}

/// GET /api/organizations/get-organizations (student)
pub async fn get_all_organizations(
    State(state): State<AppState>,
) -> ApiResult<Vec<OrganizationWithStats>> {
    let organizations: Vec<OrganizationWithStats> = sqlx::query_as(
        "SELECT o.*, \
                COUNT(a.id) AS total_applications, \
                COUNT(CASE WHEN a.status = 'approved' THEN 1 END) AS approved_applications \
         FROM organizations o \
         LEFT JOIN applications a ON o.id = a.organization_id \
         GROUP BY o.id \
         ORDER BY o.name",
    )
    .fetch_all(state.db.pool())
    .await?;

    Ok(ApiResponse::ok(
        "Organizations retrieved successfully",
        organizations,
    ))
}

/// GET /api/organizations/search-organizations (student)
pub async fn search_organizations(
    State(state): State<AppState>,
    Query(filter): Query<OrganizationSearchQuery>,
) -> ApiResult<Vec<OrganizationWithStats>> {
    let mut sql = String::from(
        "SELECT o.*, \
                COUNT(a.id) AS total_applications, \
                COUNT(CASE WHEN a.status = 'approved' THEN 1 END) AS approved_applications \
         FROM organizations o \
         LEFT JOIN applications a ON o.id = a.organization_id",
    );

    let mut conditions: Vec<String> = Vec::new();
    let mut n = 0;
    if filter.query.is_some() {
        n += 1;
        conditions.push(format!("(o.name ILIKE ${n} OR o.description ILIKE ${n})"));
    }
    if filter.location.is_some() {
        n += 1;
        conditions.push(format!("o.location ILIKE ${n}"));
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" GROUP BY o.id ORDER BY o.name");

    let mut query = sqlx::query_as::<_, OrganizationWithStats>(&sql);
    if let Some(term) = &filter.query {
        query = query.bind(format!("%{term}%"));
    }
    if let Some(location) = &filter.location {
        query = query.bind(format!("%{location}%"));
    }

    let organizations = query.fetch_all(state.db.pool()).await?;

    Ok(ApiResponse::ok(
        "Organizations search completed",
        organizations,
    ))
}

/// GET /api/organizations/get-organization/:id (student) and
/// GET /api/organizations/get-organizationById/:id (admin)
pub async fn get_organization_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<OrganizationDetail> {
    let organization: Option<Organization> =
        sqlx::query_as("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(state.db.pool())
            .await?;

    let Some(organization) = organization else {
        return Err(ApiError::not_found("Organization not found"));
    };

    let sql = format!(
        "SELECT {STUDENT_COLUMNS}, a.start_date, a.end_date, a.status AS application_status \
         FROM students s \
         JOIN applications a ON s.id = a.student_id \
         WHERE a.organization_id = $1 AND a.status = 'approved' \
         ORDER BY s.name"
    );
    let students: Vec<RosterStudent> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_all(state.db.pool())
        .await?;

    Ok(ApiResponse::ok(
        "Organization retrieved successfully",
        OrganizationDetail {
            organization,
            students,
        },
    ))
}

/// POST /api/organizations/create-organization (admin)
pub async fn create_organization(
    State(state): State<AppState>,
    Json(body): Json<CreateOrganizationRequest>,
) -> ApiResult<Organization> {
    let (Some(name), Some(industry), Some(location), Some(capacity), Some(contact_person), Some(contact_email)) = (
        body.name,
        body.industry,
        body.location,
        body.capacity,
        body.contact_person,
        body.contact_email,
    ) else {
        return Err(ApiError::bad_request(
            "Please provide name, industry, location, capacity, contact_person, and contact_email",
        ));
    };

    let mut tx = state.db.pool().begin().await?;

    let existing: Option<i32> =
        sqlx::query_scalar("SELECT id FROM organizations WHERE name = $1 OR contact_email = $2")
            .bind(&name)
            .bind(&contact_email)
            .fetch_optional(&mut *tx)
            .await?;

    if existing.is_some() {
        return Err(ApiError::bad_request(
            "Organization with this name or email already exists",
        ));
    }

    let organization: Organization = sqlx::query_as(
        "INSERT INTO organizations (name, industry, description, location, contact_person, \
                                    contact_email, contact_phone, capacity, host_supervisor_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING *",
    )
    .bind(&name)
    .bind(&industry)
    .bind(&body.description)
    .bind(&location)
    .bind(&contact_person)
    .bind(&contact_email)
    .bind(&body.contact_phone)
    .bind(capacity)
    .bind(body.host_supervisor_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| on_unique_violation(e, "Organization with this name or email already exists"))?;

    tx.commit().await?;

    Ok(ApiResponse::created(
        "Organization created successfully",
        organization,
    ))
}

/// PUT /api/organizations/update-organization/:id (admin)
pub async fn update_organization(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<OrganizationPatch>,
) -> ApiResult<Organization> {
    let updated: Option<Organization> = sqlx::query_as(
        "UPDATE organizations \
         SET name = COALESCE($1, name), \
             industry = COALESCE($2, industry), \
             description = COALESCE($3, description), \
             location = COALESCE($4, location), \
             contact_person = COALESCE($5, contact_person), \
             contact_email = COALESCE($6, contact_email), \
             contact_phone = COALESCE($7, contact_phone), \
             capacity = COALESCE($8, capacity), \
             host_supervisor_id = COALESCE($9, host_supervisor_id), \
             updated_at = NOW() \
         WHERE id = $10 \
         RETURNING *",
    )
    .bind(&patch.name)
    .bind(&patch.industry)
    .bind(&patch.description)
    .bind(&patch.location)
    .bind(&patch.contact_person)
    .bind(&patch.contact_email)
    .bind(&patch.contact_phone)
    .bind(patch.capacity)
    .bind(patch.host_supervisor_id)
    .bind(id)
    .fetch_optional(state.db.pool())
    .await?;

    match updated {
        Some(organization) => Ok(ApiResponse::ok(
            "Organization updated successfully",
            organization,
        )),
        None => Err(ApiError::not_found("Organization not found")),
    }
}

/// DELETE /api/organizations/delete-organization/:id (admin)
///
/// Blocked while the organization still hosts approved students; the explicit
/// pre-check yields a descriptive error instead of a constraint violation.
pub async fn delete_organization(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM applications WHERE organization_id = $1 AND status = 'approved'",
    )
    .bind(id)
    .fetch_one(state.db.pool())
    .await?;

    if active > 0 {
        return Err(ApiError::bad_request(
            "Cannot delete organization with active students",
        ));
    }

    let deleted: Option<i32> =
        sqlx::query_scalar("DELETE FROM organizations WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(state.db.pool())
            .await?;

    match deleted {
        Some(_) => Ok(ApiResponse::message_only("Organization deleted successfully")),
        None => Err(ApiError::not_found("Organization not found")),
    }
}

/// POST /api/organizations/assign-student-to-organization (admin)
///
/// Admin assignment creates a pending application, subject to the same
/// one-per-(student, organization) invariant as student submissions.
pub async fn assign_student_to_organization(
    State(state): State<AppState>,
    Json(body): Json<AssignmentRequest>,
) -> ApiResult<Application> {
    let (Some(student_id), Some(organization_id)) = (body.student_id, body.organization_id) else {
        return Err(ApiError::bad_request(
            "Please provide student_id and organization_id",
        ));
    };

    let mut tx = state.db.pool().begin().await?;

    let student: Option<i32> = sqlx::query_scalar("SELECT id FROM students WHERE id = $1")
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?;
    if student.is_none() {
        return Err(ApiError::not_found("Student not found"));
    }

    let organization: Option<i32> = sqlx::query_scalar("SELECT id FROM organizations WHERE id = $1")
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?;
    if organization.is_none() {
        return Err(ApiError::not_found("Organization not found"));
    }

    let existing: Option<i32> = sqlx::query_scalar(
        "SELECT id FROM applications WHERE student_id = $1 AND organization_id = $2",
    )
    .bind(student_id)
    .bind(organization_id)
    .fetch_optional(&mut *tx)
    .await?;

    if existing.is_some() {
        return Err(ApiError::bad_request(
            "Student is already assigned to this organization",
        ));
    }

    let application: Application = sqlx::query_as(
        "INSERT INTO applications (student_id, organization_id, status) \
         VALUES ($1, $2, 'pending') \
         RETURNING *",
    )
    .bind(student_id)
    .bind(organization_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| on_unique_violation(e, "Student is already assigned to this organization"))?;

    tx.commit().await?;

    Ok(ApiResponse::created(
        "Student assigned to organization successfully",
        application,
    ))
}

/// POST /api/organizations/remove-student-from-organization (admin)
pub async fn remove_student_from_organization(
    State(state): State<AppState>,
    Json(body): Json<AssignmentRequest>,
) -> ApiResult<()> {
    let (Some(student_id), Some(organization_id)) = (body.student_id, body.organization_id) else {
        return Err(ApiError::bad_request(
            "Please provide student_id and organization_id",
        ));
    };

    let deleted: Option<i32> = sqlx::query_scalar(
        "DELETE FROM applications WHERE student_id = $1 AND organization_id = $2 RETURNING id",
    )
    .bind(student_id)
    .bind(organization_id)
    .fetch_optional(state.db.pool())
    .await?;

    match deleted {
        Some(_) => Ok(ApiResponse::message_only(
            "Student removed from organization successfully",
        )),
        None => Err(ApiError::not_found(
            "Student is not assigned to this organization",
        )),
    }
}
