use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::password;
use crate::config;
use crate::error::{on_unique_violation, ApiError};
use crate::middleware::AuthUser;
use crate::models::{
    ApplicationWithOrg, ReportWithOrg, Student, StudentWithStats, STUDENT_COLUMNS,
};
use crate::response::{ApiResponse, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub course: Option<String>,
    pub student_id: Option<String>,
    pub phone: Option<String>,
    pub school_supervisor_id: Option<i32>,
}

/// Patch for a student record; omitted fields are kept.
#[derive(Debug, Deserialize)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub course: Option<String>,
    pub student_id: Option<String>,
    pub phone: Option<String>,
    pub school_supervisor_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct StudentSearchQuery {
    pub query: Option<String>,
    pub course: Option<String>,
    pub supervisor_id: Option<i32>,
}

/// Full admin view of one student, with their applications and reports
#[derive(Debug, Serialize)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub student: StudentWithStats,
    pub applications: Vec<ApplicationWithOrg>,
    pub reports: Vec<ReportWithOrg>,
}

fn with_stats_select(extra: &str) -> String {
    format!(
        "SELECT {STUDENT_COLUMNS}, \
                COUNT(DISTINCT a.id) AS total_applications, \
                COUNT(DISTINCT CASE WHEN a.status = 'approved' THEN a.id END) AS approved_applications, \
                COUNT(DISTINCT r.id) AS total_reports \
         FROM students s \
         LEFT JOIN applications a ON s.id = a.student_id \
         LEFT JOIN reports r ON s.id = r.student_id \
         {extra} \
         GROUP BY s.id"
    )
}

/// GET /api/students/get-all-students (admin)
pub async fn get_all_students(State(state): State<AppState>) -> ApiResult<Vec<StudentWithStats>> {
    let sql = format!("{} ORDER BY s.name", with_stats_select(""));
    let students: Vec<StudentWithStats> = sqlx::query_as(&sql).fetch_all(state.db.pool()).await?;

    Ok(ApiResponse::ok("Students retrieved successfully", students))
}

/// GET /api/students/supervisor/students (supervisor)
pub async fn get_students_by_supervisor(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<StudentWithStats>> {
    let sql = format!(
        "{} ORDER BY s.name",
        with_stats_select("WHERE s.school_supervisor_id = $1")
    );
    let students: Vec<StudentWithStats> = sqlx::query_as(&sql)
        .bind(user.id)
        .fetch_all(state.db.pool())
        .await?;

    Ok(ApiResponse::ok(
        "Supervisor students retrieved successfully",
        students,
    ))
}

/// GET /api/students/get-student/:id (admin)
pub async fn get_student_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<StudentDetail> {
    let sql = with_stats_select("WHERE s.id = $1");
    let student: Option<StudentWithStats> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(state.db.pool())
        .await?;

    let Some(student) = student else {
        return Err(ApiError::not_found("Student not found"));
    };

    let applications: Vec<ApplicationWithOrg> = sqlx::query_as(
        "SELECT a.*, o.name AS organization_name, o.location, o.description \
         FROM applications a \
         JOIN organizations o ON a.organization_id = o.id \
         WHERE a.student_id = $1 \
         ORDER BY a.created_at DESC",
    )
    .bind(id)
    .fetch_all(state.db.pool())
    .await?;

    let reports: Vec<ReportWithOrg> = sqlx::query_as(
        "SELECT r.*, o.name AS organization_name \
         FROM reports r \
         LEFT JOIN applications a ON r.student_id = a.student_id AND a.status = 'approved' \
         LEFT JOIN organizations o ON a.organization_id = o.id \
         WHERE r.student_id = $1 \
         ORDER BY r.week_number DESC",
    )
    .bind(id)
    .fetch_all(state.db.pool())
    .await?;

    Ok(ApiResponse::ok(
        "Student retrieved successfully",
        StudentDetail {
            student,
            applications,
            reports,
        },
    ))
}

/// POST /api/students/create-student (admin)
pub async fn create_student(
    State(state): State<AppState>,
    Json(body): Json<CreateStudentRequest>,
) -> ApiResult<Student> {
    let (Some(name), Some(email), Some(plain), Some(course), Some(student_no)) = (
        body.name,
        body.email,
        body.password,
        body.course,
        body.student_id,
    ) else {
        return Err(ApiError::bad_request(
            "Please provide name, email, password, course, and student_id",
        ));
    };

    let mut tx = state.db.pool().begin().await?;

    let existing: Option<i32> =
        sqlx::query_scalar("SELECT id FROM students WHERE email = $1 OR student_id = $2")
            .bind(&email)
            .bind(&student_no)
            .fetch_optional(&mut *tx)
            .await?;

    if existing.is_some() {
        return Err(ApiError::bad_request(
            "Student with this email or student ID already exists",
        ));
    }

    let hashed = password::hash(&plain, config::config().security.bcrypt_cost)?;

    let sql = format!(
        "INSERT INTO students (name, email, password, course, student_id, phone, \
                               school_supervisor_id, role) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'student') \
         RETURNING {}",
        STUDENT_COLUMNS.replace("s.", "")
    );
    let student: Student = sqlx::query_as(&sql)
        .bind(&name)
        .bind(&email)
        .bind(&hashed)
        .bind(&course)
        .bind(&student_no)
        .bind(&body.phone)
        .bind(body.school_supervisor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            on_unique_violation(e, "Student with this email or student ID already exists")
        })?;

    tx.commit().await?;

    Ok(ApiResponse::created("Student created successfully", student))
}

/// PUT /api/students/update-student/:id (admin)
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<StudentPatch>,
) -> ApiResult<Student> {
    let sql = format!(
        "UPDATE students \
         SET name = COALESCE($1, name), \
             email = COALESCE($2, email), \
             course = COALESCE($3, course), \
             student_id = COALESCE($4, student_id), \
             phone = COALESCE($5, phone), \
             school_supervisor_id = COALESCE($6, school_supervisor_id), \
             updated_at = NOW() \
         WHERE id = $7 \
         RETURNING {}",
        STUDENT_COLUMNS.replace("s.", "")
    );
    let updated: Option<Student> = sqlx::query_as(&sql)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.course)
        .bind(&patch.student_id)
        .bind(&patch.phone)
        .bind(patch.school_supervisor_id)
        .bind(id)
        .fetch_optional(state.db.pool())
        .await?;

    match updated {
        Some(student) => Ok(ApiResponse::ok("Student updated successfully", student)),
        None => Err(ApiError::not_found("Student not found")),
    }
}

/// DELETE /api/students/delete-student/:id (admin)
///
/// Blocked while the student owns any application or report.
pub async fn delete_student(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<()> {
    let (applications, reports): (i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM applications WHERE student_id = $1), \
                (SELECT COUNT(*) FROM reports WHERE student_id = $1)",
    )
    .bind(id)
    .fetch_one(state.db.pool())
    .await?;

    if applications > 0 || reports > 0 {
        return Err(ApiError::bad_request(
            "Cannot delete student with existing applications or reports",
        ));
    }

    let deleted: Option<i32> = sqlx::query_scalar("DELETE FROM students WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(state.db.pool())
        .await?;

    match deleted {
        Some(_) => Ok(ApiResponse::message_only("Student deleted successfully")),
        None => Err(ApiError::not_found("Student not found")),
    }
}

/// GET /api/students/search-student (admin)
pub async fn search_students(
    State(state): State<AppState>,
    Query(filter): Query<StudentSearchQuery>,
) -> ApiResult<Vec<StudentWithStats>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut n = 0;
    if filter.query.is_some() {
        n += 1;
        conditions.push(format!(
            "(s.name ILIKE ${n} OR s.email ILIKE ${n} OR s.student_id ILIKE ${n})"
        ));
    }
    if filter.course.is_some() {
        n += 1;
        conditions.push(format!("s.course ILIKE ${n}"));
    }
    if filter.supervisor_id.is_some() {
        n += 1;
        conditions.push(format!("s.school_supervisor_id = ${n}"));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let sql = format!("{} ORDER BY s.name", with_stats_select(&where_clause));

    let mut query = sqlx::query_as::<_, StudentWithStats>(&sql);
    if let Some(term) = &filter.query {
        query = query.bind(format!("%{term}%"));
    }
    if let Some(course) = &filter.course {
        query = query.bind(format!("%{course}%"));
    }
    if let Some(supervisor_id) = filter.supervisor_id {
        query = query.bind(supervisor_id);
    }

    let students = query.fetch_all(state.db.pool()).await?;

    Ok(ApiResponse::ok("Students search completed", students))
}
