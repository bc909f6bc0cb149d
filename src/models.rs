use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Common shape every role partition projects onto (see
/// `RolePartition::account_columns`). The password hash never serializes.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccountRow {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_supervisor_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Slim account view for `GET /api/auth/user` and password-change responses
#[derive(Debug, FromRow, Serialize)]
pub struct AccountSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Row returned from registration inserts
#[derive(Debug, FromRow, Serialize)]
pub struct CreatedAccount {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

// -------------------------------------------------------------------------
// Students

/// Explicit student projection; never selects the password column.
pub const STUDENT_COLUMNS: &str = "s.id, s.name, s.email, s.role, s.course, s.student_id, \
                                   s.phone, s.school_supervisor_id, s.created_at, s.updated_at";

#[derive(Debug, FromRow, Serialize)]
pub struct Student {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub course: Option<String>,
    pub student_id: Option<String>,
    pub phone: Option<String>,
    pub school_supervisor_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct StudentWithStats {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub student: Student,
    pub total_applications: i64,
    pub approved_applications: i64,
    pub total_reports: i64,
}

/// Student row as seen on an organization roster (joined with the approved
/// application's attachment window)
#[derive(Debug, FromRow, Serialize)]
pub struct RosterStudent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub student: Student,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub application_status: String,
}

/// Roster row with per-student report progress (host supervisor view)
#[derive(Debug, FromRow, Serialize)]
pub struct AssignedStudent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub student: Student,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub application_status: String,
    pub total_reports: i64,
    pub approved_reports: i64,
}

// -------------------------------------------------------------------------
// Organizations

#[derive(Debug, FromRow, Serialize)]
pub struct Organization {
    pub id: i32,
    pub name: String,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub capacity: Option<i32>,
    pub host_supervisor_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct OrganizationWithStats {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub organization: Organization,
    pub total_applications: i64,
    pub approved_applications: i64,
}

// -------------------------------------------------------------------------
// Applications

#[derive(Debug, FromRow, Serialize)]
pub struct Application {
    pub id: i32,
    pub student_id: i32,
    pub organization_id: i32,
    pub position: Option<String>,
    pub attachment_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub motivation: Option<String>,
    pub skills: Option<String>,
    pub experience: Option<String>,
    pub availability: Option<String>,
    pub cover_letter: Option<String>,
    pub status: String,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Student's own application with the organization joined in for display
#[derive(Debug, FromRow, Serialize)]
pub struct ApplicationWithOrg {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: Application,
    pub organization_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Application as listed for reviewers, with both parties' names joined in
#[derive(Debug, FromRow, Serialize)]
pub struct ApplicationReviewRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: Application,
    pub student_name: String,
    pub student_email: String,
    pub organization_name: String,
    pub organization_location: Option<String>,
}

/// Single-application reviewer view
#[derive(Debug, FromRow, Serialize)]
pub struct ApplicationDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: Application,
    pub student_name: String,
    pub student_email: String,
    pub course: Option<String>,
    pub organization_name: String,
    pub location: Option<String>,
}

// -------------------------------------------------------------------------
// Reports

#[derive(Debug, FromRow, Serialize)]
pub struct Report {
    pub id: i32,
    pub student_id: i32,
    pub report_title: String,
    pub week_number: i32,
    pub activities: String,
    pub achievements: String,
    pub challenges: String,
    pub key_learnings: String,
    pub next_weeks_plans: String,
    pub attachment_url: Option<String>,
    pub status: String,
    pub feedback: Option<String>,
    pub grade: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct ReportWithOrg {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub report: Report,
    pub organization_name: Option<String>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct ReportWithStudent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub report: Report,
    pub student_name: String,
    pub student_email: String,
    pub course: Option<String>,
    pub organization_name: Option<String>,
}

// -------------------------------------------------------------------------
// Evaluations

#[derive(Debug, FromRow, Serialize)]
pub struct Evaluation {
    pub id: i32,
    pub student_id: i32,
    pub organization_id: i32,
    pub evaluation_period: String,
    pub technical_skills: Option<i32>,
    pub communication_skills: Option<i32>,
    pub teamwork: Option<i32>,
    pub problem_solving: Option<i32>,
    pub overall_rating: i32,
    pub comments: Option<String>,
    pub status: String,
    pub evaluated_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct EvaluationWithStudent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub evaluation: Evaluation,
    pub student_name: String,
    pub student_email: String,
}

// -------------------------------------------------------------------------
// Attendance

#[derive(Debug, FromRow, Serialize)]
pub struct Attendance {
    pub id: i32,
    pub student_id: i32,
    pub organization_id: i32,
    pub date: NaiveDate,
    pub status: String,
    pub notes: Option<String>,
    pub marked_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct AttendanceWithStudent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub attendance: Attendance,
    pub student_name: String,
    pub student_email: String,
}

// -------------------------------------------------------------------------
// Generic users partition

#[derive(Debug, FromRow, Serialize)]
pub struct UserRow {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -------------------------------------------------------------------------
// School supervisors (admin management views)

pub const SUPERVISOR_COLUMNS: &str =
    "s.id, s.name, s.email, s.role, s.department, s.phone, s.created_at, s.updated_at";

#[derive(Debug, FromRow, Serialize)]
pub struct Supervisor {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct SupervisorWithStats {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub supervisor: Supervisor,
    pub total_students: i64,
}
