use axum::{
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;
pub mod services;

use middleware::auth::{
    require_auth, require_role, ADMIN_ONLY, HOST_SUPERVISOR_ONLY, REVIEWERS,
    SCHOOL_SUPERVISOR_ONLY, STUDENT_ONLY, SUPERVISORS,
};

/// Shared application state: the injected database handle.
#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
}

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/applications", application_routes())
        .nest("/reports", report_routes())
        .nest("/supervisor", supervisor_routes())
        .nest("/organizations", organization_routes())
        .nest("/students", student_routes())
        .nest("/users", user_routes())
        .nest("/admin", admin_routes())
        .nest("/profile", profile_routes())
        .nest("/dashboard", dashboard_routes());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS restricted to the configured frontend origin allow-list
fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = config::config()
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    let protected = Router::new()
        .route("/user", get(auth::get_user))
        .route("/logout", post(auth::logout))
        .route_layer(axum_middleware::from_fn(require_auth));

    Router::new()
        .route("/create-user", post(auth::create_user))
        .route("/login", post(auth::login))
        .merge(protected)
}

fn application_routes() -> Router<AppState> {
    use handlers::applications;

    let student = Router::new()
        .route("/create-application", post(applications::create_application))
        .route("/get-applications", get(applications::get_student_applications))
        .route("/update-application/:id", put(applications::update_application))
        .route("/delete-application/:id", delete(applications::delete_application))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(STUDENT_ONLY, req, next)
        }));

    let admin = Router::new()
        .route("/get-all-applications", get(applications::get_all_applications))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(ADMIN_ONLY, req, next)
        }));

    let review = Router::new()
        .route("/get-application/:id", get(applications::get_application_by_id))
        .route("/get-pending-applications", get(applications::get_pending_applications))
        .route(
            "/update-application-status/:id",
            put(applications::update_application_status),
        )
        .route("/approve-application/:id", put(applications::approve_application))
        .route("/reject-application/:id", put(applications::reject_application))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(REVIEWERS, req, next)
        }));

    Router::new()
        .merge(student)
        .merge(admin)
        .merge(review)
        .route_layer(axum_middleware::from_fn(require_auth))
}

fn report_routes() -> Router<AppState> {
    use handlers::reports;

    let student = Router::new()
        .route("/create-report", post(reports::create_report))
        .route("/get-student-reports", get(reports::get_student_reports))
        .route("/update-report/:id", put(reports::update_report))
        .route("/delete-report/:id", delete(reports::delete_report))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(STUDENT_ONLY, req, next)
        }));

    let admin = Router::new()
        .route("/get-all-reports", get(reports::get_all_reports))
        .route("/get-pending-reports", get(reports::get_pending_reports))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(ADMIN_ONLY, req, next)
        }));

    let supervisor = Router::new()
        .route("/get-supervisor-reports", get(reports::get_supervisor_reports))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(SUPERVISORS, req, next)
        }));

    let review = Router::new()
        .route("/get-report/:id", get(reports::get_report_by_id))
        .route("/update-report-status/:id", put(reports::update_report_status))
        .route("/approve-report/:id", put(reports::approve_report))
        .route("/reject-report/:id", put(reports::reject_report))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(REVIEWERS, req, next)
        }));

    Router::new()
        .merge(student)
        .merge(admin)
        .merge(supervisor)
        .merge(review)
        .route_layer(axum_middleware::from_fn(require_auth))
}

fn supervisor_routes() -> Router<AppState> {
    use handlers::supervisor;

    Router::new()
        .route("/organization", get(supervisor::get_organization))
        .route("/students", get(supervisor::get_assigned_students))
        .route("/attendance", post(supervisor::mark_attendance))
        .route("/attendance", get(supervisor::get_attendance_records))
        .route("/evaluations", post(supervisor::create_evaluation))
        .route("/evaluations", get(supervisor::get_evaluations))
        .route("/evaluations/:id", put(supervisor::update_evaluation))
        .route("/evaluations/:id/complete", put(supervisor::complete_evaluation))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(HOST_SUPERVISOR_ONLY, req, next)
        }))
        .route_layer(axum_middleware::from_fn(require_auth))
}

fn organization_routes() -> Router<AppState> {
    use handlers::organizations;

    let student = Router::new()
        .route("/get-organizations", get(organizations::get_all_organizations))
        .route("/search-organizations", get(organizations::search_organizations))
        .route("/get-organization/:id", get(organizations::get_organization_by_id))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(STUDENT_ONLY, req, next)
        }));

    let admin = Router::new()
        .route("/create-organization", post(organizations::create_organization))
        .route("/update-organization/:id", put(organizations::update_organization))
        .route("/delete-organization/:id", delete(organizations::delete_organization))
        .route("/get-organizationById/:id", get(organizations::get_organization_by_id))
        .route(
            "/assign-student-to-organization",
            post(organizations::assign_student_to_organization),
        )
        .route(
            "/remove-student-from-organization",
            post(organizations::remove_student_from_organization),
        )
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(ADMIN_ONLY, req, next)
        }));

    Router::new()
        .merge(student)
        .merge(admin)
        .route_layer(axum_middleware::from_fn(require_auth))
}

fn student_routes() -> Router<AppState> {
    use handlers::students;

    let admin = Router::new()
        .route("/get-all-students", get(students::get_all_students))
        .route("/create-student", post(students::create_student))
        .route("/search-student", get(students::search_students))
        .route("/get-student/:id", get(students::get_student_by_id))
        .route("/update-student/:id", put(students::update_student))
        .route("/delete-student/:id", delete(students::delete_student))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(ADMIN_ONLY, req, next)
        }));

    let supervisor = Router::new()
        .route("/supervisor/students", get(students::get_students_by_supervisor))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(SUPERVISORS, req, next)
        }));

    Router::new()
        .merge(admin)
        .merge(supervisor)
        .route_layer(axum_middleware::from_fn(require_auth))
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route("/", get(users::get_all_users))
        .route("/", post(users::create_user))
        .route("/search", get(users::search_users))
        .route("/stats", get(users::get_user_stats))
        .route("/:id", get(users::get_user_by_id))
        .route("/:id", put(users::update_user))
        .route("/:id", delete(users::delete_user))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(ADMIN_ONLY, req, next)
        }))
        .route_layer(axum_middleware::from_fn(require_auth))
}

fn admin_routes() -> Router<AppState> {
    use handlers::admin;

    Router::new()
        .route("/stats", get(admin::get_admin_stats))
        .route("/analytics", get(admin::get_system_analytics))
        .route("/activities", get(admin::get_recent_activities))
        .route("/supervisors", get(admin::get_all_supervisors))
        .route("/supervisors", post(admin::create_supervisor))
        .route("/supervisors/:id", put(admin::update_supervisor))
        .route("/supervisors/:id", delete(admin::delete_supervisor))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(ADMIN_ONLY, req, next)
        }))
        .route_layer(axum_middleware::from_fn(require_auth))
}

fn profile_routes() -> Router<AppState> {
    use handlers::profile;

    Router::new()
        .route("/get-profile", get(profile::get_profile))
        .route("/update-profile", put(profile::update_profile))
        .route("/change-password", put(profile::change_password))
        .route("/get-activity", get(profile::get_user_activity))
        .route_layer(axum_middleware::from_fn(require_auth))
}

fn dashboard_routes() -> Router<AppState> {
    use handlers::dashboard;

    let admin = Router::new()
        .route("/admin", get(dashboard::admin_dashboard))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(ADMIN_ONLY, req, next)
        }));

    let student = Router::new()
        .route("/student", get(dashboard::student_dashboard))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(STUDENT_ONLY, req, next)
        }));

    let school = Router::new()
        .route("/school-supervisor", get(dashboard::school_supervisor_dashboard))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(SCHOOL_SUPERVISOR_ONLY, req, next)
        }));

    let host = Router::new()
        .route("/host-supervisor", get(dashboard::host_supervisor_dashboard))
        .route_layer(axum_middleware::from_fn(|req, next| {
            require_role(HOST_SUPERVISOR_ONLY, req, next)
        }));

    Router::new()
        .merge(admin)
        .merge(student)
        .merge(school)
        .merge(host)
        .route_layer(axum_middleware::from_fn(require_auth))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "message": "School Attachment System API is running!",
        "data": {
            "name": "Attachment API",
            "version": version,
            "endpoints": {
                "auth": "/api/auth/* (login and registration public, rest protected)",
                "applications": "/api/applications/* (protected)",
                "reports": "/api/reports/* (protected)",
                "supervisor": "/api/supervisor/* (host supervisor)",
                "organizations": "/api/organizations/* (protected)",
                "students": "/api/students/* (protected)",
                "users": "/api/users/* (admin)",
                "admin": "/api/admin/* (admin)",
                "profile": "/api/profile/* (protected)",
                "dashboard": "/api/dashboard/:role (protected)",
            },
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state.db.health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "message": "ok",
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "message": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
