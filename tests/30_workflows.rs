//! End-to-end lifecycle scenarios: application uniqueness and transitions,
//! report preconditions, attendance marking. These need a reachable database
//! (DATABASE_URL with migrations applied); when the server reports degraded
//! health they skip instead of failing.

mod common;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

async fn database_available(base_url: &str) -> Result<bool> {
    let res = Client::new().get(format!("{}/health", base_url)).send().await?;
    Ok(res.status() == StatusCode::OK)
}

fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}")
}

struct Session {
    client: Client,
    base_url: String,
    token: String,
    user_id: i64,
}

impl Session {
    async fn register_and_login(base_url: &str, role: &str, name: &str) -> Result<Session> {
        let client = Client::new();
        let email = format!("{}@example.com", unique(name));
        let password = "s3cret-pass";

        let res = client
            .post(format!("{base_url}/api/auth/create-user"))
            .json(&json!({ "role": role, "name": name, "email": email, "password": password }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED, "registration failed");

        let res = client
            .post(format!("{base_url}/api/auth/login"))
            .json(&json!({ "role": role, "email": email, "password": password }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::OK, "login failed");
        let body = res.json::<Value>().await?;

        Ok(Session {
            client,
            base_url: base_url.to_string(),
            token: body["data"]["token"].as_str().unwrap().to_string(),
            user_id: body["data"]["user"]["id"].as_i64().unwrap(),
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .put(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }
}

/// Create an organization as admin, returning its id. The host supervisor is
/// linked when an id is supplied.
async fn create_organization(admin: &Session, host_supervisor_id: Option<i64>) -> Result<i64> {
    let (status, body) = admin
        .post(
            "/api/organizations/create-organization",
            json!({
                "name": unique("Acme Engineering"),
                "industry": "Engineering",
                "location": "Nairobi",
                "capacity": 10,
                "contact_person": "Jane Doe",
                "contact_email": format!("{}@acme.example.com", unique("contact")),
                "host_supervisor_id": host_supervisor_id,
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "org create failed: {body}");
    Ok(body["data"]["id"].as_i64().unwrap())
}

#[tokio::test]
async fn application_lifecycle_enforces_uniqueness_and_pending_transitions() -> Result<()> {
    let server = common::ensure_server().await?;
    if !database_available(&server.base_url).await? {
        eprintln!("skipping: no database attached");
        return Ok(());
    }

    let admin = Session::register_and_login(&server.base_url, "admin", "admin-a").await?;
    let student = Session::register_and_login(&server.base_url, "student", "student-a").await?;
    let org_id = create_organization(&admin, None).await?;

    // First submission succeeds and starts pending
    let (status, body) = student
        .post(
            "/api/applications/create-application",
            json!({
                "organization_id": org_id,
                "start_date": "2024-07-01",
                "end_date": "2024-12-01",
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    let app_id = body["data"]["id"].as_i64().unwrap();

    // Second submission to the same organization is a conflict
    let (status, body) = student
        .post(
            "/api/applications/create-application",
            json!({
                "organization_id": org_id,
                "start_date": "2024-07-01",
                "end_date": "2024-12-01",
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You have already applied to this organization");

    // Partial update only replaces what the patch provides
    let (status, body) = student
        .put(
            &format!("/api/applications/update-application/{app_id}"),
            json!({ "cover_letter": "Attached is my cover letter" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["start_date"], "2024-07-01");
    assert_eq!(body["data"]["end_date"], "2024-12-01");
    assert_eq!(body["data"]["cover_letter"], "Attached is my cover letter");

    // Admin approves the pending application
    let (status, body) = admin
        .put(&format!("/api/applications/approve-application/{app_id}"), json!({}))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "approved");

    // A second transition is rejected and the stored status stays approved
    let (status, body) = admin
        .put(&format!("/api/applications/reject-application/{app_id}"), json!({}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Can only reject pending applications");

    let (status, body) = admin
        .put(
            &format!("/api/applications/update-application-status/{app_id}"),
            json!({ "status": "rejected" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    // Students may no longer mutate the application once it left pending
    let (status, _) = student
        .put(
            &format!("/api/applications/update-application/{app_id}"),
            json!({ "cover_letter": "too late" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn reports_require_approved_application_and_unique_weeks() -> Result<()> {
    let server = common::ensure_server().await?;
    if !database_available(&server.base_url).await? {
        eprintln!("skipping: no database attached");
        return Ok(());
    }

    let admin = Session::register_and_login(&server.base_url, "admin", "admin-r").await?;
    let student = Session::register_and_login(&server.base_url, "student", "student-r").await?;
    let org_id = create_organization(&admin, None).await?;

    let report = |week: i64| {
        json!({
            "report_title": format!("Week {week}"),
            "week_number": week,
            "activities": "Built features",
            "achievements": "Shipped one",
            "challenges": "Flaky CI",
            "key_learnings": "Testing matters",
            "next_weeks_plans": "More features",
        })
    };

    // No approved application yet
    let (status, body) = student.post("/api/reports/create-report", report(1)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "You must have an approved application to submit reports"
    );

    // Apply and get approved
    let (status, body) = student
        .post(
            "/api/applications/create-application",
            json!({
                "organization_id": org_id,
                "start_date": "2024-07-01",
                "end_date": "2024-12-01",
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let app_id = body["data"]["id"].as_i64().unwrap();
    let (status, _) = admin
        .put(&format!("/api/applications/approve-application/{app_id}"), json!({}))
        .await?;
    assert_eq!(status, StatusCode::OK);

    // Week 1 succeeds once, fails on resubmission, week 2 succeeds
    let (status, body) = student.post("/api/reports/create-report", report(1)).await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = student.post("/api/reports/create-report", report(1)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Report for this week already exists");

    let (status, _) = student.post("/api/reports/create-report", report(2)).await?;
    assert_eq!(status, StatusCode::CREATED);

    Ok(())
}

#[tokio::test]
async fn attendance_is_scoped_to_own_organization_and_unique_per_day() -> Result<()> {
    let server = common::ensure_server().await?;
    if !database_available(&server.base_url).await? {
        eprintln!("skipping: no database attached");
        return Ok(());
    }

    let admin = Session::register_and_login(&server.base_url, "admin", "admin-h").await?;
    let host =
        Session::register_and_login(&server.base_url, "host_supervisor", "host-sup").await?;
    let student = Session::register_and_login(&server.base_url, "student", "student-h").await?;
    let outsider = Session::register_and_login(&server.base_url, "student", "student-x").await?;

    let org_id = create_organization(&admin, Some(host.user_id)).await?;

    // Approved placement for the first student only
    let (status, body) = student
        .post(
            "/api/applications/create-application",
            json!({
                "organization_id": org_id,
                "start_date": "2024-07-01",
                "end_date": "2024-12-01",
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let app_id = body["data"]["id"].as_i64().unwrap();
    let (status, _) = admin
        .put(&format!("/api/applications/approve-application/{app_id}"), json!({}))
        .await?;
    assert_eq!(status, StatusCode::OK);

    // Marking attendance for the assigned student works once per day
    let (status, body) = host
        .post(
            "/api/supervisor/attendance",
            json!({ "student_id": student.user_id, "date": "2024-07-02", "status": "present" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = host
        .post(
            "/api/supervisor/attendance",
            json!({ "student_id": student.user_id, "date": "2024-07-02", "status": "late" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Attendance already marked for this date");

    // A student without an approved placement here is invisible to this
    // supervisor, even though the account exists
    let (status, body) = host
        .post(
            "/api/supervisor/attendance",
            json!({ "student_id": outsider.user_id, "date": "2024-07-02", "status": "present" }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert_eq!(
        body["message"],
        "Student not found or not assigned to your organization"
    );

    // Same scoping applies to evaluations
    let (status, body) = host
        .post(
            "/api/supervisor/evaluations",
            json!({
                "student_id": outsider.user_id,
                "evaluation_period": "2024-Q3",
                "overall_rating": 4,
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, body) = host
        .post(
            "/api/supervisor/evaluations",
            json!({
                "student_id": student.user_id,
                "evaluation_period": "2024-Q3",
                "overall_rating": 4,
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let eval_id = body["data"]["id"].as_i64().unwrap();

    // Completing twice trips the pending-only guard
    let (status, body) = host
        .put(&format!("/api/supervisor/evaluations/{eval_id}/complete"), json!({}))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = host
        .put(&format!("/api/supervisor/evaluations/{eval_id}/complete"), json!({}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Can only complete pending evaluations");

    Ok(())
}

#[tokio::test]
async fn login_role_mismatch_is_indistinguishable_from_bad_password() -> Result<()> {
    let server = common::ensure_server().await?;
    if !database_available(&server.base_url).await? {
        eprintln!("skipping: no database attached");
        return Ok(());
    }

    let client = Client::new();
    let email = format!("{}@example.com", unique("mismatch"));
    let password = "s3cret-pass";

    let res = client
        .post(format!("{}/api/auth/create-user", server.base_url))
        .json(&json!({ "role": "student", "name": "Mia", "email": email, "password": password }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    // Wrong password
    let res = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "role": "student", "email": email, "password": "wrong" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = res.json::<Value>().await?["message"].clone();

    // Correct password, wrong role partition
    let res = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "role": "admin", "email": email, "password": password }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let wrong_role = res.json::<Value>().await?["message"].clone();

    assert_eq!(wrong_password, wrong_role);
    assert_eq!(wrong_password, "Invalid credentials");
    Ok(())
}
