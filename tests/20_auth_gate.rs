//! Authorization-gate behavior. The gate rejects requests before any
//! database access, so these assertions hold with or without a reachable
//! database behind the server.

mod common;

use anyhow::Result;
use attachment_api::auth::{generate_jwt, Claims, Role};
use reqwest::StatusCode;

fn token_for(role: Role) -> String {
    let claims = Claims::new(1, format!("{}@example.com", role), role, 1);
    generate_jwt(&claims, common::TEST_JWT_SECRET).expect("mint test token")
}

fn expired_token() -> String {
    let now = chrono_like_now();
    let claims = Claims {
        sub: 1,
        email: "old@example.com".into(),
        role: Role::Student,
        iat: now - 7200,
        exp: now - 3600,
    };
    generate_jwt(&claims, common::TEST_JWT_SECRET).expect("mint expired token")
}

// Integration tests avoid pulling chrono just for a unix timestamp
fn chrono_like_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

async fn message_of(res: reqwest::Response) -> Result<String> {
    let body = res.json::<serde_json::Value>().await?;
    Ok(body["message"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn missing_token_is_401() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/profile/get-profile", server.base_url))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message_of(res).await?, "Access denied. No token provided.");
    Ok(())
}

#[tokio::test]
async fn non_bearer_header_is_401() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/profile/get-profile", server.base_url))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message_of(res).await?, "Access denied. No token provided.");
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_401_invalid() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/profile/get-profile", server.base_url))
        .bearer_auth("not.a.jwt")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message_of(res).await?, "Invalid token");
    Ok(())
}

#[tokio::test]
async fn wrong_signature_is_401_invalid() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let claims = Claims::new(1, "mallory@example.com".into(), Role::Admin, 1);
    let forged = generate_jwt(&claims, "some-other-secret").unwrap();

    let res = client
        .get(format!("{}/api/admin/stats", server.base_url))
        .bearer_auth(forged)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message_of(res).await?, "Invalid token");
    Ok(())
}

#[tokio::test]
async fn expired_token_is_401_expired() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/reports/get-student-reports", server.base_url))
        .bearer_auth(expired_token())
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message_of(res).await?, "Token expired");
    Ok(())
}

#[tokio::test]
async fn student_cannot_reach_admin_routes() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in [
        "/api/admin/stats",
        "/api/reports/get-all-reports",
        "/api/students/get-all-students",
        "/api/users",
    ] {
        let res = client
            .get(format!("{}{}", server.base_url, path))
            .bearer_auth(token_for(Role::Student))
            .send()
            .await?;

        assert_eq!(res.status(), StatusCode::FORBIDDEN, "path {}", path);
        assert_eq!(
            message_of(res).await?,
            "Access denied. Insufficient permissions."
        );
    }
    Ok(())
}

#[tokio::test]
async fn host_supervisor_workspace_excludes_other_roles() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // Reviewer roles do not imply host-supervisor workspace access
    for role in [Role::Student, Role::SchoolSupervisor, Role::Admin] {
        let res = client
            .get(format!("{}/api/supervisor/students", server.base_url))
            .bearer_auth(token_for(role))
            .send()
            .await?;

        assert_eq!(res.status(), StatusCode::FORBIDDEN, "role {}", role);
    }
    Ok(())
}

#[tokio::test]
async fn review_routes_accept_every_reviewer_role() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // The allow-set is supervisor-or-admin; none of these may be rejected by
    // the gate. (Without a database the request then fails with 500 inside
    // the handler, which is fine: 403 is what must not happen.)
    for role in [Role::SchoolSupervisor, Role::HostSupervisor, Role::Admin] {
        let res = client
            .get(format!(
                "{}/api/applications/get-pending-applications",
                server.base_url
            ))
            .bearer_auth(token_for(role))
            .send()
            .await?;

        assert_ne!(res.status(), StatusCode::FORBIDDEN, "role {}", role);
        assert_ne!(res.status(), StatusCode::UNAUTHORIZED, "role {}", role);
    }
    Ok(())
}

#[tokio::test]
async fn login_requires_all_fields() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&serde_json::json!({ "email": "a@example.com" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        message_of(res).await?,
        "Please provide email, password, and role"
    );
    Ok(())
}

#[tokio::test]
async fn registration_requires_all_fields() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/create-user", server.base_url))
        .json(&serde_json::json!({ "role": "student", "name": "No Email" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message_of(res).await?, "Please provide all required fields");
    Ok(())
}
