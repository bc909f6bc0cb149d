use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{decode_jwt, Claims, JwtError, Role};
use crate::config;
use crate::error::ApiError;

/// Authenticated caller context extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Allow-sets for role gates. Routes declare membership explicitly instead of
/// chaining single-role checks, so "supervisor or admin" is one set.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const STUDENT_ONLY: &[Role] = &[Role::Student];
pub const SCHOOL_SUPERVISOR_ONLY: &[Role] = &[Role::SchoolSupervisor];
pub const HOST_SUPERVISOR_ONLY: &[Role] = &[Role::HostSupervisor];
pub const SUPERVISORS: &[Role] = &[Role::SchoolSupervisor, Role::HostSupervisor];
pub const REVIEWERS: &[Role] = &[Role::SchoolSupervisor, Role::HostSupervisor, Role::Admin];

/// JWT authentication middleware: validates the bearer token and injects the
/// caller context for downstream handlers. Runs before any database access.
pub async fn require_auth(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)?;

    let secret = &config::config().security.jwt_secret;
    let claims = decode_jwt(&token, secret).map_err(|e| match e {
        JwtError::Expired => ApiError::unauthorized("Token expired"),
        JwtError::Invalid(reason) => {
            tracing::debug!("Rejected token: {}", reason);
            ApiError::unauthorized("Invalid token")
        }
        JwtError::InvalidSecret | JwtError::TokenGeneration(_) => {
            tracing::error!("JWT verification misconfigured: {}", e);
            ApiError::internal("Authentication failed")
        }
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Role gate: the caller's role must be a member of the allow-set.
pub async fn require_role(
    allowed: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !allowed.contains(&user.role) {
        return Err(ApiError::forbidden(
            "Access denied. Insufficient permissions.",
        ));
    }

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Access denied. No token provided."))?;

    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        _ => Err(ApiError::unauthorized("Access denied. No token provided.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn rejects_missing_header() {
        let headers = HeaderMap::new();
        let err = extract_bearer_token(&headers).unwrap_err();
        assert_eq!(err.message(), "Access denied. No token provided.");
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        let headers = headers_with("Basic dXNlcjpwYXNz");
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn rejects_empty_bearer_token() {
        let headers = headers_with("Bearer   ");
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn reviewer_set_is_supervisor_or_admin() {
        assert!(REVIEWERS.contains(&Role::SchoolSupervisor));
        assert!(REVIEWERS.contains(&Role::HostSupervisor));
        assert!(REVIEWERS.contains(&Role::Admin));
        assert!(!REVIEWERS.contains(&Role::Student));
    }
}
