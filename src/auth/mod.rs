use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub mod password;
pub mod roles;

pub use roles::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(sub: i32, email: String, role: Role, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub,
            email,
            role,
            iat: now.timestamp(),
            exp,
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    InvalidSecret,
    TokenGeneration(String),
    Expired,
    Invalid(String),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::Invalid(msg) => write!(f, "Invalid token: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(JwtError::Expired),
            _ => Err(JwtError::Invalid(e.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip_preserves_claims() {
        let claims = Claims::new(42, "alice@example.com".into(), Role::Student, 4);
        let token = generate_jwt(&claims, SECRET).unwrap();
        let decoded = decode_jwt(&token, SECRET).unwrap();

        assert_eq!(decoded.sub, 42);
        assert_eq!(decoded.email, "alice@example.com");
        assert_eq!(decoded.role, Role::Student);
        assert_eq!(decoded.exp, claims.exp);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let claims = Claims::new(1, "bob@example.com".into(), Role::Admin, 4);
        let token = generate_jwt(&claims, SECRET).unwrap();

        match decode_jwt(&token, "other-secret") {
            Err(JwtError::Invalid(_)) => {}
            other => panic!("expected invalid token, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let now = Utc::now().timestamp();
        // Past the default 60s validation leeway
        let claims = Claims {
            sub: 7,
            email: "carol@example.com".into(),
            role: Role::HostSupervisor,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = generate_jwt(&claims, SECRET).unwrap();

        match decode_jwt(&token, SECRET) {
            Err(JwtError::Expired) => {}
            other => panic!("expected expired token, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let claims = Claims::new(1, "x@example.com".into(), Role::Generic, 4);
        assert!(matches!(
            generate_jwt(&claims, ""),
            Err(JwtError::InvalidSecret)
        ));
    }
}
