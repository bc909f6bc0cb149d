use crate::error::ApiError;

/// Hash a password for storage with the configured bcrypt work factor.
pub fn hash(password: &str, cost: u32) -> Result<String, ApiError> {
    bcrypt::hash(password, cost).map_err(|e| {
        tracing::error!("Password hashing failed: {}", e);
        ApiError::internal("Error processing credentials")
    })
}

/// Verify a password against a stored bcrypt hash.
///
/// A malformed stored hash counts as a mismatch rather than an error, so
/// callers can keep a single generic failure path.
pub fn verify(password: &str, stored_hash: &str) -> bool {
    match bcrypt::verify(password, stored_hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Password hash comparison failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost keeps tests fast
    const COST: u32 = 4;

    #[test]
    fn hash_then_verify_round_trip() {
        let hashed = hash("hunter2-but-longer", COST).unwrap();
        assert!(verify("hunter2-but-longer", &hashed));
        assert!(!verify("wrong-password", &hashed));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash("same-password", COST).unwrap();
        let b = hash("same-password", COST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_stored_hash_is_a_mismatch() {
        assert!(!verify("anything", "not-a-bcrypt-hash"));
    }
}
