use bcrypt::DEFAULT_COST;

pub fn hash_password(password: &str) -> Result<String, anyhow::Error> {
    bcrypt::hash(password, DEFAULT_COST)
        .map_err(|e| anyhow::anyhow!("Password hashing error: {:?}", e))
}

/// A hash that fails to parse counts as a mismatch, not an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, anyhow::Error> {
    Ok(bcrypt::verify(password, hash).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_and_rejects() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        assert!(!verify_password("s3cret", "not-a-bcrypt-hash").unwrap());
    }
}
