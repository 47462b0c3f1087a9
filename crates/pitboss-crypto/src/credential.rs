use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to hash credential: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// Salted hash of a plaintext credential. The plaintext itself is never
/// logged or returned — callers must drop it immediately after this call.
pub fn hash_credential(plaintext: &str) -> Result<String, CredentialError> {
    Ok(bcrypt::hash(plaintext, BCRYPT_COST)?)
}

/// Verifies a plaintext credential against a stored salted hash. Returns
/// `false` (not an error) on a malformed stored hash — callers treat that
/// the same as a verification failure.
pub fn verify_credential(plaintext: &str, stored_hash: &str) -> bool {
    bcrypt::verify(plaintext, stored_hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_hash_and_verify() {
        let hash = hash_credential("correct horse battery staple").unwrap();
        assert!(verify_credential("correct horse battery staple", &hash));
        assert!(!verify_credential("wrong password", &hash));
    }
}
