use thiserror::Error;

use crate::types::ResultCode;

/// The platform-wide error type. Every component returns `Result<T, PlatformError>`;
/// the RPC layer maps each variant onto one of the four `ResultCode`s — never onto
/// a transport-level error for a business outcome.
#[derive(Debug, Error)]
pub enum PlatformError {
    // ── Validation (-> INVALID) ──────────────────────────────────────────────
    #[error("{0}")]
    Invalid(String),

    // ── Authorization / state-machine conflicts (-> DENIED) ──────────────────
    #[error("{0}")]
    Denied(String),

    // ── Internal, non-client-attributable (-> ERROR) ─────────────────────────
    #[error("audit unavailable")]
    AuditUnavailable,

    #[error("persistence unavailable")]
    PersistenceUnavailable,

    #[error("unbalanced postings")]
    UnbalancedPostings,

    #[error("idempotency request hash mismatch")]
    IdempotencyHashMismatch,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl PlatformError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PlatformError::Invalid(msg.into())
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        PlatformError::Denied(msg.into())
    }

    /// Maps this error onto the closed outward result-code taxonomy of §7.
    pub fn result_code(&self) -> ResultCode {
        match self {
            PlatformError::Invalid(_) => ResultCode::Invalid,
            PlatformError::Denied(_) => ResultCode::Denied,
            PlatformError::AuditUnavailable
            | PlatformError::PersistenceUnavailable
            | PlatformError::UnbalancedPostings
            | PlatformError::IdempotencyHashMismatch
            | PlatformError::Database(_)
            | PlatformError::Internal(_) => ResultCode::Error,
        }
    }

    /// Human-readable reason surfaced as `denial_reason` / error detail.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_maps_to_invalid_code() {
        assert_eq!(PlatformError::invalid("bad currency").result_code(), ResultCode::Invalid);
    }

    #[test]
    fn denied_maps_to_denied_code() {
        assert_eq!(PlatformError::denied("insufficient balance").result_code(), ResultCode::Denied);
    }

    #[test]
    fn internal_conditions_map_to_error_code() {
        assert_eq!(PlatformError::AuditUnavailable.result_code(), ResultCode::Error);
        assert_eq!(PlatformError::PersistenceUnavailable.result_code(), ResultCode::Error);
        assert_eq!(PlatformError::UnbalancedPostings.result_code(), ResultCode::Error);
        assert_eq!(PlatformError::IdempotencyHashMismatch.result_code(), ResultCode::Error);
    }
}
