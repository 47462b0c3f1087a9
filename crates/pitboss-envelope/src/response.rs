use pitboss_core::types::Timestamp;
use pitboss_core::{PlatformError, ResponseMeta, ResultCode};

/// Stamps a `ResponseMeta` from a `PlatformError`, echoing `request_id` and
/// the current UTC time from the injected clock (never sampled globally).
pub fn meta_from_error(request_id: &str, now: Timestamp, err: &PlatformError) -> ResponseMeta {
    ResponseMeta::with_code(request_id, now, err.result_code(), err.reason())
}

/// Stamps a successful `ResponseMeta`.
pub fn meta_ok(request_id: &str, now: Timestamp) -> ResponseMeta {
    ResponseMeta::ok(request_id, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn error_meta_carries_the_mapped_result_code() {
        let now = Utc::now();
        let meta = meta_from_error("req-1", now, &PlatformError::denied("insufficient balance"));
        assert_eq!(meta.result_code, ResultCode::Denied);
        assert_eq!(meta.denial_reason.as_deref(), Some("insufficient balance"));
        assert_eq!(meta.request_id, "req-1");
    }
}
