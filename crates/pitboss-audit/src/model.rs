use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitboss_core::types::{ActorType, Timestamp};

/// Result of the audited action itself — distinct from the RPC `ResultCode`:
/// an ERROR-coded RPC response may still record `result = error` or, per
/// §7's "best effort" carve-out, may not have a row at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditResult {
    Success,
    Denied,
    Error,
}

impl AuditResult {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditResult::Success => "success",
            AuditResult::Denied => "denied",
            AuditResult::Error => "error",
        }
    }
}

/// One row of the hash-chained append-only journal (§3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEvent {
    pub audit_id: String,
    pub partition_day: String,
    pub occurred_at: Timestamp,
    pub recorded_at: Timestamp,
    pub actor_id: String,
    pub actor_type: String,
    pub auth_context: Option<String>,
    pub object_type: String,
    pub object_id: String,
    pub action: String,
    #[sqlx(rename = "before_json")]
    pub before: Value,
    #[sqlx(rename = "after_json")]
    pub after: Value,
    pub result: String,
    pub reason: Option<String>,
    pub hash_prev: String,
    pub hash_curr: String,
}

/// Everything the caller supplies when requesting an append; the store fills
/// in `audit_id`, `recorded_at`, `hash_prev`/`hash_curr`, and `partition_day`
/// (derived from `occurred_at`) itself.
#[derive(Debug, Clone)]
pub struct AuditEventInput {
    pub occurred_at: Timestamp,
    pub actor_id: String,
    pub actor_type: ActorType,
    pub auth_context: Option<String>,
    pub object_type: String,
    pub object_id: String,
    pub action: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub result: AuditResult,
    pub reason: Option<String>,
}

pub fn partition_day_of(ts: Timestamp) -> String {
    ts.format("%Y-%m-%d").to_string()
}

pub fn is_valid_partition_day(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub valid: bool,
    pub events_checked: u64,
    pub mismatched_audit_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_day_formats_as_iso_date() {
        use chrono::TimeZone;
        let ts = chrono::Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(partition_day_of(ts), "2026-03-05");
    }

    #[test]
    fn validates_partition_day_format() {
        assert!(is_valid_partition_day("2026-03-05"));
        assert!(!is_valid_partition_day("03/05/2026"));
        assert!(!is_valid_partition_day("not-a-date"));
    }
}
