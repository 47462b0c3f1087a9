//! pitboss-audit
//!
//! The tamper-evident, hash-chained audit journal (§4.4). Every externally
//! observable state change in the platform is appended here before (or, for
//! best-effort ERROR paths, alongside) its business mutation is considered
//! final.

pub mod model;
pub mod query;
pub mod requests;
pub mod store;

pub use model::{is_valid_partition_day, partition_day_of, AuditEvent, AuditEventInput, AuditResult, VerifyOutcome};
pub use query::{list_audit_events, verify_audit_chain};
pub use requests::{ListAuditEventsRequest, ListAuditEventsResponse, VerifyAuditChainRequest, VerifyAuditChainResponse};
pub use store::AuditStore;
