//! pitboss-envelope
//!
//! The request-admission envelope shared by every RPC (§4.1): actor
//! resolution, idempotency scoping, and response-metadata stamping. Every
//! mutating component crate composes these primitives rather than
//! reimplementing them.

pub mod actor;
pub mod idempotency;
pub mod response;

pub use actor::{require_actor_type, resolve_actor};
pub use idempotency::{admit, commit, Admission, IdempotencyRecord, IdempotencyStore};
pub use response::{meta_from_error, meta_ok};
