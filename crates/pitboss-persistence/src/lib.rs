//! pitboss-persistence
//!
//! The shared relational handle. Every component crate (ledger, wagering,
//! audit, identity, ...) is handed a `sqlx::PgPool` clone and owns its own
//! queries against its own tables — this crate only owns connecting,
//! migrating, and the connectivity probe. It holds no cached state of its
//! own, per §3's ownership rule ("the persistence adapter holds no cached
//! state").

pub mod pool;

pub use pool::{connect, is_connected, migrate};
pub use sqlx::PgPool;
