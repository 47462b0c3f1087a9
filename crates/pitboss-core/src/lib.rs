//! pitboss-core
//!
//! Shared types, error taxonomy, tunable constants, and the injectable clock
//! used by every other component crate in the platform.

pub mod clock;
pub mod constants;
pub mod error;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::PlatformError;
pub use types::{
    Actor, ActorType, AmountMinor, Currency, Money, RequestMeta, ResponseMeta, ResultCode,
    Timestamp,
};
