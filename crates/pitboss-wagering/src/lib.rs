//! pitboss-wagering
//!
//! The wager state machine layered on ledger semantics (§4.3): idempotent
//! place/settle/cancel with monotonic terminal states.

pub mod idempotency;
pub mod model;
pub mod requests;
pub mod service;

pub use model::{Wager, WagerStatus};
pub use requests::{
    CancelWagerRequest, GetWagerRequest, ListWagersRequest, ListWagersResponse, PlaceWagerRequest,
    SettleWagerRequest, WagerResponse,
};
pub use service::WageringService;
