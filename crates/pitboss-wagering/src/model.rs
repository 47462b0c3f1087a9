use serde::{Deserialize, Serialize};

use pitboss_core::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WagerStatus {
    Pending,
    Settled,
    Canceled,
}

impl WagerStatus {
    pub fn as_wire(self) -> &'static str {
        match self {
            WagerStatus::Pending => "PENDING",
            WagerStatus::Settled => "SETTLED",
            WagerStatus::Canceled => "CANCELED",
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s {
            "SETTLED" => WagerStatus::Settled,
            "CANCELED" => WagerStatus::Canceled,
            _ => WagerStatus::Pending,
        }
    }
}

/// A wager's lifecycle row (§3): PENDING on place, terminal (immutable) on
/// settle or cancel.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Wager {
    pub wager_id: String,
    pub player_id: String,
    pub game_id: String,
    pub stake_amount_minor: i64,
    pub stake_currency: String,
    pub status: String,
    pub payout_amount_minor: Option<i64>,
    pub payout_currency: Option<String>,
    pub outcome_ref: Option<String>,
    pub placed_at: Timestamp,
    pub settled_at: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
    pub cancel_reason: Option<String>,
}

impl Wager {
    pub fn status(&self) -> WagerStatus {
        WagerStatus::from_wire(&self.status)
    }
}
