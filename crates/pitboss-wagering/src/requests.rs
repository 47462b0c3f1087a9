use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitboss_core::{Money, RequestMeta, ResponseMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceWagerRequest {
    pub meta: RequestMeta,
    pub player_id: String,
    pub game_id: String,
    pub stake: Money,
}

impl PlaceWagerRequest {
    pub(crate) fn fingerprint_payload(&self) -> Value {
        serde_json::json!({
            "player_id": self.player_id,
            "game_id": self.game_id,
            "stake_amount_minor": self.stake.amount_minor,
            "stake_currency": self.stake.currency.0,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleWagerRequest {
    pub meta: RequestMeta,
    pub wager_id: String,
    pub payout: Money,
    pub outcome_ref: String,
}

impl SettleWagerRequest {
    pub(crate) fn fingerprint_payload(&self) -> Value {
        serde_json::json!({
            "wager_id": self.wager_id,
            "payout_amount_minor": self.payout.amount_minor,
            "payout_currency": self.payout.currency.0,
            "outcome_ref": self.outcome_ref,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelWagerRequest {
    pub meta: RequestMeta,
    pub wager_id: String,
    pub cancel_reason: String,
}

impl CancelWagerRequest {
    pub(crate) fn fingerprint_payload(&self) -> Value {
        serde_json::json!({
            "wager_id": self.wager_id,
            "cancel_reason": self.cancel_reason,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WagerResponse {
    pub meta: ResponseMeta,
    pub wager_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetWagerRequest {
    pub meta: RequestMeta,
    pub wager_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListWagersRequest {
    pub meta: RequestMeta,
    pub player_id: String,
    pub page_size: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListWagersResponse {
    pub meta: ResponseMeta,
    pub wagers: Vec<crate::model::Wager>,
    pub next_offset: i64,
}
