use serde::{Deserialize, Serialize};

use pitboss_core::{RequestMeta, ResponseMeta};
use pitboss_wagering::model::Wager;

/// `GetBalance` takes an account id directly rather than a mutation
/// envelope (§6) — this wraps it in the usual `RequestMeta`-carrying shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBalanceRequest {
    pub meta: RequestMeta,
    pub account_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetWagerResponse {
    pub meta: ResponseMeta,
    pub wager: Option<Wager>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSystemStatusRequest {
    pub meta: RequestMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSystemStatusResponse {
    pub meta: ResponseMeta,
    pub server_time: pitboss_core::types::Timestamp,
    pub persistence_connected: bool,
    pub ingestion_enabled: bool,
    pub component_versions: std::collections::BTreeMap<String, String>,
}
