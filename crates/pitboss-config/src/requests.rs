use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitboss_core::{RequestMeta, ResponseMeta};

use crate::model::ConfigChange;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeConfigChangeRequest {
    pub meta: RequestMeta,
    pub namespace: String,
    pub key: String,
    pub proposed_value: Value,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigChangeResponse {
    pub meta: ResponseMeta,
    pub change_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveConfigChangeRequest {
    pub meta: RequestMeta,
    pub change_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyConfigChangeRequest {
    pub meta: RequestMeta,
    pub change_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfigHistoryRequest {
    pub meta: RequestMeta,
    pub namespace: Option<String>,
    pub page_size: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfigHistoryResponse {
    pub meta: ResponseMeta,
    pub changes: Vec<ConfigChange>,
    pub next_offset: i64,
}
