use serde::{Deserialize, Serialize};

use pitboss_core::{RequestMeta, ResponseMeta};

use crate::model::AuditEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAuditEventsRequest {
    pub meta: RequestMeta,
    pub partition_day: Option<String>,
    pub page_size: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAuditEventsResponse {
    pub meta: ResponseMeta,
    pub events: Vec<AuditEvent>,
    pub next_offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyAuditChainRequest {
    pub meta: RequestMeta,
    pub partition_day: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyAuditChainResponse {
    pub meta: ResponseMeta,
    pub valid: bool,
    pub events_checked: u64,
    pub mismatched_audit_id: Option<String>,
}
