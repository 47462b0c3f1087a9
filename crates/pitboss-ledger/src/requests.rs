use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitboss_core::{Actor, Money, RequestMeta, ResponseMeta};

use crate::model::{LedgerTransaction, TransferStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRequest {
    pub meta: RequestMeta,
    pub account_id: String,
    pub amount: Money,
    pub authorization_id: Option<String>,
    pub description: Option<String>,
}

impl MutationRequest {
    pub(crate) fn fingerprint_payload(&self) -> Value {
        serde_json::json!({
            "account_id": self.account_id,
            "amount_minor": self.amount.amount_minor,
            "currency": self.amount.currency.0,
            "authorization_id": self.authorization_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferToDeviceRequest {
    pub meta: RequestMeta,
    pub account_id: String,
    pub device_id: String,
    pub amount: Money,
    pub authorization_id: Option<String>,
}

impl TransferToDeviceRequest {
    pub(crate) fn fingerprint_payload(&self) -> Value {
        serde_json::json!({
            "account_id": self.account_id,
            "device_id": self.device_id,
            "amount_minor": self.amount.amount_minor,
            "currency": self.amount.currency.0,
            "authorization_id": self.authorization_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    pub meta: ResponseMeta,
    pub tx_id: String,
    pub available_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
    pub meta: ResponseMeta,
    pub tx_id: String,
    pub transfer_id: String,
    pub transfer_status: String,
    pub transferred_minor: i64,
    pub available_minor: i64,
    pub unresolved_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub meta: ResponseMeta,
    pub available_minor: i64,
    pub pending_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTransactionsRequest {
    pub meta: RequestMeta,
    pub account_id: String,
    pub page_size: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTransactionsResponse {
    pub meta: ResponseMeta,
    pub transactions: Vec<LedgerTransaction>,
    pub next_offset: i64,
}

pub(crate) fn requesting_actor(meta: &RequestMeta) -> Option<&Actor> {
    meta.actor.as_ref()
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn transfer_status_response(
    meta: ResponseMeta,
    tx_id: String,
    transfer_id: String,
    status: TransferStatus,
    transferred_minor: i64,
    available_minor: i64,
    unresolved_reason: Option<String>,
) -> TransferResponse {
    TransferResponse {
        meta,
        tx_id,
        transfer_id,
        transfer_status: status.as_wire().to_string(),
        transferred_minor,
        available_minor,
        unresolved_reason,
    }
}
