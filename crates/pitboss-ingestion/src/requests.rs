use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitboss_core::{RequestMeta, ResponseMeta};

use crate::model::{MeterKind, MeterRecord, SignificantEvent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSignificantEventRequest {
    pub meta: RequestMeta,
    pub event_id: String,
    pub equipment_id: String,
    pub source_id: Option<String>,
    pub payload: Value,
    pub occurred_at: pitboss_core::types::Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitEventResponse {
    pub meta: ResponseMeta,
    pub event_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitMeterRequest {
    pub meta: RequestMeta,
    pub meter_id: String,
    pub equipment_id: String,
    pub source_id: Option<String>,
    pub kind: MeterKind,
    pub value: i64,
    pub occurred_at: pitboss_core::types::Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitMeterResponse {
    pub meta: ResponseMeta,
    pub meter_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEventsRequest {
    pub meta: RequestMeta,
    pub equipment_id: Option<String>,
    pub page_size: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEventsResponse {
    pub meta: ResponseMeta,
    pub events: Vec<SignificantEvent>,
    pub next_offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMetersRequest {
    pub meta: RequestMeta,
    pub equipment_id: Option<String>,
    pub page_size: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMetersResponse {
    pub meta: ResponseMeta,
    pub meters: Vec<MeterRecord>,
    pub next_offset: i64,
}
