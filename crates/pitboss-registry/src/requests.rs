use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitboss_core::RequestMeta;

use crate::model::{Equipment, EquipmentStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertEquipmentRequest {
    pub meta: RequestMeta,
    pub equipment_id: String,
    pub location: String,
    pub status: EquipmentStatus,
    pub theoretical_rtp_bps: Option<i32>,
    pub attributes: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertEquipmentResponse {
    pub meta: pitboss_core::ResponseMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetEquipmentRequest {
    pub meta: RequestMeta,
    pub equipment_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetEquipmentResponse {
    pub meta: pitboss_core::ResponseMeta,
    pub equipment: Option<Equipment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEquipmentRequest {
    pub meta: RequestMeta,
    pub status_filter: Option<EquipmentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEquipmentResponse {
    pub meta: pitboss_core::ResponseMeta,
    pub equipment: Vec<Equipment>,
}
