use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitboss_core::types::Timestamp;

/// Slot status shared by both queues (§3's `IngestionBuffer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Queued,
    Acknowledged,
}

impl SlotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotStatus::Queued => "queued",
            SlotStatus::Acknowledged => "acknowledged",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "acknowledged" => SlotStatus::Acknowledged,
            _ => SlotStatus::Queued,
        }
    }
}

/// Device-sourced significant event (§3, §4.8). Backs `significant_events`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SignificantEvent {
    pub event_id: String,
    pub equipment_id: String,
    pub source_id: Option<String>,
    pub payload: Value,
    pub status: String,
    pub occurred_at: Timestamp,
    pub received_at: Timestamp,
    pub recorded_at: Option<Timestamp>,
}

impl SignificantEvent {
    pub fn status(&self) -> SlotStatus {
        SlotStatus::from_str(&self.status)
    }
}

/// Meter kind: a point-in-time reading or a delta since the prior reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeterKind {
    Snapshot,
    Delta,
}

impl MeterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MeterKind::Snapshot => "snapshot",
            MeterKind::Delta => "delta",
        }
    }
}

/// A meter reading, either a snapshot or a delta (§3, §4.8). Backs
/// `meter_records`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MeterRecord {
    pub meter_id: String,
    pub equipment_id: String,
    pub source_id: Option<String>,
    pub kind: String,
    pub value: i64,
    pub status: String,
    pub occurred_at: Timestamp,
    pub received_at: Timestamp,
    pub recorded_at: Option<Timestamp>,
}

impl MeterRecord {
    pub fn status(&self) -> SlotStatus {
        SlotStatus::from_str(&self.status)
    }
}
