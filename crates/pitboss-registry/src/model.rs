use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitboss_core::types::Timestamp;

/// Closed lifecycle status for a piece of gaming equipment (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentStatus {
    Unspecified,
    Active,
    Inactive,
    Maintenance,
    Disabled,
    Retired,
}

impl EquipmentStatus {
    pub fn as_wire(self) -> &'static str {
        match self {
            EquipmentStatus::Unspecified => "EQUIPMENT_STATUS_UNSPECIFIED",
            EquipmentStatus::Active => "EQUIPMENT_STATUS_ACTIVE",
            EquipmentStatus::Inactive => "EQUIPMENT_STATUS_INACTIVE",
            EquipmentStatus::Maintenance => "EQUIPMENT_STATUS_MAINTENANCE",
            EquipmentStatus::Disabled => "EQUIPMENT_STATUS_DISABLED",
            EquipmentStatus::Retired => "EQUIPMENT_STATUS_RETIRED",
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s {
            "EQUIPMENT_STATUS_ACTIVE" => EquipmentStatus::Active,
            "EQUIPMENT_STATUS_INACTIVE" => EquipmentStatus::Inactive,
            "EQUIPMENT_STATUS_MAINTENANCE" => EquipmentStatus::Maintenance,
            "EQUIPMENT_STATUS_DISABLED" => EquipmentStatus::Disabled,
            "EQUIPMENT_STATUS_RETIRED" => EquipmentStatus::Retired,
            _ => EquipmentStatus::Unspecified,
        }
    }
}

/// A registered piece of gaming equipment, keyed by `equipment_id` (§3, §11).
/// Upserts are insert-or-update, not versioned — there is no history of
/// prior attribute values, only the current row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Equipment {
    pub equipment_id: String,
    pub location: String,
    pub status: String,
    pub theoretical_rtp_bps: Option<i32>,
    pub attributes: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Equipment {
    pub fn status(&self) -> EquipmentStatus {
        EquipmentStatus::from_wire(&self.status)
    }
}
