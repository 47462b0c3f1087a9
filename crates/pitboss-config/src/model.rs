use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitboss_core::types::Timestamp;

/// Three-step workflow state (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigChangeStatus {
    Pending,
    Approved,
    Applied,
}

impl ConfigChangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigChangeStatus::Pending => "pending",
            ConfigChangeStatus::Approved => "approved",
            ConfigChangeStatus::Applied => "applied",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "approved" => ConfigChangeStatus::Approved,
            "applied" => ConfigChangeStatus::Applied,
            _ => ConfigChangeStatus::Pending,
        }
    }
}

/// A proposed configuration change, backing `config_changes` (§3, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConfigChange {
    pub change_id: String,
    pub namespace: String,
    pub key: String,
    pub proposed_value: Value,
    pub reason: Option<String>,
    pub status: String,
    pub proposed_by: String,
    pub approved_by: Option<String>,
    pub applied_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl ConfigChange {
    pub fn status(&self) -> ConfigChangeStatus {
        ConfigChangeStatus::from_str(&self.status)
    }
}
