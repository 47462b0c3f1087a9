use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitboss_core::types::Timestamp;

/// Lifecycle of a report run (§4.9/§11). Aggregation itself is an external
/// collaborator; this crate only manages the run record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportRunStatus {
    Pending,
    Complete,
}

impl ReportRunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportRunStatus::Pending => "pending",
            ReportRunStatus::Complete => "complete",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "complete" => ReportRunStatus::Complete,
            _ => ReportRunStatus::Pending,
        }
    }
}

/// A report run, backing `report_runs` (§6, §11).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportRun {
    pub run_id: String,
    pub kind: String,
    pub params: Value,
    pub status: String,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl ReportRun {
    pub fn status(&self) -> ReportRunStatus {
        ReportRunStatus::from_str(&self.status)
    }
}
