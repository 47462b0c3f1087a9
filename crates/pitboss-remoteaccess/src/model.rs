use serde::{Deserialize, Serialize};

use pitboss_core::types::Timestamp;

/// One admission decision against an administrative path (§3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RemoteAccessActivity {
    pub id: i64,
    pub ts: Timestamp,
    pub source_ip: String,
    pub source_port: Option<i32>,
    pub destination: String,
    pub destination_port: Option<i32>,
    pub path: String,
    pub method: String,
    pub allowed: bool,
    pub reason: Option<String>,
}

/// Everything the guard supplies when recording a decision; the store fills
/// in the serial `id`.
#[derive(Debug, Clone)]
pub struct RemoteAccessActivityInput {
    pub ts: Timestamp,
    pub source_ip: String,
    pub source_port: Option<i32>,
    pub destination: String,
    pub destination_port: Option<i32>,
    pub path: String,
    pub method: String,
    pub allowed: bool,
    pub reason: Option<String>,
}

/// The administrative path prefixes the guard intercepts (§4.6); everything
/// else passes through unexamined.
pub fn is_administrative_path(path: &str) -> bool {
    pitboss_core::constants::ADMIN_PATH_PREFIXES.iter().any(|p| path.starts_with(p))
}
