use serde::{Deserialize, Serialize};

use pitboss_core::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
    Active,
    Revoked,
}

impl CredentialStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialStatus::Active => "active",
            CredentialStatus::Revoked => "revoked",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "revoked" => CredentialStatus::Revoked,
            _ => CredentialStatus::Active,
        }
    }
}

/// Salted hash of a credential, keyed by (actor_id, actor_type). The
/// plaintext is never stored, logged, or returned (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IdentityCredential {
    pub actor_id: String,
    pub actor_type: String,
    pub credential_hash: String,
    pub status: String,
    pub updated_at: Timestamp,
}

impl IdentityCredential {
    pub fn status(&self) -> CredentialStatus {
        CredentialStatus::from_str(&self.status)
    }
}

/// Failure counter and optional lockout expiry for an (actor_id, actor_type).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IdentityLockout {
    pub actor_id: String,
    pub actor_type: String,
    pub failed_attempts: i32,
    pub locked_until: Option<Timestamp>,
}

impl IdentityLockout {
    pub fn fresh(actor_id: &str, actor_type: &str) -> Self {
        Self { actor_id: actor_id.to_string(), actor_type: actor_type.to_string(), failed_attempts: 0, locked_until: None }
    }

    pub fn is_locked(&self, now: Timestamp) -> bool {
        self.locked_until.map(|until| until > now).unwrap_or(false)
    }
}

/// Server-side-stored opaque refresh-token handle (§3's `IdentitySession`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IdentitySession {
    pub refresh_token: String,
    pub actor_id: String,
    pub actor_type: String,
    pub expires_at: Timestamp,
    pub revoked: bool,
}
