use std::collections::HashMap;

use sqlx::PgPool;
use tokio::sync::Mutex;

use pitboss_core::PlatformError;

use crate::model::{IdentityCredential, IdentityLockout, IdentitySession};

/// Backs `identity_credentials`, falling back to an in-process map when no
/// pool is configured (development / unit tests).
pub struct CredentialStore {
    pool: Option<PgPool>,
    fallback: Mutex<HashMap<(String, String), IdentityCredential>>,
}

impl CredentialStore {
    pub fn new(pool: Option<PgPool>) -> Self {
        Self { pool, fallback: Mutex::new(HashMap::new()) }
    }

    pub async fn get(&self, actor_id: &str, actor_type: &str) -> Result<Option<IdentityCredential>, PlatformError> {
        if let Some(pool) = &self.pool {
            let row: Option<IdentityCredential> = sqlx::query_as(
                "SELECT actor_id, actor_type, credential_hash, status, updated_at
                 FROM identity_credentials WHERE actor_id = $1 AND actor_type = $2",
            )
            .bind(actor_id)
            .bind(actor_type)
            .fetch_optional(pool)
            .await?;
            Ok(row)
        } else {
            Ok(self.fallback.lock().await.get(&(actor_id.to_string(), actor_type.to_string())).cloned())
        }
    }

    pub async fn put(&self, cred: &IdentityCredential) -> Result<(), PlatformError> {
        if let Some(pool) = &self.pool {
            sqlx::query(
                "INSERT INTO identity_credentials (actor_id, actor_type, credential_hash, status, updated_at)
                 VALUES ($1,$2,$3,$4,$5)
                 ON CONFLICT (actor_id, actor_type) DO UPDATE
                   SET credential_hash = EXCLUDED.credential_hash, status = EXCLUDED.status, updated_at = EXCLUDED.updated_at",
            )
            .bind(&cred.actor_id)
            .bind(&cred.actor_type)
            .bind(&cred.credential_hash)
            .bind(&cred.status)
            .bind(cred.updated_at)
            .execute(pool)
            .await?;
        } else {
            self.fallback
                .lock()
                .await
                .insert((cred.actor_id.clone(), cred.actor_type.clone()), cred.clone());
        }
        Ok(())
    }
}

/// Backs `identity_lockouts`.
pub struct LockoutStore {
    pool: Option<PgPool>,
    fallback: Mutex<HashMap<(String, String), IdentityLockout>>,
}

impl LockoutStore {
    pub fn new(pool: Option<PgPool>) -> Self {
        Self { pool, fallback: Mutex::new(HashMap::new()) }
    }

    pub async fn get(&self, actor_id: &str, actor_type: &str) -> Result<IdentityLockout, PlatformError> {
        if let Some(pool) = &self.pool {
            let row: Option<IdentityLockout> = sqlx::query_as(
                "SELECT actor_id, actor_type, failed_attempts, locked_until
                 FROM identity_lockouts WHERE actor_id = $1 AND actor_type = $2",
            )
            .bind(actor_id)
            .bind(actor_type)
            .fetch_optional(pool)
            .await?;
            Ok(row.unwrap_or_else(|| IdentityLockout::fresh(actor_id, actor_type)))
        } else {
            Ok(self
                .fallback
                .lock()
                .await
                .get(&(actor_id.to_string(), actor_type.to_string()))
                .cloned()
                .unwrap_or_else(|| IdentityLockout::fresh(actor_id, actor_type)))
        }
    }

    pub async fn put(&self, lockout: &IdentityLockout) -> Result<(), PlatformError> {
        if let Some(pool) = &self.pool {
            sqlx::query(
                "INSERT INTO identity_lockouts (actor_id, actor_type, failed_attempts, locked_until)
                 VALUES ($1,$2,$3,$4)
                 ON CONFLICT (actor_id, actor_type) DO UPDATE
                   SET failed_attempts = EXCLUDED.failed_attempts, locked_until = EXCLUDED.locked_until",
            )
            .bind(&lockout.actor_id)
            .bind(&lockout.actor_type)
            .bind(lockout.failed_attempts)
            .bind(lockout.locked_until)
            .execute(pool)
            .await?;
        } else {
            self.fallback
                .lock()
                .await
                .insert((lockout.actor_id.clone(), lockout.actor_type.clone()), lockout.clone());
        }
        Ok(())
    }
}

/// Backs `identity_sessions` (refresh-token handles). Rotation (§4.5) revokes
/// the old handle and inserts the new one within the same call.
pub struct SessionStore {
    pool: Option<PgPool>,
    fallback: Mutex<HashMap<String, IdentitySession>>,
}

impl SessionStore {
    pub fn new(pool: Option<PgPool>) -> Self {
        Self { pool, fallback: Mutex::new(HashMap::new()) }
    }

    pub async fn get(&self, refresh_token: &str) -> Result<Option<IdentitySession>, PlatformError> {
        if let Some(pool) = &self.pool {
            let row: Option<IdentitySession> = sqlx::query_as(
                "SELECT refresh_token, actor_id, actor_type, expires_at, revoked
                 FROM identity_sessions WHERE refresh_token = $1",
            )
            .bind(refresh_token)
            .fetch_optional(pool)
            .await?;
            Ok(row)
        } else {
            Ok(self.fallback.lock().await.get(refresh_token).cloned())
        }
    }

    async fn insert(&self, session: &IdentitySession) -> Result<(), PlatformError> {
        if let Some(pool) = &self.pool {
            sqlx::query(
                "INSERT INTO identity_sessions (refresh_token, actor_id, actor_type, expires_at, revoked)
                 VALUES ($1,$2,$3,$4,$5)
                 ON CONFLICT (refresh_token) DO NOTHING",
            )
            .bind(&session.refresh_token)
            .bind(&session.actor_id)
            .bind(&session.actor_type)
            .bind(session.expires_at)
            .bind(session.revoked)
            .execute(pool)
            .await?;
        } else {
            self.fallback.lock().await.insert(session.refresh_token.clone(), session.clone());
        }
        Ok(())
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), PlatformError> {
        if let Some(pool) = &self.pool {
            sqlx::query("UPDATE identity_sessions SET revoked = true WHERE refresh_token = $1")
                .bind(refresh_token)
                .execute(pool)
                .await?;
        } else {
            if let Some(s) = self.fallback.lock().await.get_mut(refresh_token) {
                s.revoked = true;
            }
        }
        Ok(())
    }

    /// Atomic rotation: revoke `old_token` and insert `new_session` in one
    /// database transaction when a pool is configured (§4.5).
    pub async fn rotate(&self, old_token: &str, new_session: &IdentitySession) -> Result<(), PlatformError> {
        if let Some(pool) = &self.pool {
            let mut tx = pool.begin().await?;
            sqlx::query("UPDATE identity_sessions SET revoked = true WHERE refresh_token = $1")
                .bind(old_token)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO identity_sessions (refresh_token, actor_id, actor_type, expires_at, revoked)
                 VALUES ($1,$2,$3,$4,$5)",
            )
            .bind(&new_session.refresh_token)
            .bind(&new_session.actor_id)
            .bind(&new_session.actor_type)
            .bind(new_session.expires_at)
            .bind(new_session.revoked)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(())
        } else {
            self.revoke(old_token).await?;
            self.insert(new_session).await
        }
    }

    pub async fn insert_new(&self, session: &IdentitySession) -> Result<(), PlatformError> {
        self.insert(session).await
    }

    pub async fn revoke_token(&self, refresh_token: &str) -> Result<(), PlatformError> {
        self.revoke(refresh_token).await
    }
}

/// Deletes expired refresh-token rows in bounded batches; run from a ticker
/// (§4.5, §5).
pub async fn sweep_expired_sessions(pool: &PgPool, batch_size: i64) -> Result<u64, PlatformError> {
    let result = sqlx::query(
        "DELETE FROM identity_sessions WHERE ctid IN (
             SELECT ctid FROM identity_sessions WHERE expires_at <= now() LIMIT $1
         )",
    )
    .bind(batch_size)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
