use std::collections::HashMap;

use sqlx::PgPool;
use tokio::sync::Mutex;

use pitboss_core::PlatformError;
use pitboss_envelope::{IdempotencyRecord, IdempotencyStore};

/// Backs the `wagering_idempotency_keys` table when persistence is
/// configured, falling back to an in-process map otherwise.
pub struct WageringIdempotencyStore {
    pool: Option<PgPool>,
    fallback: Mutex<HashMap<(String, String), IdempotencyRecord>>,
}

impl WageringIdempotencyStore {
    pub fn new(pool: Option<PgPool>) -> Self {
        Self { pool, fallback: Mutex::new(HashMap::new()) }
    }
}

#[async_trait::async_trait]
impl IdempotencyStore for WageringIdempotencyStore {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<IdempotencyRecord>, PlatformError> {
        if let Some(pool) = &self.pool {
            let row: Option<(String, serde_json::Value, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
                r#"SELECT request_hash, response_payload, result_code, expires_at
                   FROM wagering_idempotency_keys WHERE scope = $1 AND key = $2 AND expires_at > now()"#,
            )
            .bind(scope)
            .bind(key)
            .fetch_optional(pool)
            .await?;
            Ok(row.map(|(request_hash, response_payload, result_code, expires_at)| IdempotencyRecord {
                scope: scope.to_string(),
                key: key.to_string(),
                request_hash,
                response_payload,
                result_code,
                expires_at,
            }))
        } else {
            Ok(self.fallback.lock().await.get(&(scope.to_string(), key.to_string())).cloned())
        }
    }

    async fn put(&self, record: &IdempotencyRecord) -> Result<(), PlatformError> {
        if let Some(pool) = &self.pool {
            sqlx::query(
                r#"INSERT INTO wagering_idempotency_keys (scope, key, request_hash, response_payload, result_code, expires_at)
                   VALUES ($1,$2,$3,$4,$5,$6)
                   ON CONFLICT (scope, key) DO NOTHING"#,
            )
            .bind(&record.scope)
            .bind(&record.key)
            .bind(&record.request_hash)
            .bind(&record.response_payload)
            .bind(&record.result_code)
            .bind(record.expires_at)
            .execute(pool)
            .await?;
            Ok(())
        } else {
            self.fallback
                .lock()
                .await
                .insert((record.scope.clone(), record.key.clone()), record.clone());
            Ok(())
        }
    }
}

/// Deletes expired rows in bounded batches; run from a ticker (§4.1, §5).
pub async fn sweep_expired(pool: &PgPool, batch_size: i64) -> Result<u64, PlatformError> {
    let result = sqlx::query(
        r#"DELETE FROM wagering_idempotency_keys WHERE ctid IN (
             SELECT ctid FROM wagering_idempotency_keys WHERE expires_at <= now() LIMIT $1
           )"#,
    )
    .bind(batch_size)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
