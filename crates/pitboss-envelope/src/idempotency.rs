use chrono::Duration;
use serde_json::Value;

use pitboss_core::types::Timestamp;
use pitboss_core::PlatformError;
use pitboss_crypto::request_fingerprint;

/// A stored idempotency row: (scope, key) is the uniqueness constraint (§3).
#[derive(Debug, Clone)]
pub struct IdempotencyRecord {
    pub scope: String,
    pub key: String,
    pub request_hash: String,
    pub response_payload: Value,
    pub result_code: String,
    pub expires_at: Timestamp,
}

/// Per-component idempotency table access. Each mutating component (ledger,
/// wagering, ...) implements this against its own table — `ledger_idempotency_keys`
/// vs `wagering_idempotency_keys` — since the spec scopes keys per-component,
/// not globally.
#[async_trait::async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<IdempotencyRecord>, PlatformError>;
    async fn put(&self, record: &IdempotencyRecord) -> Result<(), PlatformError>;
}

/// Outcome of consulting the idempotency table before executing a mutation.
pub enum Admission {
    /// No prior row: proceed and call `store` with the final response.
    Proceed,
    /// A prior row with a matching request hash: return its stored response
    /// verbatim, byte-for-byte, without re-executing the mutation.
    Replay(Value),
}

/// Step 2 of the ledger/wagering mutation algorithm (§4.2): consult the
/// idempotency table for (scope, key). A hit with a matching request hash
/// replays; a hit with a differing hash is an ERROR; a miss proceeds.
pub async fn admit(
    store: &dyn IdempotencyStore,
    scope: &str,
    key: &str,
    request_payload: &Value,
) -> Result<Admission, PlatformError> {
    if key.is_empty() {
        return Err(PlatformError::invalid("idempotency key is required"));
    }
    let fingerprint = request_fingerprint(request_payload);
    match store.get(scope, key).await? {
        None => Ok(Admission::Proceed),
        Some(existing) if existing.request_hash == fingerprint => {
            Ok(Admission::Replay(existing.response_payload))
        }
        Some(_) => Err(PlatformError::IdempotencyHashMismatch),
    }
}

/// Step 9: persist a deep copy of the final response keyed by the
/// idempotency scope, with the default TTL applied from `now`.
pub async fn commit(
    store: &dyn IdempotencyStore,
    scope: &str,
    key: &str,
    request_payload: &Value,
    response_payload: Value,
    result_code: &str,
    now: Timestamp,
    ttl_hours: i64,
) -> Result<(), PlatformError> {
    let record = IdempotencyRecord {
        scope: scope.to_string(),
        key: key.to_string(),
        request_hash: request_fingerprint(request_payload),
        response_payload,
        result_code: result_code.to_string(),
        expires_at: now + Duration::hours(ttl_hours),
    };
    store.put(&record).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;
    use serde_json::json;

    #[derive(Default)]
    struct InMemoryStore(Mutex<HashMap<(String, String), IdempotencyRecord>>);

    #[async_trait::async_trait]
    impl IdempotencyStore for InMemoryStore {
        async fn get(&self, scope: &str, key: &str) -> Result<Option<IdempotencyRecord>, PlatformError> {
            Ok(self.0.lock().unwrap().get(&(scope.to_string(), key.to_string())).cloned())
        }

        async fn put(&self, record: &IdempotencyRecord) -> Result<(), PlatformError> {
            self.0
                .lock()
                .unwrap()
                .insert((record.scope.clone(), record.key.clone()), record.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn first_call_proceeds_then_replays_identical_request() {
        let store = InMemoryStore::default();
        let payload = json!({"account": "acct-1", "amount": 1000});

        assert!(matches!(admit(&store, "acct-1|deposit", "idem-1", &payload).await.unwrap(), Admission::Proceed));

        commit(&store, "acct-1|deposit", "idem-1", &payload, json!({"tx_id": "tx-1"}), "OK", Utc::now(), 24)
            .await
            .unwrap();

        match admit(&store, "acct-1|deposit", "idem-1", &payload).await.unwrap() {
            Admission::Replay(resp) => assert_eq!(resp, json!({"tx_id": "tx-1"})),
            Admission::Proceed => panic!("expected replay"),
        }
    }

    #[tokio::test]
    async fn differing_request_hash_is_an_error() {
        let store = InMemoryStore::default();
        let payload = json!({"account": "acct-1", "amount": 1000});
        commit(&store, "acct-1|deposit", "idem-1", &payload, json!({"tx_id": "tx-1"}), "OK", Utc::now(), 24)
            .await
            .unwrap();

        let different_payload = json!({"account": "acct-1", "amount": 2000});
        let err = admit(&store, "acct-1|deposit", "idem-1", &different_payload).await.unwrap_err();
        assert!(matches!(err, PlatformError::IdempotencyHashMismatch));
    }

    #[tokio::test]
    async fn empty_key_is_invalid() {
        let store = InMemoryStore::default();
        let err = admit(&store, "acct-1|deposit", "", &json!({})).await.unwrap_err();
        assert!(matches!(err, PlatformError::Invalid(_)));
    }
}
