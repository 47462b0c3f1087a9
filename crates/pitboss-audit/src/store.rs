use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::{error, info};

use pitboss_core::types::new_audit_id;
use pitboss_core::PlatformError;
use pitboss_crypto::{canonical_json_string, canonicalize, chain_hash, normalize_snapshot, GENESIS_HASH};

use crate::model::{is_valid_partition_day, partition_day_of, AuditEvent, AuditEventInput, VerifyOutcome};

/// Append-only hash-chained audit journal (§4.4). Guards its in-memory
/// mirror — a grow-only per-day vector, per the "arena+index" design note —
/// behind a single mutex; an optional `PgPool` provides durable persistence
/// and is the source of truth for `hash_prev` resolution (so a cold mirror
/// after a process restart does not break the chain).
pub struct AuditStore {
    pool: Option<PgPool>,
    mirror: Mutex<HashMap<String, Vec<AuditEvent>>>,
    disable_in_memory_cache: bool,
}

impl AuditStore {
    pub fn new(pool: Option<PgPool>, disable_in_memory_cache: bool) -> Self {
        Self { pool, mirror: Mutex::new(HashMap::new()), disable_in_memory_cache }
    }

    /// Canonical representation hashed into the chain: every field except
    /// `hash_prev`/`hash_curr` themselves, lexicographically ordered,
    /// `before`/`after` normalized to `{}` when empty or unparseable.
    fn canonical_payload(
        audit_id: &str,
        partition_day: &str,
        input: &AuditEventInput,
        recorded_at: chrono::DateTime<Utc>,
    ) -> Value {
        let v = serde_json::json!({
            "audit_id": audit_id,
            "partition_day": partition_day,
            "occurred_at": input.occurred_at.to_rfc3339(),
            "recorded_at": recorded_at.to_rfc3339(),
            "actor_id": input.actor_id,
            "actor_type": input.actor_type.as_wire(),
            "auth_context": input.auth_context,
            "object_type": input.object_type,
            "object_id": input.object_id,
            "action": input.action,
            "before": normalize_snapshot(input.before.as_ref()),
            "after": normalize_snapshot(input.after.as_ref()),
            "result": input.result.as_str(),
            "reason": input.reason,
        });
        canonicalize(&v)
    }

    async fn last_hash_curr(&self, partition_day: &str) -> Result<String, PlatformError> {
        if let Some(pool) = &self.pool {
            let row: Option<(String,)> = sqlx::query_as(
                r#"SELECT hash_curr FROM audit_events
                   WHERE partition_day = $1
                   ORDER BY recorded_at DESC, audit_id DESC
                   LIMIT 1
                   FOR UPDATE"#,
            )
            .bind(partition_day)
            .fetch_optional(pool)
            .await?;
            Ok(row.map(|(h,)| h).unwrap_or_else(|| GENESIS_HASH.to_string()))
        } else {
            let mirror = self.mirror.lock().await;
            Ok(mirror
                .get(partition_day)
                .and_then(|v| v.last())
                .map(|e| e.hash_curr.clone())
                .unwrap_or_else(|| GENESIS_HASH.to_string()))
        }
    }

    /// Append algorithm (§4.4): resolve `hash_prev` under the partition's
    /// lock, compute `hash_curr`, insert with `ON CONFLICT DO NOTHING` so
    /// duplicate audit_ids are silently absorbed, then mirror the row.
    /// Failure to persist (when a pool is configured) surfaces
    /// `PlatformError::AuditUnavailable` and leaves the mirror untouched —
    /// callers MUST treat this as "the business mutation did not happen"
    /// (§4.4 fail-closed policy).
    pub async fn append(&self, input: AuditEventInput) -> Result<AuditEvent, PlatformError> {
        let partition_day = partition_day_of(input.occurred_at);
        let recorded_at = Utc::now();
        let audit_id = new_audit_id();

        // Serializes chain growth per partition: the DB FOR UPDATE row lock
        // (when persisted) or this mutex (mirror-only mode) both achieve it.
        let mut mirror = self.mirror.lock().await;

        let hash_prev = self.last_hash_curr(&partition_day).await?;
        let canonical = Self::canonical_payload(&audit_id, &partition_day, &input, recorded_at);
        let hash_curr = chain_hash(&hash_prev, &canonical_json_string(&canonical));

        let event = AuditEvent {
            audit_id: audit_id.clone(),
            partition_day: partition_day.clone(),
            occurred_at: input.occurred_at,
            recorded_at,
            actor_id: input.actor_id.clone(),
            actor_type: input.actor_type.as_wire().to_string(),
            auth_context: input.auth_context.clone(),
            object_type: input.object_type.clone(),
            object_id: input.object_id.clone(),
            action: input.action.clone(),
            before: normalize_snapshot(input.before.as_ref()),
            after: normalize_snapshot(input.after.as_ref()),
            result: input.result.as_str().to_string(),
            reason: input.reason.clone(),
            hash_prev,
            hash_curr,
        };

        if let Some(pool) = &self.pool {
            let inserted = sqlx::query(
                r#"INSERT INTO audit_events
                     (audit_id, partition_day, occurred_at, recorded_at, actor_id, actor_type,
                      auth_context, object_type, object_id, action, before_json, after_json,
                      result, reason, hash_prev, hash_curr)
                   VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
                   ON CONFLICT (partition_day, audit_id) DO NOTHING"#,
            )
            .bind(&event.audit_id)
            .bind(&event.partition_day)
            .bind(event.occurred_at)
            .bind(event.recorded_at)
            .bind(&event.actor_id)
            .bind(&event.actor_type)
            .bind(&event.auth_context)
            .bind(&event.object_type)
            .bind(&event.object_id)
            .bind(&event.action)
            .bind(&event.before)
            .bind(&event.after)
            .bind(&event.result)
            .bind(&event.reason)
            .bind(&event.hash_prev)
            .bind(&event.hash_curr)
            .execute(pool)
            .await;

            if let Err(e) = inserted {
                error!(error = %e, partition_day = %partition_day, "audit append failed");
                return Err(PlatformError::AuditUnavailable);
            }
        }

        if !self.disable_in_memory_cache {
            mirror.entry(partition_day.clone()).or_default().push(event.clone());
        }

        info!(audit_id = %event.audit_id, action = %event.action, result = %event.result, "audit event appended");
        Ok(event)
    }

    /// Reverse-chronological page within a partition, ties broken by
    /// `audit_id`. `page_size <= 0` or > the max is clamped; a malformed
    /// `partition_day` is INVALID.
    pub async fn list_events(
        &self,
        partition_day: Option<&str>,
        page_size: i64,
        offset: i64,
    ) -> Result<Vec<AuditEvent>, PlatformError> {
        if let Some(day) = partition_day {
            if !is_valid_partition_day(day) {
                return Err(PlatformError::invalid("malformed partition_day"));
            }
        }
        let clamped = page_size.clamp(1, pitboss_core::constants::MAX_LIST_PAGE_SIZE);

        if self.disable_in_memory_cache || self.pool.is_none() {
            let Some(pool) = &self.pool else {
                return Err(PlatformError::PersistenceUnavailable);
            };
            let rows: Vec<AuditEvent> = match partition_day {
                Some(day) => {
                    sqlx::query_as::<_, AuditEvent>(
                        r#"SELECT audit_id, partition_day, occurred_at, recorded_at, actor_id, actor_type,
                                  auth_context, object_type, object_id, action, before_json, after_json,
                                  result, reason, hash_prev, hash_curr
                           FROM audit_events WHERE partition_day = $1
                           ORDER BY recorded_at DESC, audit_id DESC
                           LIMIT $2 OFFSET $3"#,
                    )
                    .bind(day)
                    .bind(clamped)
                    .bind(offset)
                    .fetch_all(pool)
                    .await?
                }
                None => {
                    sqlx::query_as::<_, AuditEvent>(
                        r#"SELECT audit_id, partition_day, occurred_at, recorded_at, actor_id, actor_type,
                                  auth_context, object_type, object_id, action, before_json, after_json,
                                  result, reason, hash_prev, hash_curr
                           FROM audit_events
                           ORDER BY partition_day DESC, recorded_at DESC, audit_id DESC
                           LIMIT $1 OFFSET $2"#,
                    )
                    .bind(clamped)
                    .bind(offset)
                    .fetch_all(pool)
                    .await?
                }
            };
            return Ok(rows);
        }

        let mirror = self.mirror.lock().await;
        let mut all: Vec<AuditEvent> = match partition_day {
            Some(day) => mirror.get(day).cloned().unwrap_or_default(),
            None => mirror.values().flatten().cloned().collect(),
        };
        all.sort_by(|a, b| {
            b.partition_day
                .cmp(&a.partition_day)
                .then(b.recorded_at.cmp(&a.recorded_at))
                .then(b.audit_id.cmp(&a.audit_id))
        });
        Ok(all.into_iter().skip(offset.max(0) as usize).take(clamped as usize).collect())
    }

    /// Recomputes the chain for the given partition (or every partition, in
    /// `(partition_day, recorded_at, audit_id)` order, resetting the
    /// expected `hash_prev` to GENESIS at each partition boundary) and
    /// reports the first mismatch encountered, if any.
    pub async fn verify_chain(&self, partition_day: Option<&str>) -> Result<VerifyOutcome, PlatformError> {
        if let Some(day) = partition_day {
            if !is_valid_partition_day(day) {
                return Err(PlatformError::invalid("malformed partition_day"));
            }
        }

        let events = self.ordered_for_verify(partition_day).await?;

        let mut expected_prev: HashMap<String, String> = HashMap::new();
        let mut checked = 0u64;
        for event in &events {
            let want_prev = expected_prev
                .get(&event.partition_day)
                .cloned()
                .unwrap_or_else(|| GENESIS_HASH.to_string());

            if event.hash_prev != want_prev {
                return Ok(VerifyOutcome {
                    valid: false,
                    events_checked: checked,
                    mismatched_audit_id: Some(event.audit_id.clone()),
                });
            }

            let canonical_input = AuditEventInput {
                occurred_at: event.occurred_at,
                actor_id: event.actor_id.clone(),
                actor_type: pitboss_core::ActorType::from_wire(&event.actor_type),
                auth_context: event.auth_context.clone(),
                object_type: event.object_type.clone(),
                object_id: event.object_id.clone(),
                action: event.action.clone(),
                before: Some(event.before.clone()),
                after: Some(event.after.clone()),
                result: match event.result.as_str() {
                    "success" => crate::model::AuditResult::Success,
                    "denied" => crate::model::AuditResult::Denied,
                    _ => crate::model::AuditResult::Error,
                },
                reason: event.reason.clone(),
            };
            let canonical = Self::canonical_payload(&event.audit_id, &event.partition_day, &canonical_input, event.recorded_at);
            let recomputed = chain_hash(&want_prev, &canonical_json_string(&canonical));

            if recomputed != event.hash_curr {
                return Ok(VerifyOutcome {
                    valid: false,
                    events_checked: checked,
                    mismatched_audit_id: Some(event.audit_id.clone()),
                });
            }

            expected_prev.insert(event.partition_day.clone(), event.hash_curr.clone());
            checked += 1;
        }

        Ok(VerifyOutcome { valid: true, events_checked: checked, mismatched_audit_id: None })
    }

    async fn ordered_for_verify(&self, partition_day: Option<&str>) -> Result<Vec<AuditEvent>, PlatformError> {
        if let Some(pool) = &self.pool {
            let rows = match partition_day {
                Some(day) => {
                    sqlx::query_as::<_, AuditEvent>(
                        r#"SELECT audit_id, partition_day, occurred_at, recorded_at, actor_id, actor_type,
                                  auth_context, object_type, object_id, action, before_json, after_json,
                                  result, reason, hash_prev, hash_curr
                           FROM audit_events WHERE partition_day = $1
                           ORDER BY partition_day ASC, recorded_at ASC, audit_id ASC"#,
                    )
                    .bind(day)
                    .fetch_all(pool)
                    .await?
                }
                None => {
                    sqlx::query_as::<_, AuditEvent>(
                        r#"SELECT audit_id, partition_day, occurred_at, recorded_at, actor_id, actor_type,
                                  auth_context, object_type, object_id, action, before_json, after_json,
                                  result, reason, hash_prev, hash_curr
                           FROM audit_events
                           ORDER BY partition_day ASC, recorded_at ASC, audit_id ASC"#,
                    )
                    .fetch_all(pool)
                    .await?
                }
            };
            Ok(rows)
        } else {
            let mirror = self.mirror.lock().await;
            let mut all: Vec<AuditEvent> = match partition_day {
                Some(day) => mirror.get(day).cloned().unwrap_or_default(),
                None => mirror.values().flatten().cloned().collect(),
            };
            all.sort_by(|a, b| {
                a.partition_day
                    .cmp(&b.partition_day)
                    .then(a.recorded_at.cmp(&b.recorded_at))
                    .then(a.audit_id.cmp(&b.audit_id))
            });
            Ok(all)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AuditResult;
    use chrono::TimeZone;
    use pitboss_core::ActorType;

    fn input(action: &str, occurred_at: chrono::DateTime<Utc>) -> AuditEventInput {
        AuditEventInput {
            occurred_at,
            actor_id: "operator-1".to_string(),
            actor_type: ActorType::Operator,
            auth_context: None,
            object_type: "ledger_account".to_string(),
            object_id: "acct-1".to_string(),
            action: action.to_string(),
            before: None,
            after: Some(serde_json::json!({"available_minor": 1000})),
            result: AuditResult::Success,
            reason: None,
        }
    }

    #[tokio::test]
    async fn first_event_of_day_chains_from_genesis() {
        let store = AuditStore::new(None, false);
        let day = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let e1 = store.append(input("deposit", day)).await.unwrap();
        assert_eq!(e1.hash_prev, GENESIS_HASH);

        let e2 = store.append(input("deposit", day)).await.unwrap();
        assert_eq!(e2.hash_prev, e1.hash_curr);
        assert_ne!(e2.hash_curr, e1.hash_curr);
    }

    #[tokio::test]
    async fn verify_chain_passes_over_untampered_events() {
        let store = AuditStore::new(None, false);
        let day = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        for _ in 0..20 {
            store.append(input("deposit", day)).await.unwrap();
        }
        let outcome = store.verify_chain(Some("2026-01-01")).await.unwrap();
        assert!(outcome.valid);
        assert_eq!(outcome.events_checked, 20);
    }

    #[tokio::test]
    async fn verify_chain_rejects_tampering() {
        let store = AuditStore::new(None, false);
        let day = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        for _ in 0..5 {
            store.append(input("deposit", day)).await.unwrap();
        }
        let tampered_id = {
            let mut mirror = store.mirror.lock().await;
            let events = mirror.get_mut("2026-01-01").unwrap();
            let tampered_id = events[2].audit_id.clone();
            events[2].hash_curr = "deadbeef".to_string();
            tampered_id
        };

        let outcome = store.verify_chain(Some("2026-01-01")).await.unwrap();
        assert!(!outcome.valid);
        assert_eq!(outcome.mismatched_audit_id, Some(tampered_id));
    }

    #[tokio::test]
    async fn malformed_partition_day_is_invalid() {
        let store = AuditStore::new(None, false);
        let err = store.verify_chain(Some("not-a-date")).await.unwrap_err();
        assert!(matches!(err, PlatformError::Invalid(_)));
    }

    #[tokio::test]
    async fn list_events_is_reverse_chronological_within_partition() {
        let store = AuditStore::new(None, false);
        let day = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let e1 = store.append(input("deposit", day)).await.unwrap();
        let e2 = store.append(input("withdraw", day)).await.unwrap();
        let page = store.list_events(Some("2026-01-01"), 10, 0).await.unwrap();
        assert_eq!(page[0].audit_id, e2.audit_id);
        assert_eq!(page[1].audit_id, e1.audit_id);
    }
}
