use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use pitboss_audit::{AuditEventInput, AuditResult, AuditStore};
use pitboss_core::types::Timestamp;
use pitboss_core::{ActorType, Clock, PlatformError};
use pitboss_envelope::{meta_from_error, meta_ok, require_actor_type, resolve_actor};

use crate::model::{MeterRecord, SignificantEvent, SlotStatus};
use crate::requests::{
    ListEventsRequest, ListEventsResponse, ListMetersRequest, ListMetersResponse, SubmitEventResponse,
    SubmitMeterRequest, SubmitMeterResponse, SubmitSignificantEventRequest,
};

enum Reservation<T> {
    Duplicate(T),
    Reserved,
    Exhausted,
}

struct IngestionState {
    events: HashMap<String, SignificantEvent>,
    meters: HashMap<String, MeterRecord>,
    disabled: bool,
}

/// The bounded, in-process ingestion buffer (§4.8). The buffer itself is
/// the in-memory queue this component exists to provide — `bufferCap` and
/// the queued/acknowledged accounting live against `state` regardless of
/// the persistence-adapter cache toggle, which here governs only whether
/// `ListEvents`/`ListMeters` read through to the mirror or force a
/// database round trip.
pub struct IngestionService {
    pool: Option<PgPool>,
    state: Mutex<IngestionState>,
    buffer_cap: usize,
    audit: Arc<AuditStore>,
    clock: Arc<dyn Clock>,
    disable_in_memory_cache: bool,
}

impl IngestionService {
    pub fn new(pool: Option<PgPool>, buffer_cap: usize, audit: Arc<AuditStore>, clock: Arc<dyn Clock>, disable_in_memory_cache: bool) -> Self {
        Self {
            pool,
            state: Mutex::new(IngestionState { events: HashMap::new(), meters: HashMap::new(), disabled: false }),
            buffer_cap,
            audit,
            clock,
            disable_in_memory_cache,
        }
    }

    fn queued_count(state: &IngestionState) -> usize {
        state.events.values().filter(|e| e.status() == SlotStatus::Queued).count()
            + state.meters.values().filter(|m| m.status() == SlotStatus::Queued).count()
    }

    /// Re-enables ingestion after a `bufferCap` exhaustion. Not an RPC
    /// surface named by §6 — invoked operationally (e.g. once the backlog
    /// has been drained by downstream consumers).
    pub async fn reenable(&self) {
        let mut st = self.state.lock().await;
        st.disabled = false;
        info!("ingestion buffer re-enabled");
    }

    /// Whether the buffer is currently accepting submissions, for the
    /// system-status aggregator (§11).
    pub async fn is_enabled(&self) -> bool {
        !self.state.lock().await.disabled
    }

    async fn reserve_event(&self, candidate: SignificantEvent) -> Reservation<SignificantEvent> {
        let mut st = self.state.lock().await;
        if let Some(existing) = st.events.get(&candidate.event_id) {
            return Reservation::Duplicate(existing.clone());
        }
        if st.disabled {
            return Reservation::Exhausted;
        }
        if Self::queued_count(&st) >= self.buffer_cap {
            st.disabled = true;
            warn!(buffer_cap = self.buffer_cap, "ingestion buffer exhausted, disabling further submissions");
            return Reservation::Exhausted;
        }
        st.events.insert(candidate.event_id.clone(), candidate);
        Reservation::Reserved
    }

    async fn reserve_meter(&self, candidate: MeterRecord) -> Reservation<MeterRecord> {
        let mut st = self.state.lock().await;
        if let Some(existing) = st.meters.get(&candidate.meter_id) {
            return Reservation::Duplicate(existing.clone());
        }
        if st.disabled {
            return Reservation::Exhausted;
        }
        if Self::queued_count(&st) >= self.buffer_cap {
            st.disabled = true;
            warn!(buffer_cap = self.buffer_cap, "ingestion buffer exhausted, disabling further submissions");
            return Reservation::Exhausted;
        }
        st.meters.insert(candidate.meter_id.clone(), candidate);
        Reservation::Reserved
    }

    async fn ack_event(&self, id: &str, recorded_at: Timestamp) {
        let mut st = self.state.lock().await;
        if let Some(e) = st.events.get_mut(id) {
            e.status = SlotStatus::Acknowledged.as_str().to_string();
            e.recorded_at = Some(recorded_at);
        }
    }

    async fn ack_meter(&self, id: &str, recorded_at: Timestamp) {
        let mut st = self.state.lock().await;
        if let Some(m) = st.meters.get_mut(id) {
            m.status = SlotStatus::Acknowledged.as_str().to_string();
            m.recorded_at = Some(recorded_at);
        }
    }

    async fn remove_event(&self, id: &str) {
        self.state.lock().await.events.remove(id);
    }

    async fn remove_meter(&self, id: &str) {
        self.state.lock().await.meters.remove(id);
    }

    async fn persist_event(&self, e: &SignificantEvent) -> Result<(), PlatformError> {
        let Some(pool) = &self.pool else { return Ok(()) };
        sqlx::query(
            r#"INSERT INTO significant_events (event_id, equipment_id, source_id, payload, status, occurred_at, received_at, recorded_at)
               VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
               ON CONFLICT (event_id) DO UPDATE
                 SET status = EXCLUDED.status, recorded_at = EXCLUDED.recorded_at"#,
        )
        .bind(&e.event_id)
        .bind(&e.equipment_id)
        .bind(&e.source_id)
        .bind(&e.payload)
        .bind(&e.status)
        .bind(e.occurred_at)
        .bind(e.received_at)
        .bind(e.recorded_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn persist_meter(&self, m: &MeterRecord) -> Result<(), PlatformError> {
        let Some(pool) = &self.pool else { return Ok(()) };
        sqlx::query(
            r#"INSERT INTO meter_records (meter_id, equipment_id, source_id, kind, value, status, occurred_at, received_at, recorded_at)
               VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
               ON CONFLICT (meter_id) DO UPDATE
                 SET status = EXCLUDED.status, recorded_at = EXCLUDED.recorded_at"#,
        )
        .bind(&m.meter_id)
        .bind(&m.equipment_id)
        .bind(&m.source_id)
        .bind(&m.kind)
        .bind(m.value)
        .bind(&m.status)
        .bind(m.occurred_at)
        .bind(m.received_at)
        .bind(m.recorded_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn submit_event_inner(&self, req: SubmitSignificantEventRequest) -> Result<SubmitEventResponse, PlatformError> {
        let now = self.clock.now();
        if req.event_id.is_empty() || req.equipment_id.is_empty() {
            return Err(PlatformError::invalid("event_id and equipment_id are required"));
        }

        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;

        let candidate = SignificantEvent {
            event_id: req.event_id.clone(),
            equipment_id: req.equipment_id.clone(),
            source_id: req.source_id.clone(),
            payload: req.payload.clone(),
            status: SlotStatus::Queued.as_str().to_string(),
            occurred_at: req.occurred_at,
            received_at: now,
            recorded_at: None,
        };

        match self.reserve_event(candidate.clone()).await {
            Reservation::Duplicate(existing) => {
                return Ok(SubmitEventResponse {
                    meta: meta_ok(&req.meta.request_id, now),
                    event_id: existing.event_id,
                    status: existing.status,
                });
            }
            Reservation::Exhausted => return Err(PlatformError::denied("ingestion buffer exhausted")),
            Reservation::Reserved => {}
        }

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type,
                auth_context: None,
                object_type: "significant_event".to_string(),
                object_id: req.event_id.clone(),
                action: "submit_significant_event".to_string(),
                before: None,
                after: Some(serde_json::to_value(&candidate).unwrap_or_default()),
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        let recorded_at = self.clock.now();
        if let Err(e) = self.persist_event(&SignificantEvent { status: SlotStatus::Acknowledged.as_str().to_string(), recorded_at: Some(recorded_at), ..candidate.clone() }).await {
            self.remove_event(&req.event_id).await;
            return Err(e);
        }
        self.ack_event(&req.event_id, recorded_at).await;

        info!(event_id = %req.event_id, equipment_id = %req.equipment_id, "significant event acknowledged");
        Ok(SubmitEventResponse {
            meta: meta_ok(&req.meta.request_id, now),
            event_id: req.event_id,
            status: SlotStatus::Acknowledged.as_str().to_string(),
        })
    }

    pub async fn submit_significant_event(&self, req: SubmitSignificantEventRequest) -> SubmitEventResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.submit_event_inner(req).await {
            Ok(resp) => resp,
            Err(e) => SubmitEventResponse { meta: meta_from_error(&request_id, now, &e), event_id: String::new(), status: String::new() },
        }
    }

    async fn submit_meter_inner(&self, req: SubmitMeterRequest) -> Result<SubmitMeterResponse, PlatformError> {
        let now = self.clock.now();
        if req.meter_id.is_empty() || req.equipment_id.is_empty() {
            return Err(PlatformError::invalid("meter_id and equipment_id are required"));
        }

        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;

        let candidate = MeterRecord {
            meter_id: req.meter_id.clone(),
            equipment_id: req.equipment_id.clone(),
            source_id: req.source_id.clone(),
            kind: req.kind.as_str().to_string(),
            value: req.value,
            status: SlotStatus::Queued.as_str().to_string(),
            occurred_at: req.occurred_at,
            received_at: now,
            recorded_at: None,
        };

        match self.reserve_meter(candidate.clone()).await {
            Reservation::Duplicate(existing) => {
                return Ok(SubmitMeterResponse {
                    meta: meta_ok(&req.meta.request_id, now),
                    meter_id: existing.meter_id,
                    status: existing.status,
                });
            }
            Reservation::Exhausted => return Err(PlatformError::denied("ingestion buffer exhausted")),
            Reservation::Reserved => {}
        }

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type,
                auth_context: None,
                object_type: "meter_record".to_string(),
                object_id: req.meter_id.clone(),
                action: format!("submit_meter_{}", req.kind.as_str()),
                before: None,
                after: Some(serde_json::to_value(&candidate).unwrap_or_default()),
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        let recorded_at = self.clock.now();
        if let Err(e) = self.persist_meter(&MeterRecord { status: SlotStatus::Acknowledged.as_str().to_string(), recorded_at: Some(recorded_at), ..candidate.clone() }).await {
            self.remove_meter(&req.meter_id).await;
            return Err(e);
        }
        self.ack_meter(&req.meter_id, recorded_at).await;

        info!(meter_id = %req.meter_id, equipment_id = %req.equipment_id, "meter reading acknowledged");
        Ok(SubmitMeterResponse {
            meta: meta_ok(&req.meta.request_id, now),
            meter_id: req.meter_id,
            status: SlotStatus::Acknowledged.as_str().to_string(),
        })
    }

    pub async fn submit_meter(&self, req: SubmitMeterRequest) -> SubmitMeterResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.submit_meter_inner(req).await {
            Ok(resp) => resp,
            Err(e) => SubmitMeterResponse { meta: meta_from_error(&request_id, now, &e), meter_id: String::new(), status: String::new() },
        }
    }

    pub async fn list_events(&self, req: ListEventsRequest) -> ListEventsResponse {
        let now = self.clock.now();
        let page_size = if req.page_size <= 0 {
            pitboss_core::constants::DEFAULT_LIST_PAGE_SIZE
        } else {
            req.page_size.min(pitboss_core::constants::MAX_LIST_PAGE_SIZE)
        };

        if self.disable_in_memory_cache || self.pool.is_none() {
            let Some(pool) = &self.pool else {
                return ListEventsResponse { meta: meta_from_error(&req.meta.request_id, now, &PlatformError::PersistenceUnavailable), events: vec![], next_offset: req.offset };
            };
            let rows: Result<Vec<SignificantEvent>, sqlx::Error> = match &req.equipment_id {
                Some(eq) => {
                    sqlx::query_as(
                        "SELECT event_id, equipment_id, source_id, payload, status, occurred_at, received_at, recorded_at
                         FROM significant_events WHERE equipment_id = $1 ORDER BY received_at ASC LIMIT $2 OFFSET $3",
                    )
                    .bind(eq)
                    .bind(page_size)
                    .bind(req.offset)
                    .fetch_all(pool)
                    .await
                }
                None => {
                    sqlx::query_as(
                        "SELECT event_id, equipment_id, source_id, payload, status, occurred_at, received_at, recorded_at
                         FROM significant_events ORDER BY received_at ASC LIMIT $1 OFFSET $2",
                    )
                    .bind(page_size)
                    .bind(req.offset)
                    .fetch_all(pool)
                    .await
                }
            };
            return match rows {
                Ok(events) => {
                    let count = events.len() as i64;
                    ListEventsResponse { meta: meta_ok(&req.meta.request_id, now), events, next_offset: req.offset + count }
                }
                Err(e) => ListEventsResponse { meta: meta_from_error(&req.meta.request_id, now, &e.into()), events: vec![], next_offset: req.offset },
            };
        }

        let st = self.state.lock().await;
        let mut events: Vec<SignificantEvent> = st
            .events
            .values()
            .filter(|e| req.equipment_id.as_deref().map(|eq| eq == e.equipment_id).unwrap_or(true))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.received_at.cmp(&b.received_at).then(a.event_id.cmp(&b.event_id)));
        let total = events.len() as i64;
        let page: Vec<SignificantEvent> = events.into_iter().skip(req.offset.max(0) as usize).take(page_size as usize).collect();
        ListEventsResponse { meta: meta_ok(&req.meta.request_id, now), events: page, next_offset: (req.offset + page_size).min(total) }
    }

    pub async fn list_meters(&self, req: ListMetersRequest) -> ListMetersResponse {
        let now = self.clock.now();
        let page_size = if req.page_size <= 0 {
            pitboss_core::constants::DEFAULT_LIST_PAGE_SIZE
        } else {
            req.page_size.min(pitboss_core::constants::MAX_LIST_PAGE_SIZE)
        };

        if self.disable_in_memory_cache || self.pool.is_none() {
            let Some(pool) = &self.pool else {
                return ListMetersResponse { meta: meta_from_error(&req.meta.request_id, now, &PlatformError::PersistenceUnavailable), meters: vec![], next_offset: req.offset };
            };
            let rows: Result<Vec<MeterRecord>, sqlx::Error> = match &req.equipment_id {
                Some(eq) => {
                    sqlx::query_as(
                        "SELECT meter_id, equipment_id, source_id, kind, value, status, occurred_at, received_at, recorded_at
                         FROM meter_records WHERE equipment_id = $1 ORDER BY received_at ASC LIMIT $2 OFFSET $3",
                    )
                    .bind(eq)
                    .bind(page_size)
                    .bind(req.offset)
                    .fetch_all(pool)
                    .await
                }
                None => {
                    sqlx::query_as(
                        "SELECT meter_id, equipment_id, source_id, kind, value, status, occurred_at, received_at, recorded_at
                         FROM meter_records ORDER BY received_at ASC LIMIT $1 OFFSET $2",
                    )
                    .bind(page_size)
                    .bind(req.offset)
                    .fetch_all(pool)
                    .await
                }
            };
            return match rows {
                Ok(meters) => {
                    let count = meters.len() as i64;
                    ListMetersResponse { meta: meta_ok(&req.meta.request_id, now), meters, next_offset: req.offset + count }
                }
                Err(e) => ListMetersResponse { meta: meta_from_error(&req.meta.request_id, now, &e.into()), meters: vec![], next_offset: req.offset },
            };
        }

        let st = self.state.lock().await;
        let mut meters: Vec<MeterRecord> = st
            .meters
            .values()
            .filter(|m| req.equipment_id.as_deref().map(|eq| eq == m.equipment_id).unwrap_or(true))
            .cloned()
            .collect();
        meters.sort_by(|a, b| a.received_at.cmp(&b.received_at).then(a.meter_id.cmp(&b.meter_id)));
        let total = meters.len() as i64;
        let page: Vec<MeterRecord> = meters.into_iter().skip(req.offset.max(0) as usize).take(page_size as usize).collect();
        ListMetersResponse { meta: meta_ok(&req.meta.request_id, now), meters: page, next_offset: (req.offset + page_size).min(total) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboss_core::{Actor, FixedClock, RequestMeta, ResultCode};

    fn svc(cap: usize) -> IngestionService {
        IngestionService::new(None, cap, Arc::new(AuditStore::new(None, false)), Arc::new(FixedClock(chrono::Utc::now())), false)
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            request_id: "req-1".to_string(),
            idempotency_key: String::new(),
            actor: Some(Actor { id: "svc-1".to_string(), actor_type: ActorType::Service }),
        }
    }

    #[tokio::test]
    async fn duplicate_event_id_is_idempotent() {
        let svc = svc(10);
        let now = chrono::Utc::now();
        let req = SubmitSignificantEventRequest {
            meta: meta(),
            event_id: "evt-1".to_string(),
            equipment_id: "slot-1".to_string(),
            source_id: None,
            payload: serde_json::json!({"type": "door_open"}),
            occurred_at: now,
        };
        let first = svc.submit_significant_event(req.clone()).await;
        assert_eq!(first.meta.result_code, ResultCode::Ok);
        let second = svc.submit_significant_event(req).await;
        assert_eq!(second.meta.result_code, ResultCode::Ok);
        assert_eq!(second.event_id, first.event_id);
    }

    #[tokio::test]
    async fn exhausting_buffer_cap_disables_further_submits() {
        // Exercises the reservation primitive directly: two concurrently
        // in-flight (still `queued`, not yet acknowledged) slots are what
        // exhausts a cap of 1, which the synchronous submit/ack round trip
        // in a single-threaded test would otherwise never observe.
        let svc = svc(1);
        let now = chrono::Utc::now();
        let first = SignificantEvent {
            event_id: "evt-1".to_string(),
            equipment_id: "slot-1".to_string(),
            source_id: None,
            payload: serde_json::json!({}),
            status: SlotStatus::Queued.as_str().to_string(),
            occurred_at: now,
            received_at: now,
            recorded_at: None,
        };
        assert!(matches!(svc.reserve_event(first).await, Reservation::Reserved));

        let second = SignificantEvent {
            event_id: "evt-2".to_string(),
            equipment_id: "slot-1".to_string(),
            source_id: None,
            payload: serde_json::json!({}),
            status: SlotStatus::Queued.as_str().to_string(),
            occurred_at: now,
            received_at: now,
            recorded_at: None,
        };
        assert!(matches!(svc.reserve_event(second).await, Reservation::Exhausted));

        let denied = svc
            .submit_significant_event(SubmitSignificantEventRequest {
                meta: meta(),
                event_id: "evt-3".to_string(),
                equipment_id: "slot-1".to_string(),
                source_id: None,
                payload: serde_json::json!({}),
                occurred_at: now,
            })
            .await;
        assert_eq!(denied.meta.result_code, ResultCode::Denied);
    }
}
