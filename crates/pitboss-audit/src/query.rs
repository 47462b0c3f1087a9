use std::sync::Arc;

use pitboss_core::{ActorType, Clock, PlatformError};
use pitboss_envelope::{meta_from_error, meta_ok, require_actor_type, resolve_actor};

use crate::requests::{ListAuditEventsRequest, ListAuditEventsResponse, VerifyAuditChainRequest, VerifyAuditChainResponse};
use crate::store::AuditStore;

/// RequestEnvelope-level wrapper around [`AuditStore::list_events`] (§6).
/// Audit data is operator/service-only.
pub async fn list_audit_events(store: &AuditStore, clock: &Arc<dyn Clock>, req: ListAuditEventsRequest) -> ListAuditEventsResponse {
    let now = clock.now();

    let result = async {
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;
        store.list_events(req.partition_day.as_deref(), req.page_size, req.offset).await
    }
    .await;

    match result {
        Ok(events) => {
            let count = events.len() as i64;
            ListAuditEventsResponse { meta: meta_ok(&req.meta.request_id, now), events, next_offset: req.offset + count }
        }
        Err(e) => ListAuditEventsResponse { meta: meta_from_error(&req.meta.request_id, now, &e), events: vec![], next_offset: req.offset },
    }
}

/// RequestEnvelope-level wrapper around [`AuditStore::verify_chain`] (§6).
pub async fn verify_audit_chain(store: &AuditStore, clock: &Arc<dyn Clock>, req: VerifyAuditChainRequest) -> VerifyAuditChainResponse {
    let now = clock.now();

    let result: Result<_, PlatformError> = async {
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;
        store.verify_chain(req.partition_day.as_deref()).await
    }
    .await;

    match result {
        Ok(outcome) => VerifyAuditChainResponse {
            meta: meta_ok(&req.meta.request_id, now),
            valid: outcome.valid,
            events_checked: outcome.events_checked,
            mismatched_audit_id: outcome.mismatched_audit_id,
        },
        Err(e) => VerifyAuditChainResponse { meta: meta_from_error(&req.meta.request_id, now, &e), valid: false, events_checked: 0, mismatched_audit_id: None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboss_core::{Actor, FixedClock, RequestMeta};

    fn meta(actor_type: ActorType) -> RequestMeta {
        RequestMeta {
            request_id: "req-1".to_string(),
            idempotency_key: String::new(),
            actor: Some(Actor { id: "a-1".to_string(), actor_type }),
        }
    }

    #[tokio::test]
    async fn player_is_denied_listing_audit_events() {
        let store = AuditStore::new(None, false);
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(chrono::Utc::now()));
        let resp = list_audit_events(
            &store,
            &clock,
            ListAuditEventsRequest { meta: meta(ActorType::Player), partition_day: None, page_size: 10, offset: 0 },
        )
        .await;
        assert_eq!(resp.meta.result_code, pitboss_core::ResultCode::Denied);
    }

    #[tokio::test]
    async fn empty_chain_verifies_as_valid() {
        let store = AuditStore::new(None, false);
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(chrono::Utc::now()));
        let resp = verify_audit_chain(&store, &clock, VerifyAuditChainRequest { meta: meta(ActorType::Operator), partition_day: None }).await;
        assert!(resp.valid);
    }
}
