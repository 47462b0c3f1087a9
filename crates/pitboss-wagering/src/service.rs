use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::info;

use pitboss_audit::{AuditEventInput, AuditResult, AuditStore};
use pitboss_core::{Actor, ActorType, Clock, PlatformError, ResultCode};
use pitboss_envelope::{admit, commit, meta_from_error, meta_ok, resolve_actor, Admission};

use crate::idempotency::WageringIdempotencyStore;
use crate::model::{Wager, WagerStatus};
use crate::requests::{
    CancelWagerRequest, GetWagerRequest, ListWagersRequest, ListWagersResponse, PlaceWagerRequest,
    SettleWagerRequest, WagerResponse,
};

/// The wager state machine layered on ledger semantics (§4.3). All mutating
/// operations are serialized under `wagers`, the single per-service mutex.
pub struct WageringService {
    pool: Option<PgPool>,
    wagers: Mutex<HashMap<String, Wager>>,
    idempotency: WageringIdempotencyStore,
    audit: Arc<AuditStore>,
    clock: Arc<dyn Clock>,
    disable_in_memory_cache: bool,
    idempotency_ttl_hours: i64,
}

impl WageringService {
    pub fn new(
        pool: Option<PgPool>,
        audit: Arc<AuditStore>,
        clock: Arc<dyn Clock>,
        disable_in_memory_cache: bool,
        idempotency_ttl_hours: i64,
    ) -> Self {
        Self {
            idempotency: WageringIdempotencyStore::new(pool.clone()),
            pool,
            wagers: Mutex::new(HashMap::new()),
            audit,
            clock,
            disable_in_memory_cache,
            idempotency_ttl_hours,
        }
    }

    async fn load_wager(&self, id: &str) -> Result<Option<Wager>, PlatformError> {
        if !self.disable_in_memory_cache {
            if let Some(w) = self.wagers.lock().await.get(id) {
                return Ok(Some(w.clone()));
            }
        }
        if let Some(pool) = &self.pool {
            let row: Option<Wager> = sqlx::query_as(
                r#"SELECT wager_id, player_id, game_id, stake_amount_minor, stake_currency, status,
                          payout_amount_minor, payout_currency, outcome_ref, placed_at, settled_at,
                          canceled_at, cancel_reason
                   FROM wagers WHERE wager_id = $1"#,
            )
            .bind(id)
            .fetch_optional(pool)
            .await?;
            Ok(row)
        } else if self.disable_in_memory_cache {
            Err(PlatformError::PersistenceUnavailable)
        } else {
            Ok(None)
        }
    }

    async fn persist(&self, wager: &Wager, insert: bool) -> Result<(), PlatformError> {
        let Some(pool) = &self.pool else { return Ok(()) };
        if insert {
            sqlx::query(
                r#"INSERT INTO wagers
                     (wager_id, player_id, game_id, stake_amount_minor, stake_currency, status,
                      payout_amount_minor, payout_currency, outcome_ref, placed_at, settled_at,
                      canceled_at, cancel_reason)
                   VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
                   ON CONFLICT (wager_id) DO NOTHING"#,
            )
            .bind(&wager.wager_id)
            .bind(&wager.player_id)
            .bind(&wager.game_id)
            .bind(wager.stake_amount_minor)
            .bind(&wager.stake_currency)
            .bind(&wager.status)
            .bind(wager.payout_amount_minor)
            .bind(&wager.payout_currency)
            .bind(&wager.outcome_ref)
            .bind(wager.placed_at)
            .bind(wager.settled_at)
            .bind(wager.canceled_at)
            .bind(&wager.cancel_reason)
            .execute(pool)
            .await?;
        } else {
            sqlx::query(
                r#"UPDATE wagers SET status = $1, payout_amount_minor = $2, payout_currency = $3,
                          outcome_ref = $4, settled_at = $5, canceled_at = $6, cancel_reason = $7
                   WHERE wager_id = $8"#,
            )
            .bind(&wager.status)
            .bind(wager.payout_amount_minor)
            .bind(&wager.payout_currency)
            .bind(&wager.outcome_ref)
            .bind(wager.settled_at)
            .bind(wager.canceled_at)
            .bind(&wager.cancel_reason)
            .bind(&wager.wager_id)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    async fn mirror(&self, wager: &Wager) {
        if !self.disable_in_memory_cache {
            self.wagers.lock().await.insert(wager.wager_id.clone(), wager.clone());
        }
    }

    /// `∅ → PENDING`: players may place only on their own `player_id`;
    /// operator/service callers may place on any player's behalf.
    async fn place_inner(&self, req: PlaceWagerRequest) -> Result<WagerResponse, PlatformError> {
        let now = self.clock.now();

        if !req.stake.is_valid_for_mutation() {
            return Err(PlatformError::invalid("stake amount and currency are required"));
        }
        if req.meta.idempotency_key.is_empty() {
            return Err(PlatformError::invalid("idempotency_key is required"));
        }

        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        pitboss_envelope::require_actor_type(
            &actor,
            &[ActorType::Player, ActorType::Operator, ActorType::Service],
        )?;
        if actor.actor_type == ActorType::Player && actor.id != req.player_id {
            return Err(PlatformError::denied("player actor must match player_id"));
        }

        let scope = format!("place_wager|{}|{}", req.player_id, req.game_id);
        let fingerprint_payload = req.fingerprint_payload();

        match admit(&self.idempotency, &scope, &req.meta.idempotency_key, &fingerprint_payload).await? {
            Admission::Replay(payload) => {
                return Ok(serde_json::from_value(payload)
                    .map_err(|e| PlatformError::Internal(format!("corrupt idempotency replay: {e}")))?);
            }
            Admission::Proceed => {}
        }

        let wager_id = pitboss_core::types::new_wager_id();
        let wager = Wager {
            wager_id: wager_id.clone(),
            player_id: req.player_id.clone(),
            game_id: req.game_id.clone(),
            stake_amount_minor: req.stake.amount_minor,
            stake_currency: req.stake.currency.0.clone(),
            status: WagerStatus::Pending.as_wire().to_string(),
            payout_amount_minor: None,
            payout_currency: None,
            outcome_ref: None,
            placed_at: now,
            settled_at: None,
            canceled_at: None,
            cancel_reason: None,
        };

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type,
                auth_context: None,
                object_type: "wager".to_string(),
                object_id: wager_id.clone(),
                action: "place_wager".to_string(),
                before: None,
                after: Some(serde_json::to_value(&wager).unwrap_or_default()),
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        self.mirror(&wager).await;

        if let Err(e) = self.persist(&wager, true).await {
            if !self.disable_in_memory_cache {
                self.wagers.lock().await.remove(&wager_id);
            }
            return Err(e);
        }

        let response = WagerResponse {
            meta: meta_ok(&req.meta.request_id, now),
            wager_id: wager_id.clone(),
            status: wager.status.clone(),
        };

        commit(
            &self.idempotency,
            &scope,
            &req.meta.idempotency_key,
            &fingerprint_payload,
            serde_json::to_value(&response).unwrap_or_default(),
            ResultCode::Ok.as_wire(),
            now,
            self.idempotency_ttl_hours,
        )
        .await?;

        info!(wager_id = %wager_id, player_id = %req.player_id, "wager placed");
        Ok(response)
    }

    pub async fn place_wager(&self, req: PlaceWagerRequest) -> WagerResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.place_inner(req).await {
            Ok(resp) => resp,
            Err(e) => WagerResponse { meta: meta_from_error(&request_id, now, &e), wager_id: String::new(), status: String::new() },
        }
    }

    /// `PENDING → SETTLED`: restricted to OPERATOR/SERVICE. A replay against
    /// an already-SETTLED wager succeeds iff the idempotency key matches;
    /// settling a CANCELED wager is DENIED.
    async fn settle_inner(&self, req: SettleWagerRequest) -> Result<WagerResponse, PlatformError> {
        let now = self.clock.now();

        if req.payout.amount_minor < 0 || !req.payout.currency.is_valid() {
            return Err(PlatformError::invalid("payout amount and currency are required"));
        }
        if req.meta.idempotency_key.is_empty() {
            return Err(PlatformError::invalid("idempotency_key is required"));
        }

        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        pitboss_envelope::require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;

        let scope = format!("settle_wager|{}", req.wager_id);
        let fingerprint_payload = req.fingerprint_payload();

        match admit(&self.idempotency, &scope, &req.meta.idempotency_key, &fingerprint_payload).await? {
            Admission::Replay(payload) => {
                return Ok(serde_json::from_value(payload)
                    .map_err(|e| PlatformError::Internal(format!("corrupt idempotency replay: {e}")))?);
            }
            Admission::Proceed => {}
        }

        let before = self
            .load_wager(&req.wager_id)
            .await?
            .ok_or_else(|| PlatformError::invalid("wager not found"))?;

        match before.status() {
            WagerStatus::Settled => {
                // The idempotency hash matched (checked above) — a bare
                // replay of the already-settled terminal state is a no-op
                // success, not a fresh mutation.
            }
            WagerStatus::Canceled => {
                return Err(PlatformError::denied("wager already canceled"));
            }
            WagerStatus::Pending => {}
        }

        let mut updated = before.clone();
        if updated.status() == WagerStatus::Pending {
            updated.status = WagerStatus::Settled.as_wire().to_string();
            updated.payout_amount_minor = Some(req.payout.amount_minor);
            updated.payout_currency = Some(req.payout.currency.0.clone());
            updated.outcome_ref = Some(req.outcome_ref.clone());
            updated.settled_at = Some(now);

            self.audit
                .append(AuditEventInput {
                    occurred_at: now,
                    actor_id: actor.id.clone(),
                    actor_type: actor.actor_type,
                    auth_context: None,
                    object_type: "wager".to_string(),
                    object_id: req.wager_id.clone(),
                    action: "settle_wager".to_string(),
                    before: Some(serde_json::to_value(&before).unwrap_or_default()),
                    after: Some(serde_json::to_value(&updated).unwrap_or_default()),
                    result: AuditResult::Success,
                    reason: None,
                })
                .await?;

            self.mirror(&updated).await;

            if let Err(e) = self.persist(&updated, false).await {
                self.mirror(&before).await;
                return Err(e);
            }
        }

        let response = WagerResponse {
            meta: meta_ok(&req.meta.request_id, now),
            wager_id: req.wager_id.clone(),
            status: updated.status.clone(),
        };

        commit(
            &self.idempotency,
            &scope,
            &req.meta.idempotency_key,
            &fingerprint_payload,
            serde_json::to_value(&response).unwrap_or_default(),
            ResultCode::Ok.as_wire(),
            now,
            self.idempotency_ttl_hours,
        )
        .await?;

        info!(wager_id = %req.wager_id, status = %updated.status, "wager settled");
        Ok(response)
    }

    pub async fn settle_wager(&self, req: SettleWagerRequest) -> WagerResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.settle_inner(req).await {
            Ok(resp) => resp,
            Err(e) => WagerResponse { meta: meta_from_error(&request_id, now, &e), wager_id: String::new(), status: String::new() },
        }
    }

    /// `PENDING → CANCELED`: restricted to OPERATOR/SERVICE. Canceling a
    /// SETTLED wager is DENIED.
    async fn cancel_inner(&self, req: CancelWagerRequest) -> Result<WagerResponse, PlatformError> {
        let now = self.clock.now();

        if req.meta.idempotency_key.is_empty() {
            return Err(PlatformError::invalid("idempotency_key is required"));
        }

        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        pitboss_envelope::require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;

        let scope = format!("cancel_wager|{}", req.wager_id);
        let fingerprint_payload = req.fingerprint_payload();

        match admit(&self.idempotency, &scope, &req.meta.idempotency_key, &fingerprint_payload).await? {
            Admission::Replay(payload) => {
                return Ok(serde_json::from_value(payload)
                    .map_err(|e| PlatformError::Internal(format!("corrupt idempotency replay: {e}")))?);
            }
            Admission::Proceed => {}
        }

        let before = self
            .load_wager(&req.wager_id)
            .await?
            .ok_or_else(|| PlatformError::invalid("wager not found"))?;

        match before.status() {
            WagerStatus::Canceled => {}
            WagerStatus::Settled => {
                return Err(PlatformError::denied("wager already settled"));
            }
            WagerStatus::Pending => {}
        }

        let mut updated = before.clone();
        if updated.status() == WagerStatus::Pending {
            updated.status = WagerStatus::Canceled.as_wire().to_string();
            updated.cancel_reason = Some(req.cancel_reason.clone());
            updated.canceled_at = Some(now);

            self.audit
                .append(AuditEventInput {
                    occurred_at: now,
                    actor_id: actor.id.clone(),
                    actor_type: actor.actor_type,
                    auth_context: None,
                    object_type: "wager".to_string(),
                    object_id: req.wager_id.clone(),
                    action: "cancel_wager".to_string(),
                    before: Some(serde_json::to_value(&before).unwrap_or_default()),
                    after: Some(serde_json::to_value(&updated).unwrap_or_default()),
                    result: AuditResult::Success,
                    reason: None,
                })
                .await?;

            self.mirror(&updated).await;

            if let Err(e) = self.persist(&updated, false).await {
                self.mirror(&before).await;
                return Err(e);
            }
        }

        let response = WagerResponse {
            meta: meta_ok(&req.meta.request_id, now),
            wager_id: req.wager_id.clone(),
            status: updated.status.clone(),
        };

        commit(
            &self.idempotency,
            &scope,
            &req.meta.idempotency_key,
            &fingerprint_payload,
            serde_json::to_value(&response).unwrap_or_default(),
            ResultCode::Ok.as_wire(),
            now,
            self.idempotency_ttl_hours,
        )
        .await?;

        info!(wager_id = %req.wager_id, status = %updated.status, "wager canceled");
        Ok(response)
    }

    pub async fn cancel_wager(&self, req: CancelWagerRequest) -> WagerResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.cancel_inner(req).await {
            Ok(resp) => resp,
            Err(e) => WagerResponse { meta: meta_from_error(&request_id, now, &e), wager_id: String::new(), status: String::new() },
        }
    }

    pub async fn get_wager(&self, req: GetWagerRequest) -> Result<Option<Wager>, PlatformError> {
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        let wager = self.load_wager(&req.wager_id).await?;
        if let Some(w) = &wager {
            if actor.actor_type == ActorType::Player && actor.id != w.player_id {
                return Err(PlatformError::denied("player actor must match wager's player"));
            }
        }
        Ok(wager)
    }

    /// Cursor pagination over integer offsets; page size defaults to 50 when
    /// the caller's requested size is <= 0, same convention as
    /// `ListTransactions`.
    pub async fn list_wagers(&self, req: ListWagersRequest) -> Result<ListWagersResponse, PlatformError> {
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        if actor.actor_type == ActorType::Player && actor.id != req.player_id {
            return Err(PlatformError::denied("player actor must match player_id"));
        }

        let page_size = if req.page_size <= 0 {
            pitboss_core::constants::DEFAULT_LIST_PAGE_SIZE
        } else {
            req.page_size.min(pitboss_core::constants::MAX_LIST_PAGE_SIZE)
        };
        let now = self.clock.now();

        let Some(pool) = &self.pool else {
            return Ok(ListWagersResponse { meta: meta_ok(&req.meta.request_id, now), wagers: vec![], next_offset: req.offset });
        };

        let rows: Vec<Wager> = sqlx::query_as(
            r#"SELECT wager_id, player_id, game_id, stake_amount_minor, stake_currency, status,
                      payout_amount_minor, payout_currency, outcome_ref, placed_at, settled_at,
                      canceled_at, cancel_reason
               FROM wagers WHERE player_id = $1
               ORDER BY placed_at ASC, wager_id ASC
               LIMIT $2 OFFSET $3"#,
        )
        .bind(&req.player_id)
        .bind(page_size)
        .bind(req.offset)
        .fetch_all(pool)
        .await?;

        let count = rows.len() as i64;
        Ok(ListWagersResponse {
            meta: meta_ok(&req.meta.request_id, now),
            wagers: rows,
            next_offset: req.offset + count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboss_core::{Actor, FixedClock, RequestMeta};

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(chrono::Utc::now()))
    }

    fn player_meta(id: &str, idem: &str) -> RequestMeta {
        RequestMeta {
            request_id: "req-1".to_string(),
            idempotency_key: idem.to_string(),
            actor: Some(Actor { id: id.to_string(), actor_type: ActorType::Player }),
        }
    }

    fn operator_meta(idem: &str) -> RequestMeta {
        RequestMeta {
            request_id: "req-2".to_string(),
            idempotency_key: idem.to_string(),
            actor: Some(Actor { id: "op-1".to_string(), actor_type: ActorType::Operator }),
        }
    }

    fn svc() -> WageringService {
        WageringService::new(
            None,
            Arc::new(AuditStore::new(None, false)),
            clock(),
            false,
            pitboss_core::constants::IDEMPOTENCY_TTL_HOURS,
        )
    }

    #[tokio::test]
    async fn place_then_settle_then_replay_is_idempotent() {
        let svc = svc();
        let place = svc
            .place_wager(PlaceWagerRequest {
                meta: player_meta("player-1", "idem-place"),
                player_id: "player-1".to_string(),
                game_id: "slots".to_string(),
                stake: pitboss_core::Money::new(500, "USD"),
            })
            .await;
        assert_eq!(place.status, "PENDING");

        let settle_req = SettleWagerRequest {
            meta: operator_meta("idem-settle"),
            wager_id: place.wager_id.clone(),
            payout: pitboss_core::Money::new(1000, "USD"),
            outcome_ref: "outcome-1".to_string(),
        };
        let settled = svc.settle_wager(settle_req.clone()).await;
        assert_eq!(settled.status, "SETTLED");

        let replay = svc.settle_wager(settle_req).await;
        assert_eq!(replay.status, "SETTLED");
        assert_eq!(replay.wager_id, settled.wager_id);
    }

    #[tokio::test]
    async fn cancel_after_settle_is_denied() {
        let svc = svc();
        let place = svc
            .place_wager(PlaceWagerRequest {
                meta: player_meta("player-1", "idem-place"),
                player_id: "player-1".to_string(),
                game_id: "slots".to_string(),
                stake: pitboss_core::Money::new(500, "USD"),
            })
            .await;

        svc.settle_wager(SettleWagerRequest {
            meta: operator_meta("idem-settle"),
            wager_id: place.wager_id.clone(),
            payout: pitboss_core::Money::new(0, "USD"),
            outcome_ref: "outcome-1".to_string(),
        })
        .await;

        let cancel = svc
            .cancel_wager(CancelWagerRequest {
                meta: operator_meta("idem-cancel"),
                wager_id: place.wager_id.clone(),
                cancel_reason: "too late".to_string(),
            })
            .await;
        assert_eq!(cancel.meta.result_code, ResultCode::Denied);
    }

    #[tokio::test]
    async fn player_cannot_place_on_behalf_of_another_player() {
        let svc = svc();
        let resp = svc
            .place_wager(PlaceWagerRequest {
                meta: player_meta("player-1", "idem-place"),
                player_id: "player-2".to_string(),
                game_id: "slots".to_string(),
                stake: pitboss_core::Money::new(500, "USD"),
            })
            .await;
        assert_eq!(resp.meta.result_code, ResultCode::Denied);
    }
}
