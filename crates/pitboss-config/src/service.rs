use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use pitboss_audit::{AuditEventInput, AuditResult, AuditStore};
use pitboss_core::{ActorType, Clock, PlatformError};
use pitboss_envelope::{meta_from_error, meta_ok, require_actor_type, resolve_actor};

use crate::model::{ConfigChange, ConfigChangeStatus};
use crate::requests::{
    ApplyConfigChangeRequest, ApproveConfigChangeRequest, ConfigChangeResponse, ListConfigHistoryRequest,
    ListConfigHistoryResponse, ProposeConfigChangeRequest,
};

/// The propose/approve/apply workflow (§4.7). Two-actor enforcement
/// (proposer ≠ approver) is left to operational policy, auditable via the
/// journal's `actor_id` columns, rather than enforced by this state
/// machine — per the spec's own framing of that rule.
pub struct ConfigService {
    pool: Option<PgPool>,
    mirror: Mutex<HashMap<String, ConfigChange>>,
    audit: Arc<AuditStore>,
    clock: Arc<dyn Clock>,
    disable_in_memory_cache: bool,
}

impl ConfigService {
    pub fn new(pool: Option<PgPool>, audit: Arc<AuditStore>, clock: Arc<dyn Clock>, disable_in_memory_cache: bool) -> Self {
        Self { pool, mirror: Mutex::new(HashMap::new()), audit, clock, disable_in_memory_cache }
    }

    async fn load(&self, change_id: &str) -> Result<Option<ConfigChange>, PlatformError> {
        if !self.disable_in_memory_cache {
            if let Some(c) = self.mirror.lock().await.get(change_id) {
                return Ok(Some(c.clone()));
            }
        }
        if let Some(pool) = &self.pool {
            let row: Option<ConfigChange> = sqlx::query_as(
                r#"SELECT change_id, namespace, key, proposed_value, reason, status, proposed_by, approved_by, applied_at, created_at
                   FROM config_changes WHERE change_id = $1"#,
            )
            .bind(change_id)
            .fetch_optional(pool)
            .await?;
            Ok(row)
        } else if self.disable_in_memory_cache {
            Err(PlatformError::PersistenceUnavailable)
        } else {
            Ok(None)
        }
    }

    async fn persist_insert(&self, c: &ConfigChange) -> Result<(), PlatformError> {
        let Some(pool) = &self.pool else { return Ok(()) };
        sqlx::query(
            r#"INSERT INTO config_changes (change_id, namespace, key, proposed_value, reason, status, proposed_by, approved_by, applied_at, created_at)
               VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
               ON CONFLICT (change_id) DO NOTHING"#,
        )
        .bind(&c.change_id)
        .bind(&c.namespace)
        .bind(&c.key)
        .bind(&c.proposed_value)
        .bind(&c.reason)
        .bind(&c.status)
        .bind(&c.proposed_by)
        .bind(&c.approved_by)
        .bind(c.applied_at)
        .bind(c.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn persist_transition(&self, c: &ConfigChange) -> Result<(), PlatformError> {
        let Some(pool) = &self.pool else { return Ok(()) };
        sqlx::query(
            r#"UPDATE config_changes SET status = $1, approved_by = $2, applied_at = $3 WHERE change_id = $4"#,
        )
        .bind(&c.status)
        .bind(&c.approved_by)
        .bind(c.applied_at)
        .bind(&c.change_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn mirror(&self, c: &ConfigChange) {
        if !self.disable_in_memory_cache {
            self.mirror.lock().await.insert(c.change_id.clone(), c.clone());
        }
    }

    async fn propose_inner(&self, req: ProposeConfigChangeRequest) -> Result<ConfigChangeResponse, PlatformError> {
        let now = self.clock.now();
        if req.namespace.is_empty() || req.key.is_empty() {
            return Err(PlatformError::invalid("namespace and key are required"));
        }

        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator])?;

        let change = ConfigChange {
            change_id: format!("cfgchg-{}", Uuid::new_v4()),
            namespace: req.namespace.clone(),
            key: req.key.clone(),
            proposed_value: req.proposed_value.clone(),
            reason: req.reason.clone(),
            status: ConfigChangeStatus::Pending.as_str().to_string(),
            proposed_by: actor.id.clone(),
            approved_by: None,
            applied_at: None,
            created_at: now,
        };

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type,
                auth_context: None,
                object_type: "config_change".to_string(),
                object_id: change.change_id.clone(),
                action: "propose_config_change".to_string(),
                before: None,
                after: Some(serde_json::to_value(&change).unwrap_or_default()),
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        self.mirror(&change).await;

        if let Err(e) = self.persist_insert(&change).await {
            self.mirror.lock().await.remove(&change.change_id);
            return Err(e);
        }

        info!(change_id = %change.change_id, namespace = %change.namespace, key = %change.key, "config change proposed");
        Ok(ConfigChangeResponse { meta: meta_ok(&req.meta.request_id, now), change_id: change.change_id, status: change.status })
    }

    pub async fn propose_config_change(&self, req: ProposeConfigChangeRequest) -> ConfigChangeResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.propose_inner(req).await {
            Ok(resp) => resp,
            Err(e) => ConfigChangeResponse { meta: meta_from_error(&request_id, now, &e), change_id: String::new(), status: String::new() },
        }
    }

    async fn transition(
        &self,
        change_id: &str,
        actor_id: &str,
        actor_type: ActorType,
        now: chrono::DateTime<chrono::Utc>,
        action: &str,
        from: ConfigChangeStatus,
        apply: impl FnOnce(&mut ConfigChange),
    ) -> Result<ConfigChange, PlatformError> {
        let before = self.load(change_id).await?.ok_or_else(|| PlatformError::invalid("config change not found"))?;

        if before.status() != from {
            return Err(PlatformError::denied(format!(
                "config change must be {} to {}",
                from.as_str(),
                action
            )));
        }

        let mut updated = before.clone();
        apply(&mut updated);

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor_id.to_string(),
                actor_type,
                auth_context: None,
                object_type: "config_change".to_string(),
                object_id: change_id.to_string(),
                action: action.to_string(),
                before: Some(serde_json::to_value(&before).unwrap_or_default()),
                after: Some(serde_json::to_value(&updated).unwrap_or_default()),
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        self.mirror(&updated).await;

        if let Err(e) = self.persist_transition(&updated).await {
            self.mirror(&before).await;
            return Err(e);
        }

        Ok(updated)
    }

    async fn approve_inner(&self, req: ApproveConfigChangeRequest) -> Result<ConfigChangeResponse, PlatformError> {
        let now = self.clock.now();
        if req.change_id.is_empty() {
            return Err(PlatformError::invalid("change_id is required"));
        }
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator])?;

        let updated = self
            .transition(&req.change_id, &actor.id, actor.actor_type, now, "approve_config_change", ConfigChangeStatus::Pending, |c| {
                c.status = ConfigChangeStatus::Approved.as_str().to_string();
                c.approved_by = Some(actor.id.clone());
            })
            .await?;

        info!(change_id = %req.change_id, "config change approved");
        Ok(ConfigChangeResponse { meta: meta_ok(&req.meta.request_id, now), change_id: updated.change_id, status: updated.status })
    }

    pub async fn approve_config_change(&self, req: ApproveConfigChangeRequest) -> ConfigChangeResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.approve_inner(req).await {
            Ok(resp) => resp,
            Err(e) => ConfigChangeResponse { meta: meta_from_error(&request_id, now, &e), change_id: String::new(), status: String::new() },
        }
    }

    async fn apply_inner(&self, req: ApplyConfigChangeRequest) -> Result<ConfigChangeResponse, PlatformError> {
        let now = self.clock.now();
        if req.change_id.is_empty() {
            return Err(PlatformError::invalid("change_id is required"));
        }
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator])?;

        let updated = self
            .transition(&req.change_id, &actor.id, actor.actor_type, now, "apply_config_change", ConfigChangeStatus::Approved, |c| {
                c.status = ConfigChangeStatus::Applied.as_str().to_string();
                c.applied_at = Some(now);
            })
            .await?;

        info!(change_id = %req.change_id, "config change applied");
        Ok(ConfigChangeResponse { meta: meta_ok(&req.meta.request_id, now), change_id: updated.change_id, status: updated.status })
    }

    pub async fn apply_config_change(&self, req: ApplyConfigChangeRequest) -> ConfigChangeResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.apply_inner(req).await {
            Ok(resp) => resp,
            Err(e) => ConfigChangeResponse { meta: meta_from_error(&request_id, now, &e), change_id: String::new(), status: String::new() },
        }
    }

    pub async fn list_config_history(&self, req: ListConfigHistoryRequest) -> ListConfigHistoryResponse {
        let now = self.clock.now();
        let page_size = if req.page_size <= 0 {
            pitboss_core::constants::DEFAULT_LIST_PAGE_SIZE
        } else {
            req.page_size.min(pitboss_core::constants::MAX_LIST_PAGE_SIZE)
        };

        if self.disable_in_memory_cache || self.pool.is_none() {
            let Some(pool) = &self.pool else {
                return ListConfigHistoryResponse { meta: meta_from_error(&req.meta.request_id, now, &PlatformError::PersistenceUnavailable), changes: vec![], next_offset: req.offset };
            };
            let rows: Result<Vec<ConfigChange>, sqlx::Error> = match &req.namespace {
                Some(ns) => {
                    sqlx::query_as(
                        "SELECT change_id, namespace, key, proposed_value, reason, status, proposed_by, approved_by, applied_at, created_at
                         FROM config_changes WHERE namespace = $1 ORDER BY created_at DESC, change_id DESC LIMIT $2 OFFSET $3",
                    )
                    .bind(ns)
                    .bind(page_size)
                    .bind(req.offset)
                    .fetch_all(pool)
                    .await
                }
                None => {
                    sqlx::query_as(
                        "SELECT change_id, namespace, key, proposed_value, reason, status, proposed_by, approved_by, applied_at, created_at
                         FROM config_changes ORDER BY created_at DESC, change_id DESC LIMIT $1 OFFSET $2",
                    )
                    .bind(page_size)
                    .bind(req.offset)
                    .fetch_all(pool)
                    .await
                }
            };
            return match rows {
                Ok(changes) => {
                    let count = changes.len() as i64;
                    ListConfigHistoryResponse { meta: meta_ok(&req.meta.request_id, now), changes, next_offset: req.offset + count }
                }
                Err(e) => ListConfigHistoryResponse { meta: meta_from_error(&req.meta.request_id, now, &e.into()), changes: vec![], next_offset: req.offset },
            };
        }

        let mirror = self.mirror.lock().await;
        let mut changes: Vec<ConfigChange> = mirror
            .values()
            .filter(|c| req.namespace.as_deref().map(|ns| ns == c.namespace).unwrap_or(true))
            .cloned()
            .collect();
        changes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.change_id.cmp(&a.change_id)));
        let total = changes.len() as i64;
        let page: Vec<ConfigChange> = changes.into_iter().skip(req.offset.max(0) as usize).take(page_size as usize).collect();
        ListConfigHistoryResponse { meta: meta_ok(&req.meta.request_id, now), changes: page, next_offset: (req.offset + page_size).min(total) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboss_core::{Actor, FixedClock, RequestMeta, ResultCode};

    fn svc() -> ConfigService {
        ConfigService::new(None, Arc::new(AuditStore::new(None, false)), Arc::new(FixedClock(chrono::Utc::now())), false)
    }

    fn op_meta() -> RequestMeta {
        RequestMeta {
            request_id: "req-1".to_string(),
            idempotency_key: String::new(),
            actor: Some(Actor { id: "op-1".to_string(), actor_type: ActorType::Operator }),
        }
    }

    #[tokio::test]
    async fn full_propose_approve_apply_workflow() {
        let svc = svc();
        let proposed = svc
            .propose_config_change(ProposeConfigChangeRequest {
                meta: op_meta(),
                namespace: "ledger".to_string(),
                key: "max_withdrawal".to_string(),
                proposed_value: serde_json::json!(500000),
                reason: Some("quarterly review".to_string()),
            })
            .await;
        assert_eq!(proposed.status, "pending");

        let approved = svc.approve_config_change(ApproveConfigChangeRequest { meta: op_meta(), change_id: proposed.change_id.clone() }).await;
        assert_eq!(approved.status, "approved");

        let applied = svc.apply_config_change(ApplyConfigChangeRequest { meta: op_meta(), change_id: proposed.change_id.clone() }).await;
        assert_eq!(applied.status, "applied");
    }

    #[tokio::test]
    async fn applying_before_approval_is_denied() {
        let svc = svc();
        let proposed = svc
            .propose_config_change(ProposeConfigChangeRequest {
                meta: op_meta(),
                namespace: "ledger".to_string(),
                key: "max_withdrawal".to_string(),
                proposed_value: serde_json::json!(500000),
                reason: None,
            })
            .await;

        let apply = svc.apply_config_change(ApplyConfigChangeRequest { meta: op_meta(), change_id: proposed.change_id }).await;
        assert_eq!(apply.meta.result_code, ResultCode::Denied);
    }
}
