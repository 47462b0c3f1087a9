use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::info;

use pitboss_audit::{AuditEventInput, AuditResult, AuditStore};
use pitboss_core::constants::{DEFAULT_LIST_PAGE_SIZE, MAX_LIST_PAGE_SIZE};
use pitboss_core::types::new_run_id;
use pitboss_core::{ActorType, Clock, PlatformError};
use pitboss_envelope::{meta_from_error, meta_ok, require_actor_type, resolve_actor};

use crate::model::ReportRun;
use crate::requests::{
    GenerateReportRequest, GenerateReportResponse, GetReportRunRequest, GetReportRunResponse, ListReportRunsRequest,
    ListReportRunsResponse,
};

/// Manages the lifecycle record of a report run (§4.9, §11). The
/// aggregation the run describes is an external collaborator and out of
/// scope here; this crate only tracks PENDING → COMPLETE.
pub struct ReportingService {
    pool: Option<PgPool>,
    mirror: Mutex<HashMap<String, ReportRun>>,
    audit: Arc<AuditStore>,
    clock: Arc<dyn Clock>,
    disable_in_memory_cache: bool,
}

impl ReportingService {
    pub fn new(pool: Option<PgPool>, audit: Arc<AuditStore>, clock: Arc<dyn Clock>, disable_in_memory_cache: bool) -> Self {
        Self { pool, mirror: Mutex::new(HashMap::new()), audit, clock, disable_in_memory_cache }
    }

    async fn persist_insert(&self, run: &ReportRun) -> Result<(), PlatformError> {
        let Some(pool) = &self.pool else {
            return if self.disable_in_memory_cache { Err(PlatformError::PersistenceUnavailable) } else { Ok(()) };
        };
        sqlx::query(
            r#"INSERT INTO report_runs (run_id, kind, params, status, created_at, completed_at)
               VALUES ($1,$2,$3,$4,$5,$6)
               ON CONFLICT (run_id) DO NOTHING"#,
        )
        .bind(&run.run_id)
        .bind(&run.kind)
        .bind(&run.params)
        .bind(&run.status)
        .bind(run.created_at)
        .bind(run.completed_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn generate_report_inner(&self, req: GenerateReportRequest) -> Result<GenerateReportResponse, PlatformError> {
        let now = self.clock.now();
        if req.kind.is_empty() {
            return Err(PlatformError::invalid("kind is required"));
        }

        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;

        // Synchronous: aggregation is external and out of scope, so the run
        // record transitions straight to its terminal state.
        let run = ReportRun {
            run_id: new_run_id(),
            kind: req.kind.clone(),
            params: req.params.clone(),
            status: "complete".to_string(),
            created_at: now,
            completed_at: Some(now),
        };

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type,
                auth_context: None,
                object_type: "report_run".to_string(),
                object_id: run.run_id.clone(),
                action: "generate_report".to_string(),
                before: None,
                after: Some(serde_json::to_value(&run).unwrap_or_default()),
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        self.persist_insert(&run).await?;

        // Mirror insert happens exactly once, after the persistence write
        // succeeds — no pre-insert-then-rollback-on-failure here.
        if !self.disable_in_memory_cache {
            self.mirror.lock().await.insert(run.run_id.clone(), run.clone());
        }

        info!(run_id = %run.run_id, kind = %run.kind, "report run generated");
        Ok(GenerateReportResponse { meta: meta_ok(&req.meta.request_id, now), run_id: run.run_id, status: run.status })
    }

    pub async fn generate_report(&self, req: GenerateReportRequest) -> GenerateReportResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.generate_report_inner(req).await {
            Ok(resp) => resp,
            Err(e) => GenerateReportResponse { meta: meta_from_error(&request_id, now, &e), run_id: String::new(), status: String::new() },
        }
    }

    pub async fn get_report_run(&self, req: GetReportRunRequest) -> GetReportRunResponse {
        let now = self.clock.now();
        if !self.disable_in_memory_cache {
            if let Some(run) = self.mirror.lock().await.get(&req.run_id) {
                return GetReportRunResponse { meta: meta_ok(&req.meta.request_id, now), run: Some(run.clone()) };
            }
        }
        let Some(pool) = &self.pool else {
            return if self.disable_in_memory_cache {
                GetReportRunResponse { meta: meta_from_error(&req.meta.request_id, now, &PlatformError::PersistenceUnavailable), run: None }
            } else {
                GetReportRunResponse { meta: meta_ok(&req.meta.request_id, now), run: None }
            };
        };
        match sqlx::query_as::<_, ReportRun>(
            "SELECT run_id, kind, params, status, created_at, completed_at FROM report_runs WHERE run_id = $1",
        )
        .bind(&req.run_id)
        .fetch_optional(pool)
        .await
        {
            Ok(run) => GetReportRunResponse { meta: meta_ok(&req.meta.request_id, now), run },
            Err(e) => GetReportRunResponse { meta: meta_from_error(&req.meta.request_id, now, &e.into()), run: None },
        }
    }

    pub async fn list_report_runs(&self, req: ListReportRunsRequest) -> ListReportRunsResponse {
        let now = self.clock.now();
        let page_size = if req.page_size <= 0 { DEFAULT_LIST_PAGE_SIZE } else { req.page_size.min(MAX_LIST_PAGE_SIZE) };

        if self.disable_in_memory_cache || self.pool.is_none() {
            let Some(pool) = &self.pool else {
                return ListReportRunsResponse { meta: meta_from_error(&req.meta.request_id, now, &PlatformError::PersistenceUnavailable), runs: vec![], next_offset: req.offset };
            };
            return match sqlx::query_as::<_, ReportRun>(
                "SELECT run_id, kind, params, status, created_at, completed_at FROM report_runs ORDER BY created_at DESC, run_id DESC LIMIT $1 OFFSET $2",
            )
            .bind(page_size)
            .bind(req.offset)
            .fetch_all(pool)
            .await
            {
                Ok(runs) => {
                    let count = runs.len() as i64;
                    ListReportRunsResponse { meta: meta_ok(&req.meta.request_id, now), runs, next_offset: req.offset + count }
                }
                Err(e) => ListReportRunsResponse { meta: meta_from_error(&req.meta.request_id, now, &e.into()), runs: vec![], next_offset: req.offset },
            };
        }

        let mirror = self.mirror.lock().await;
        let mut runs: Vec<ReportRun> = mirror.values().cloned().collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.run_id.cmp(&a.run_id)));
        let total = runs.len() as i64;
        let page: Vec<ReportRun> = runs.into_iter().skip(req.offset.max(0) as usize).take(page_size as usize).collect();
        ListReportRunsResponse { meta: meta_ok(&req.meta.request_id, now), runs: page, next_offset: (req.offset + page_size).min(total) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboss_core::{Actor, FixedClock, RequestMeta};

    fn svc() -> ReportingService {
        ReportingService::new(None, Arc::new(AuditStore::new(None, false)), Arc::new(FixedClock(chrono::Utc::now())), false)
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            request_id: "req-1".to_string(),
            idempotency_key: String::new(),
            actor: Some(Actor { id: "op-1".to_string(), actor_type: ActorType::Operator }),
        }
    }

    #[tokio::test]
    async fn generate_then_get_round_trips() {
        let svc = svc();
        let generated = svc
            .generate_report(GenerateReportRequest { meta: meta(), kind: "daily_handle".to_string(), params: serde_json::json!({}) })
            .await;
        assert_eq!(generated.status, "complete");

        let fetched = svc.get_report_run(GetReportRunRequest { meta: meta(), run_id: generated.run_id.clone() }).await;
        assert!(fetched.run.is_some());
        assert_eq!(fetched.run.unwrap().run_id, generated.run_id);
    }

    #[tokio::test]
    async fn list_report_runs_is_newest_first() {
        let svc = svc();
        let first = svc
            .generate_report(GenerateReportRequest { meta: meta(), kind: "a".to_string(), params: serde_json::json!({}) })
            .await;
        let second = svc
            .generate_report(GenerateReportRequest { meta: meta(), kind: "b".to_string(), params: serde_json::json!({}) })
            .await;

        let listed = svc.list_report_runs(ListReportRunsRequest { meta: meta(), page_size: 10, offset: 0 }).await;
        let ids: Vec<String> = listed.runs.iter().map(|r| r.run_id.clone()).collect();
        assert!(ids.contains(&first.run_id) && ids.contains(&second.run_id));
    }
}
