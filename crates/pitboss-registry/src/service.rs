use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::info;

use pitboss_audit::{AuditEventInput, AuditResult, AuditStore};
use pitboss_core::{ActorType, Clock, PlatformError};
use pitboss_envelope::{meta_from_error, meta_ok, require_actor_type, resolve_actor};

use crate::model::Equipment;
use crate::requests::{
    GetEquipmentRequest, GetEquipmentResponse, ListEquipmentRequest, ListEquipmentResponse,
    UpsertEquipmentRequest, UpsertEquipmentResponse,
};

/// Equipment registry (§4's supplemented §11): insert-or-update rows keyed
/// by `equipment_id`, OPERATOR/SERVICE only. No idempotency key is required
/// — the upsert is itself idempotent by primary key.
pub struct RegistryService {
    pool: Option<PgPool>,
    mirror: Mutex<HashMap<String, Equipment>>,
    audit: Arc<AuditStore>,
    clock: Arc<dyn Clock>,
    disable_in_memory_cache: bool,
}

impl RegistryService {
    pub fn new(pool: Option<PgPool>, audit: Arc<AuditStore>, clock: Arc<dyn Clock>, disable_in_memory_cache: bool) -> Self {
        Self { pool, mirror: Mutex::new(HashMap::new()), audit, clock, disable_in_memory_cache }
    }

    async fn load(&self, equipment_id: &str) -> Result<Option<Equipment>, PlatformError> {
        if !self.disable_in_memory_cache {
            if let Some(e) = self.mirror.lock().await.get(equipment_id) {
                return Ok(Some(e.clone()));
            }
        }
        if let Some(pool) = &self.pool {
            let row: Option<Equipment> = sqlx::query_as(
                r#"SELECT equipment_id, location, status, theoretical_rtp_bps, attributes, created_at, updated_at
                   FROM equipment_registry WHERE equipment_id = $1"#,
            )
            .bind(equipment_id)
            .fetch_optional(pool)
            .await?;
            Ok(row)
        } else if self.disable_in_memory_cache {
            Err(PlatformError::PersistenceUnavailable)
        } else {
            Ok(None)
        }
    }

    async fn persist(&self, e: &Equipment) -> Result<(), PlatformError> {
        let Some(pool) = &self.pool else { return Ok(()) };
        sqlx::query(
            r#"INSERT INTO equipment_registry
                 (equipment_id, location, status, theoretical_rtp_bps, attributes, created_at, updated_at)
               VALUES ($1,$2,$3,$4,$5,$6,$7)
               ON CONFLICT (equipment_id) DO UPDATE
                 SET location = EXCLUDED.location, status = EXCLUDED.status,
                     theoretical_rtp_bps = EXCLUDED.theoretical_rtp_bps,
                     attributes = EXCLUDED.attributes, updated_at = EXCLUDED.updated_at"#,
        )
        .bind(&e.equipment_id)
        .bind(&e.location)
        .bind(&e.status)
        .bind(e.theoretical_rtp_bps)
        .bind(&e.attributes)
        .bind(e.created_at)
        .bind(e.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn mirror(&self, e: &Equipment) {
        if !self.disable_in_memory_cache {
            self.mirror.lock().await.insert(e.equipment_id.clone(), e.clone());
        }
    }

    async fn upsert_inner(&self, req: UpsertEquipmentRequest) -> Result<UpsertEquipmentResponse, PlatformError> {
        let now = self.clock.now();

        if req.equipment_id.is_empty() || req.location.is_empty() {
            return Err(PlatformError::invalid("equipment_id and location are required"));
        }

        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;

        let before = self.load(&req.equipment_id).await?;
        let created_at = before.as_ref().map(|b| b.created_at).unwrap_or(now);

        let updated = Equipment {
            equipment_id: req.equipment_id.clone(),
            location: req.location.clone(),
            status: req.status.as_wire().to_string(),
            theoretical_rtp_bps: req.theoretical_rtp_bps,
            attributes: req.attributes.clone(),
            created_at,
            updated_at: now,
        };

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type,
                auth_context: None,
                object_type: "equipment".to_string(),
                object_id: req.equipment_id.clone(),
                action: "upsert_equipment".to_string(),
                before: before.as_ref().map(|b| serde_json::to_value(b).unwrap_or_default()),
                after: Some(serde_json::to_value(&updated).unwrap_or_default()),
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        self.mirror(&updated).await;

        if let Err(e) = self.persist(&updated).await {
            if let Some(b) = before {
                self.mirror(&b).await;
            }
            return Err(e);
        }

        info!(equipment_id = %req.equipment_id, status = %updated.status, "equipment upserted");
        Ok(UpsertEquipmentResponse { meta: meta_ok(&req.meta.request_id, now) })
    }

    pub async fn upsert_equipment(&self, req: UpsertEquipmentRequest) -> UpsertEquipmentResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.upsert_inner(req).await {
            Ok(resp) => resp,
            Err(e) => UpsertEquipmentResponse { meta: meta_from_error(&request_id, now, &e) },
        }
    }

    async fn get_inner(&self, req: GetEquipmentRequest) -> Result<GetEquipmentResponse, PlatformError> {
        let now = self.clock.now();
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;
        let equipment = self.load(&req.equipment_id).await?;
        Ok(GetEquipmentResponse { meta: meta_ok(&req.meta.request_id, now), equipment })
    }

    pub async fn get_equipment(&self, req: GetEquipmentRequest) -> GetEquipmentResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.get_inner(req).await {
            Ok(resp) => resp,
            Err(e) => GetEquipmentResponse { meta: meta_from_error(&request_id, now, &e), equipment: None },
        }
    }

    async fn list_inner(&self, req: ListEquipmentRequest) -> Result<ListEquipmentResponse, PlatformError> {
        let now = self.clock.now();
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;

        let Some(pool) = &self.pool else {
            let mirror = self.mirror.lock().await;
            let mut rows: Vec<Equipment> = mirror.values().cloned().collect();
            if let Some(status) = &req.status_filter {
                rows.retain(|e| e.status() == *status);
            }
            rows.sort_by(|a, b| a.equipment_id.cmp(&b.equipment_id));
            return Ok(ListEquipmentResponse { meta: meta_ok(&req.meta.request_id, now), equipment: rows });
        };

        let rows: Vec<Equipment> = match &req.status_filter {
            Some(status) => {
                sqlx::query_as(
                    r#"SELECT equipment_id, location, status, theoretical_rtp_bps, attributes, created_at, updated_at
                       FROM equipment_registry WHERE status = $1 ORDER BY equipment_id ASC"#,
                )
                .bind(status.as_wire())
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"SELECT equipment_id, location, status, theoretical_rtp_bps, attributes, created_at, updated_at
                       FROM equipment_registry ORDER BY equipment_id ASC"#,
                )
                .fetch_all(pool)
                .await?
            }
        };

        Ok(ListEquipmentResponse { meta: meta_ok(&req.meta.request_id, now), equipment: rows })
    }

    pub async fn list_equipment(&self, req: ListEquipmentRequest) -> ListEquipmentResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.list_inner(req).await {
            Ok(resp) => resp,
            Err(e) => ListEquipmentResponse { meta: meta_from_error(&request_id, now, &e), equipment: vec![] },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboss_core::{Actor, FixedClock, RequestMeta, ResultCode};

    fn svc() -> RegistryService {
        RegistryService::new(None, Arc::new(AuditStore::new(None, false)), Arc::new(FixedClock(chrono::Utc::now())), false)
    }

    fn op_meta() -> RequestMeta {
        RequestMeta {
            request_id: "req-1".to_string(),
            idempotency_key: String::new(),
            actor: Some(Actor { id: "op-1".to_string(), actor_type: ActorType::Operator }),
        }
    }

    fn player_meta() -> RequestMeta {
        RequestMeta {
            request_id: "req-2".to_string(),
            idempotency_key: String::new(),
            actor: Some(Actor { id: "player-1".to_string(), actor_type: ActorType::Player }),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let svc = svc();
        let upsert = svc
            .upsert_equipment(UpsertEquipmentRequest {
                meta: op_meta(),
                equipment_id: "slot-1".to_string(),
                location: "floor-a".to_string(),
                status: crate::model::EquipmentStatus::Active,
                theoretical_rtp_bps: Some(9500),
                attributes: serde_json::json!({}),
            })
            .await;
        assert_eq!(upsert.meta.result_code, ResultCode::Ok);

        let got = svc.get_equipment(GetEquipmentRequest { meta: op_meta(), equipment_id: "slot-1".to_string() }).await;
        assert!(got.equipment.is_some());
        assert_eq!(got.equipment.unwrap().location, "floor-a");
    }

    #[tokio::test]
    async fn player_actor_is_denied_on_all_operations() {
        let svc = svc();
        let resp = svc
            .upsert_equipment(UpsertEquipmentRequest {
                meta: player_meta(),
                equipment_id: "slot-1".to_string(),
                location: "floor-a".to_string(),
                status: crate::model::EquipmentStatus::Active,
                theoretical_rtp_bps: None,
                attributes: serde_json::json!({}),
            })
            .await;
        assert_eq!(resp.meta.result_code, ResultCode::Denied);

        let list = svc.list_equipment(ListEquipmentRequest { meta: player_meta(), status_filter: None }).await;
        assert_eq!(list.meta.result_code, ResultCode::Denied);
    }
}
