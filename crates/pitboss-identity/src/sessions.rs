use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::Mutex;

use pitboss_core::types::{new_session_id, Timestamp};
use pitboss_core::{Clock, PlatformError, RequestMeta, ResponseMeta};
use pitboss_envelope::{meta_from_error, meta_ok, resolve_actor};

/// A generic caller session (§11), distinct from the refresh-token-backed
/// `IdentitySession` used by `Login`/`RefreshToken` — this is the
/// `StartSession`/`GetSession`/`EndSession` bookkeeping surface, backed by
/// `user_sessions`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSession {
    pub session_id: String,
    pub actor_id: String,
    pub actor_type: String,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub last_seen_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub meta: RequestMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub meta: ResponseMeta,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSessionRequest {
    pub meta: RequestMeta,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSessionResponse {
    pub meta: ResponseMeta,
    pub session: Option<UserSession>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndSessionRequest {
    pub meta: RequestMeta,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndSessionResponse {
    pub meta: ResponseMeta,
}

pub struct UserSessionService {
    pool: Option<PgPool>,
    mirror: Mutex<HashMap<String, UserSession>>,
    clock: Arc<dyn Clock>,
    disable_in_memory_cache: bool,
}

impl UserSessionService {
    pub fn new(pool: Option<PgPool>, clock: Arc<dyn Clock>, disable_in_memory_cache: bool) -> Self {
        Self { pool, mirror: Mutex::new(HashMap::new()), clock, disable_in_memory_cache }
    }

    async fn load(&self, session_id: &str) -> Result<Option<UserSession>, PlatformError> {
        if !self.disable_in_memory_cache {
            if let Some(s) = self.mirror.lock().await.get(session_id) {
                return Ok(Some(s.clone()));
            }
        }
        let Some(pool) = &self.pool else {
            return if self.disable_in_memory_cache { Err(PlatformError::PersistenceUnavailable) } else { Ok(None) };
        };
        let row: Option<UserSession> = sqlx::query_as(
            "SELECT session_id, actor_id, actor_type, started_at, ended_at, last_seen_at FROM user_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    async fn persist_insert(&self, s: &UserSession) -> Result<(), PlatformError> {
        let Some(pool) = &self.pool else { return Ok(()) };
        sqlx::query(
            "INSERT INTO user_sessions (session_id, actor_id, actor_type, started_at, ended_at, last_seen_at) VALUES ($1,$2,$3,$4,$5,$6) ON CONFLICT (session_id) DO NOTHING",
        )
        .bind(&s.session_id)
        .bind(&s.actor_id)
        .bind(&s.actor_type)
        .bind(s.started_at)
        .bind(s.ended_at)
        .bind(s.last_seen_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn persist_end(&self, s: &UserSession) -> Result<(), PlatformError> {
        let Some(pool) = &self.pool else { return Ok(()) };
        sqlx::query("UPDATE user_sessions SET ended_at = $1, last_seen_at = $1 WHERE session_id = $2")
            .bind(s.ended_at)
            .bind(&s.session_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    async fn start_inner(&self, req: StartSessionRequest) -> Result<StartSessionResponse, PlatformError> {
        let now = self.clock.now();
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;

        let session = UserSession {
            session_id: new_session_id(),
            actor_id: actor.id,
            actor_type: actor.actor_type.as_wire().to_string(),
            started_at: now,
            ended_at: None,
            last_seen_at: now,
        };

        if !self.disable_in_memory_cache {
            self.mirror.lock().await.insert(session.session_id.clone(), session.clone());
        }

        if let Err(e) = self.persist_insert(&session).await {
            self.mirror.lock().await.remove(&session.session_id);
            return Err(e);
        }

        Ok(StartSessionResponse { meta: meta_ok(&req.meta.request_id, now), session_id: session.session_id })
    }

    pub async fn start_session(&self, req: StartSessionRequest) -> StartSessionResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.start_inner(req).await {
            Ok(resp) => resp,
            Err(e) => StartSessionResponse { meta: meta_from_error(&request_id, now, &e), session_id: String::new() },
        }
    }

    pub async fn get_session(&self, req: GetSessionRequest) -> GetSessionResponse {
        let now = self.clock.now();
        match self.load(&req.session_id).await {
            Ok(session) => GetSessionResponse { meta: meta_ok(&req.meta.request_id, now), session },
            Err(e) => GetSessionResponse { meta: meta_from_error(&req.meta.request_id, now, &e), session: None },
        }
    }

    async fn end_inner(&self, req: EndSessionRequest) -> Result<(), PlatformError> {
        let now = self.clock.now();
        let Some(mut session) = self.load(&req.session_id).await? else {
            // Ending a session that never existed is treated the same as
            // ending an already-ended one: an idempotent no-op success.
            return Ok(());
        };

        if session.ended_at.is_some() {
            return Ok(());
        }

        session.ended_at = Some(now);
        session.last_seen_at = now;

        if !self.disable_in_memory_cache {
            self.mirror.lock().await.insert(session.session_id.clone(), session.clone());
        }

        self.persist_end(&session).await
    }

    pub async fn end_session(&self, req: EndSessionRequest) -> EndSessionResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.end_inner(req).await {
            Ok(()) => EndSessionResponse { meta: meta_ok(&request_id, now) },
            Err(e) => EndSessionResponse { meta: meta_from_error(&request_id, now, &e) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboss_core::{Actor, ActorType, FixedClock};

    fn svc() -> UserSessionService {
        UserSessionService::new(None, Arc::new(FixedClock(chrono::Utc::now())), false)
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            request_id: "req-1".to_string(),
            idempotency_key: String::new(),
            actor: Some(Actor { id: "op-1".to_string(), actor_type: ActorType::Operator }),
        }
    }

    #[tokio::test]
    async fn start_get_end_round_trips() {
        let svc = svc();
        let started = svc.start_session(StartSessionRequest { meta: meta() }).await;
        assert!(!started.session_id.is_empty());

        let fetched = svc.get_session(GetSessionRequest { meta: meta(), session_id: started.session_id.clone() }).await;
        assert!(fetched.session.is_some());

        svc.end_session(EndSessionRequest { meta: meta(), session_id: started.session_id.clone() }).await;
        let after_end = svc.get_session(GetSessionRequest { meta: meta(), session_id: started.session_id.clone() }).await;
        assert!(after_end.session.unwrap().ended_at.is_some());
    }

    #[tokio::test]
    async fn ending_already_ended_session_is_idempotent() {
        let svc = svc();
        let started = svc.start_session(StartSessionRequest { meta: meta() }).await;
        let first = svc.end_session(EndSessionRequest { meta: meta(), session_id: started.session_id.clone() }).await;
        let second = svc.end_session(EndSessionRequest { meta: meta(), session_id: started.session_id.clone() }).await;
        assert_eq!(first.meta.result_code, second.meta.result_code);
    }
}
