use std::sync::Arc;

use chrono::Duration;
use sqlx::PgPool;
use tracing::info;

use pitboss_audit::{AuditEventInput, AuditResult, AuditStore};
use pitboss_core::constants::{ACCESS_TOKEN_TTL_MINUTES, LOCKOUT_DURATION_MINUTES, LOCKOUT_THRESHOLD, REFRESH_TOKEN_TTL_HOURS};
use pitboss_core::types::new_refresh_token;
use pitboss_core::{ActorType, Clock, PlatformError};
use pitboss_crypto::{hash_credential, verify_credential, AccessTokenSigner};
use pitboss_envelope::{meta_from_error, meta_ok, require_actor_type, resolve_actor};

use crate::model::{CredentialStatus, IdentityCredential, IdentityLockout, IdentitySession};
use crate::requests::{
    LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, RefreshTokenRequest, RefreshTokenResponse,
    SetCredentialRequest, SetCredentialResponse,
};
use crate::store::{CredentialStore, LockoutStore, SessionStore};

/// Tunable lockout/token lifetimes. Defaults per §4.5; overridable from the
/// node's configuration.
#[derive(Debug, Clone, Copy)]
pub struct IdentityConfig {
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_hours: i64,
    pub lockout_threshold: u32,
    pub lockout_duration_minutes: i64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_minutes: ACCESS_TOKEN_TTL_MINUTES,
            refresh_token_ttl_hours: REFRESH_TOKEN_TTL_HOURS,
            lockout_threshold: LOCKOUT_THRESHOLD,
            lockout_duration_minutes: LOCKOUT_DURATION_MINUTES,
        }
    }
}

/// Credential verification, lockout, and access/refresh-token lifecycle
/// (§4.5). Neither credential checks nor lockout counters are serialized
/// under a single service-wide mutex — each row is keyed by (actor_id,
/// actor_type) and the stores perform their own upsert, matching the
/// teacher's per-key row locking rather than a single coarse lock.
pub struct IdentityService {
    credentials: CredentialStore,
    lockouts: LockoutStore,
    sessions: SessionStore,
    audit: Arc<AuditStore>,
    clock: Arc<dyn Clock>,
    signer: Arc<AccessTokenSigner>,
    config: IdentityConfig,
}

impl IdentityService {
    pub fn new(
        pool: Option<PgPool>,
        audit: Arc<AuditStore>,
        clock: Arc<dyn Clock>,
        signer: Arc<AccessTokenSigner>,
        config: IdentityConfig,
    ) -> Self {
        Self {
            credentials: CredentialStore::new(pool.clone()),
            lockouts: LockoutStore::new(pool.clone()),
            sessions: SessionStore::new(pool),
            audit,
            clock,
            signer,
            config,
        }
    }

    async fn record_failure(&self, actor_id: &str, actor_type: &str, now: chrono::DateTime<chrono::Utc>) -> Result<(), PlatformError> {
        let mut lockout = self.lockouts.get(actor_id, actor_type).await?;
        lockout.failed_attempts += 1;
        if lockout.failed_attempts as u32 >= self.config.lockout_threshold {
            lockout.locked_until = Some(now + Duration::minutes(self.config.lockout_duration_minutes));
        }
        self.lockouts.put(&lockout).await
    }

    async fn reset_lockout(&self, actor_id: &str, actor_type: &str) -> Result<(), PlatformError> {
        self.lockouts
            .put(&IdentityLockout::fresh(actor_id, actor_type))
            .await
    }

    async fn login_inner(&self, req: LoginRequest) -> Result<LoginResponse, PlatformError> {
        let now = self.clock.now();
        let actor_type_wire = req.actor_type.as_wire();

        if req.actor_id.is_empty() || req.actor_type == ActorType::Unspecified {
            return Err(PlatformError::invalid("actor is required"));
        }

        let lockout = self.lockouts.get(&req.actor_id, actor_type_wire).await?;
        if lockout.is_locked(now) {
            self.audit
                .append(AuditEventInput {
                    occurred_at: now,
                    actor_id: req.actor_id.clone(),
                    actor_type: req.actor_type,
                    auth_context: None,
                    object_type: "identity_session".to_string(),
                    object_id: req.actor_id.clone(),
                    action: "login".to_string(),
                    before: None,
                    after: None,
                    result: AuditResult::Denied,
                    reason: Some("account locked".to_string()),
                })
                .await
                .ok();
            return Err(PlatformError::denied("account locked"));
        }

        let credential = self.credentials.get(&req.actor_id, actor_type_wire).await?;
        let verified = match &credential {
            Some(c) if c.status() == CredentialStatus::Active => verify_credential(&req.credential, &c.credential_hash),
            _ => false,
        };

        if !verified {
            self.record_failure(&req.actor_id, actor_type_wire, now).await?;
            self.audit
                .append(AuditEventInput {
                    occurred_at: now,
                    actor_id: req.actor_id.clone(),
                    actor_type: req.actor_type,
                    auth_context: None,
                    object_type: "identity_session".to_string(),
                    object_id: req.actor_id.clone(),
                    action: "login".to_string(),
                    before: None,
                    after: None,
                    result: AuditResult::Denied,
                    reason: Some("invalid credentials".to_string()),
                })
                .await
                .ok();
            return Err(PlatformError::denied("invalid credentials"));
        }

        self.reset_lockout(&req.actor_id, actor_type_wire).await?;

        let access_token = self
            .signer
            .mint(&req.actor_id, req.actor_type, now, self.config.access_token_ttl_minutes)
            .map_err(|e| PlatformError::Internal(format!("token mint failed: {e}")))?;
        let refresh_token = new_refresh_token();
        let session = IdentitySession {
            refresh_token: refresh_token.clone(),
            actor_id: req.actor_id.clone(),
            actor_type: actor_type_wire.to_string(),
            expires_at: now + Duration::hours(self.config.refresh_token_ttl_hours),
            revoked: false,
        };

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: req.actor_id.clone(),
                actor_type: req.actor_type,
                auth_context: None,
                object_type: "identity_session".to_string(),
                object_id: req.actor_id.clone(),
                action: "login".to_string(),
                before: None,
                after: Some(serde_json::json!({"actor_id": req.actor_id, "actor_type": actor_type_wire})),
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        self.sessions.insert_new(&session).await?;

        info!(actor_id = %req.actor_id, "login succeeded");
        Ok(LoginResponse { meta: meta_ok(&req.meta.request_id, now), access_token, refresh_token })
    }

    pub async fn login(&self, req: LoginRequest) -> LoginResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.login_inner(req).await {
            Ok(resp) => resp,
            Err(e) => LoginResponse { meta: meta_from_error(&request_id, now, &e), access_token: String::new(), refresh_token: String::new() },
        }
    }

    async fn refresh_inner(&self, req: RefreshTokenRequest) -> Result<RefreshTokenResponse, PlatformError> {
        let now = self.clock.now();
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;

        let session = self
            .sessions
            .get(&req.refresh_token)
            .await?
            .ok_or_else(|| PlatformError::denied("invalid refresh token"))?;

        if session.revoked || session.expires_at <= now {
            return Err(PlatformError::denied("invalid refresh token"));
        }
        if session.actor_id != actor.id || session.actor_type != actor.actor_type.as_wire() {
            return Err(PlatformError::denied("actor mismatch"));
        }

        let access_token = self
            .signer
            .mint(&actor.id, actor.actor_type, now, self.config.access_token_ttl_minutes)
            .map_err(|e| PlatformError::Internal(format!("token mint failed: {e}")))?;
        let new_refresh = new_refresh_token();
        let new_session = IdentitySession {
            refresh_token: new_refresh.clone(),
            actor_id: actor.id.clone(),
            actor_type: actor.actor_type.as_wire().to_string(),
            expires_at: now + Duration::hours(self.config.refresh_token_ttl_hours),
            revoked: false,
        };

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type,
                auth_context: None,
                object_type: "identity_session".to_string(),
                object_id: actor.id.clone(),
                action: "refresh_token".to_string(),
                before: None,
                after: None,
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        self.sessions.rotate(&req.refresh_token, &new_session).await?;

        info!(actor_id = %actor.id, "refresh token rotated");
        Ok(RefreshTokenResponse { meta: meta_ok(&req.meta.request_id, now), access_token, refresh_token: new_refresh })
    }

    pub async fn refresh_token(&self, req: RefreshTokenRequest) -> RefreshTokenResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.refresh_inner(req).await {
            Ok(resp) => resp,
            Err(e) => RefreshTokenResponse { meta: meta_from_error(&request_id, now, &e), access_token: String::new(), refresh_token: String::new() },
        }
    }

    async fn logout_inner(&self, req: LogoutRequest) -> Result<LogoutResponse, PlatformError> {
        let now = self.clock.now();
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;

        self.sessions.revoke_token(&req.refresh_token).await?;

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type,
                auth_context: None,
                object_type: "identity_session".to_string(),
                object_id: actor.id.clone(),
                action: "logout".to_string(),
                before: None,
                after: None,
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        Ok(LogoutResponse { meta: meta_ok(&req.meta.request_id, now) })
    }

    pub async fn logout(&self, req: LogoutRequest) -> LogoutResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.logout_inner(req).await {
            Ok(resp) => resp,
            Err(e) => LogoutResponse { meta: meta_from_error(&request_id, now, &e) },
        }
    }

    async fn set_credential_inner(&self, req: SetCredentialRequest) -> Result<SetCredentialResponse, PlatformError> {
        let now = self.clock.now();
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        require_actor_type(&actor, &[ActorType::Operator, ActorType::Service])?;

        if req.actor_id.is_empty() || req.actor_type == ActorType::Unspecified || req.new_credential.is_empty() {
            return Err(PlatformError::invalid("actor and new_credential are required"));
        }

        let hash = hash_credential(&req.new_credential)
            .map_err(|e| PlatformError::Internal(format!("credential hash failed: {e}")))?;
        let record = IdentityCredential {
            actor_id: req.actor_id.clone(),
            actor_type: req.actor_type.as_wire().to_string(),
            credential_hash: hash,
            status: CredentialStatus::Active.as_str().to_string(),
            updated_at: now,
        };

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type,
                auth_context: None,
                object_type: "identity_credential".to_string(),
                object_id: req.actor_id.clone(),
                action: "set_credential".to_string(),
                before: None,
                after: Some(serde_json::json!({"actor_id": req.actor_id, "actor_type": req.actor_type.as_wire()})),
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        self.credentials.put(&record).await?;

        Ok(SetCredentialResponse { meta: meta_ok(&req.meta.request_id, now) })
    }

    pub async fn set_credential(&self, req: SetCredentialRequest) -> SetCredentialResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.set_credential_inner(req).await {
            Ok(resp) => resp,
            Err(e) => SetCredentialResponse { meta: meta_from_error(&request_id, now, &e) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboss_core::{Actor, FixedClock, RequestMeta};

    fn service() -> IdentityService {
        IdentityService::new(
            None,
            Arc::new(AuditStore::new(None, false)),
            Arc::new(FixedClock(chrono::Utc::now())),
            Arc::new(AccessTokenSigner::new(b"test-secret")),
            IdentityConfig::default(),
        )
    }

    fn meta(actor_id: &str, actor_type: ActorType) -> RequestMeta {
        RequestMeta { request_id: "req-1".to_string(), idempotency_key: String::new(), actor: Some(Actor { id: actor_id.to_string(), actor_type }) }
    }

    #[tokio::test]
    async fn login_with_wrong_credential_is_denied() {
        let svc = service();
        svc.set_credential(SetCredentialRequest {
            meta: meta("op-1", ActorType::Operator),
            actor_id: "player-1".to_string(),
            actor_type: ActorType::Player,
            new_credential: "correct-horse".to_string(),
        })
        .await;

        let resp = svc
            .login(LoginRequest {
                meta: RequestMeta { request_id: "req-2".to_string(), idempotency_key: String::new(), actor: None },
                actor_id: "player-1".to_string(),
                actor_type: ActorType::Player,
                credential: "wrong".to_string(),
            })
            .await;
        assert_eq!(resp.meta.result_code, pitboss_core::ResultCode::Denied);
    }

    #[tokio::test]
    async fn refresh_rotation_invalidates_old_token() {
        let svc = service();
        svc.set_credential(SetCredentialRequest {
            meta: meta("op-1", ActorType::Operator),
            actor_id: "player-1".to_string(),
            actor_type: ActorType::Player,
            new_credential: "correct-horse".to_string(),
        })
        .await;

        let login = svc
            .login(LoginRequest {
                meta: RequestMeta { request_id: "req-2".to_string(), idempotency_key: String::new(), actor: None },
                actor_id: "player-1".to_string(),
                actor_type: ActorType::Player,
                credential: "correct-horse".to_string(),
            })
            .await;
        assert_eq!(login.meta.result_code, pitboss_core::ResultCode::Ok);

        let refreshed = svc
            .refresh_token(RefreshTokenRequest { meta: meta("player-1", ActorType::Player), refresh_token: login.refresh_token.clone() })
            .await;
        assert_eq!(refreshed.meta.result_code, pitboss_core::ResultCode::Ok);
        assert_ne!(refreshed.refresh_token, login.refresh_token);

        let replay = svc
            .refresh_token(RefreshTokenRequest { meta: meta("player-1", ActorType::Player), refresh_token: login.refresh_token })
            .await;
        assert_eq!(replay.meta.result_code, pitboss_core::ResultCode::Denied);
    }
}
