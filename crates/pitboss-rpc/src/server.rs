use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use pitboss_audit::{list_audit_events, verify_audit_chain, AuditStore};
use pitboss_config::ConfigService;
use pitboss_core::{Clock, PlatformError};
use pitboss_envelope::{meta_from_error, meta_ok, resolve_actor};
use pitboss_identity::{IdentityService, UserSessionService};
use pitboss_ingestion::{IngestionService, MeterKind};
use pitboss_ledger::{BalanceResponse, LedgerService};
use pitboss_registry::RegistryService;
use pitboss_remoteaccess::{list_remote_access_activities, RemoteAccessStore};
use pitboss_reporting::ReportingService;
use pitboss_wagering::{ListWagersResponse, WageringService};

use crate::api::PitbossApiServer;
use crate::types::{GetBalanceRequest, GetSystemStatusRequest, GetSystemStatusResponse, GetWagerResponse};

/// Everything a running node hands to the RPC layer. One `Arc` of each
/// component service, shared with the HTTP gateway in [`crate::gateway`]
/// (§2's "every RPC enters through the envelope" data flow applies
/// identically on both transports).
pub struct RpcServerState {
    pub ledger: Arc<LedgerService>,
    pub wagering: Arc<WageringService>,
    pub identity: Arc<IdentityService>,
    pub sessions: Arc<UserSessionService>,
    pub registry: Arc<RegistryService>,
    pub ingestion: Arc<IngestionService>,
    pub config: Arc<ConfigService>,
    pub reporting: Arc<ReportingService>,
    pub audit: Arc<AuditStore>,
    pub remote_access: Arc<RemoteAccessStore>,
    pub remote_access_fail_closed: bool,
    pub clock: Arc<dyn Clock>,
    pub pool: Option<PgPool>,
    pub component_versions: BTreeMap<String, String>,
}

/// The regulated cashless-gaming platform's JSON-RPC 2.0 server.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Starts the JSON-RPC server on `addr` with permissive CORS. Returns a
    /// handle the caller keeps alive for the server's lifetime.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let cors = CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_headers(Any);

        let server = Server::builder()
            .set_http_middleware(tower::ServiceBuilder::new().layer(cors))
            .build(addr)
            .await?;

        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "RPC server started");
        Ok(handle)
    }
}

#[async_trait]
impl PitbossApiServer for RpcServer {
    // ── Ledger (§4.2) ─────────────────────────────────────────────────────
    async fn deposit(&self, req: pitboss_ledger::MutationRequest) -> RpcResult<pitboss_ledger::MutationResponse> {
        Ok(self.state.ledger.deposit(req).await)
    }

    async fn withdraw(&self, req: pitboss_ledger::MutationRequest) -> RpcResult<pitboss_ledger::MutationResponse> {
        Ok(self.state.ledger.withdraw(req).await)
    }

    async fn transfer_to_device(
        &self,
        req: pitboss_ledger::TransferToDeviceRequest,
    ) -> RpcResult<pitboss_ledger::TransferResponse> {
        Ok(self.state.ledger.transfer_to_device(req).await)
    }

    async fn transfer_to_account(&self, req: pitboss_ledger::MutationRequest) -> RpcResult<pitboss_ledger::TransferResponse> {
        // `TransferToAccount` carries no partial-transfer semantics (only
        // `TransferToDevice` does, per §4.2) — the ledger service returns a
        // plain `MutationResponse`; this adapts it onto the wire's uniform
        // `TransferResponse` shape so both transfer directions read alike.
        let requested = req.amount.amount_minor;
        let meta_resp = self.state.ledger.transfer_to_account(req).await;
        let succeeded = matches!(meta_resp.meta.result_code, pitboss_core::ResultCode::Ok);
        Ok(pitboss_ledger::TransferResponse {
            meta: meta_resp.meta,
            tx_id: meta_resp.tx_id,
            transfer_id: String::new(),
            transfer_status: if succeeded { "COMPLETED".to_string() } else { "DENIED".to_string() },
            transferred_minor: if succeeded { requested } else { 0 },
            available_minor: meta_resp.available_minor,
            unresolved_reason: None,
        })
    }

    async fn get_balance(&self, req: GetBalanceRequest) -> RpcResult<BalanceResponse> {
        let now = self.state.clock.now();
        let result = async {
            let actor = resolve_actor(None, req.meta.actor.as_ref())?;
            self.state.ledger.get_balance(&actor, &req.account_id).await
        }
        .await;

        Ok(match result {
            Ok(resp) => resp,
            Err(e) => BalanceResponse {
                meta: meta_from_error(&req.meta.request_id, now, &e),
                available_minor: 0,
                pending_minor: 0,
                currency: String::new(),
            },
        })
    }

    async fn list_transactions(
        &self,
        req: pitboss_ledger::ListTransactionsRequest,
    ) -> RpcResult<pitboss_ledger::ListTransactionsResponse> {
        let now = self.state.clock.now();
        let request_id = req.meta.request_id.clone();
        let offset = req.offset;
        Ok(match self.state.ledger.list_transactions(req).await {
            Ok(resp) => resp,
            Err(e) => pitboss_ledger::ListTransactionsResponse {
                meta: meta_from_error(&request_id, now, &e),
                transactions: vec![],
                next_offset: offset,
            },
        })
    }

    // ── Wagering (§4.3) ───────────────────────────────────────────────────
    async fn place_wager(&self, req: pitboss_wagering::PlaceWagerRequest) -> RpcResult<pitboss_wagering::WagerResponse> {
        Ok(self.state.wagering.place_wager(req).await)
    }

    async fn settle_wager(&self, req: pitboss_wagering::SettleWagerRequest) -> RpcResult<pitboss_wagering::WagerResponse> {
        Ok(self.state.wagering.settle_wager(req).await)
    }

    async fn cancel_wager(&self, req: pitboss_wagering::CancelWagerRequest) -> RpcResult<pitboss_wagering::WagerResponse> {
        Ok(self.state.wagering.cancel_wager(req).await)
    }

    async fn get_wager(&self, req: pitboss_wagering::GetWagerRequest) -> RpcResult<GetWagerResponse> {
        let now = self.state.clock.now();
        let request_id = req.meta.request_id.clone();
        Ok(match self.state.wagering.get_wager(req).await {
            Ok(wager) => GetWagerResponse { meta: meta_ok(&request_id, now), wager },
            Err(e) => GetWagerResponse { meta: meta_from_error(&request_id, now, &e), wager: None },
        })
    }

    async fn list_wagers(&self, req: pitboss_wagering::ListWagersRequest) -> RpcResult<ListWagersResponse> {
        let now = self.state.clock.now();
        let request_id = req.meta.request_id.clone();
        let offset = req.offset;
        Ok(match self.state.wagering.list_wagers(req).await {
            Ok(resp) => resp,
            Err(e) => ListWagersResponse { meta: meta_from_error(&request_id, now, &e), wagers: vec![], next_offset: offset },
        })
    }

    // ── Identity (§4.5) ───────────────────────────────────────────────────
    async fn login(&self, req: pitboss_identity::LoginRequest) -> RpcResult<pitboss_identity::LoginResponse> {
        Ok(self.state.identity.login(req).await)
    }

    async fn refresh_token(
        &self,
        req: pitboss_identity::RefreshTokenRequest,
    ) -> RpcResult<pitboss_identity::RefreshTokenResponse> {
        Ok(self.state.identity.refresh_token(req).await)
    }

    async fn logout(&self, req: pitboss_identity::LogoutRequest) -> RpcResult<pitboss_identity::LogoutResponse> {
        Ok(self.state.identity.logout(req).await)
    }

    async fn set_credential(
        &self,
        req: pitboss_identity::SetCredentialRequest,
    ) -> RpcResult<pitboss_identity::SetCredentialResponse> {
        Ok(self.state.identity.set_credential(req).await)
    }

    // ── Registry (§4.1 supplemented, §11) ────────────────────────────────
    async fn upsert_equipment(
        &self,
        req: pitboss_registry::UpsertEquipmentRequest,
    ) -> RpcResult<pitboss_registry::UpsertEquipmentResponse> {
        Ok(self.state.registry.upsert_equipment(req).await)
    }

    async fn get_equipment(
        &self,
        req: pitboss_registry::GetEquipmentRequest,
    ) -> RpcResult<pitboss_registry::GetEquipmentResponse> {
        Ok(self.state.registry.get_equipment(req).await)
    }

    async fn list_equipment(
        &self,
        req: pitboss_registry::ListEquipmentRequest,
    ) -> RpcResult<pitboss_registry::ListEquipmentResponse> {
        Ok(self.state.registry.list_equipment(req).await)
    }

    // ── Events (§4.8) ─────────────────────────────────────────────────────
    async fn submit_significant_event(
        &self,
        req: pitboss_ingestion::SubmitSignificantEventRequest,
    ) -> RpcResult<pitboss_ingestion::SubmitEventResponse> {
        Ok(self.state.ingestion.submit_significant_event(req).await)
    }

    async fn submit_meter_snapshot(
        &self,
        mut req: pitboss_ingestion::SubmitMeterRequest,
    ) -> RpcResult<pitboss_ingestion::SubmitMeterResponse> {
        req.kind = MeterKind::Snapshot;
        Ok(self.state.ingestion.submit_meter(req).await)
    }

    async fn submit_meter_delta(
        &self,
        mut req: pitboss_ingestion::SubmitMeterRequest,
    ) -> RpcResult<pitboss_ingestion::SubmitMeterResponse> {
        req.kind = MeterKind::Delta;
        Ok(self.state.ingestion.submit_meter(req).await)
    }

    async fn list_events(&self, req: pitboss_ingestion::ListEventsRequest) -> RpcResult<pitboss_ingestion::ListEventsResponse> {
        Ok(self.state.ingestion.list_events(req).await)
    }

    async fn list_meters(&self, req: pitboss_ingestion::ListMetersRequest) -> RpcResult<pitboss_ingestion::ListMetersResponse> {
        Ok(self.state.ingestion.list_meters(req).await)
    }

    // ── Config (§4.7) ─────────────────────────────────────────────────────
    async fn propose_config_change(
        &self,
        req: pitboss_config::ProposeConfigChangeRequest,
    ) -> RpcResult<pitboss_config::ConfigChangeResponse> {
        Ok(self.state.config.propose_config_change(req).await)
    }

    async fn approve_config_change(
        &self,
        req: pitboss_config::ApproveConfigChangeRequest,
    ) -> RpcResult<pitboss_config::ConfigChangeResponse> {
        Ok(self.state.config.approve_config_change(req).await)
    }

    async fn apply_config_change(
        &self,
        req: pitboss_config::ApplyConfigChangeRequest,
    ) -> RpcResult<pitboss_config::ConfigChangeResponse> {
        Ok(self.state.config.apply_config_change(req).await)
    }

    async fn list_config_history(
        &self,
        req: pitboss_config::ListConfigHistoryRequest,
    ) -> RpcResult<pitboss_config::ListConfigHistoryResponse> {
        Ok(self.state.config.list_config_history(req).await)
    }

    // ── Reporting (§4.9, §11) ─────────────────────────────────────────────
    async fn generate_report(
        &self,
        req: pitboss_reporting::GenerateReportRequest,
    ) -> RpcResult<pitboss_reporting::GenerateReportResponse> {
        Ok(self.state.reporting.generate_report(req).await)
    }

    async fn list_report_runs(
        &self,
        req: pitboss_reporting::ListReportRunsRequest,
    ) -> RpcResult<pitboss_reporting::ListReportRunsResponse> {
        Ok(self.state.reporting.list_report_runs(req).await)
    }

    async fn get_report_run(
        &self,
        req: pitboss_reporting::GetReportRunRequest,
    ) -> RpcResult<pitboss_reporting::GetReportRunResponse> {
        Ok(self.state.reporting.get_report_run(req).await)
    }

    // ── Audit (§4.4) ──────────────────────────────────────────────────────
    async fn list_audit_events(
        &self,
        req: pitboss_audit::ListAuditEventsRequest,
    ) -> RpcResult<pitboss_audit::ListAuditEventsResponse> {
        Ok(list_audit_events(&self.state.audit, &self.state.clock, req).await)
    }

    async fn list_remote_access_activities(
        &self,
        req: pitboss_remoteaccess::ListRemoteAccessActivitiesRequest,
    ) -> RpcResult<pitboss_remoteaccess::ListRemoteAccessActivitiesResponse> {
        Ok(list_remote_access_activities(
            &self.state.remote_access,
            &self.state.clock,
            self.state.remote_access_fail_closed,
            req,
        )
        .await)
    }

    async fn verify_audit_chain(
        &self,
        req: pitboss_audit::VerifyAuditChainRequest,
    ) -> RpcResult<pitboss_audit::VerifyAuditChainResponse> {
        Ok(verify_audit_chain(&self.state.audit, &self.state.clock, req).await)
    }

    // ── Sessions (§11) ────────────────────────────────────────────────────
    async fn start_session(
        &self,
        req: pitboss_identity::StartSessionRequest,
    ) -> RpcResult<pitboss_identity::StartSessionResponse> {
        Ok(self.state.sessions.start_session(req).await)
    }

    async fn get_session(&self, req: pitboss_identity::GetSessionRequest) -> RpcResult<pitboss_identity::GetSessionResponse> {
        Ok(self.state.sessions.get_session(req).await)
    }

    async fn end_session(&self, req: pitboss_identity::EndSessionRequest) -> RpcResult<pitboss_identity::EndSessionResponse> {
        Ok(self.state.sessions.end_session(req).await)
    }

    // ── System (§11) ──────────────────────────────────────────────────────
    async fn get_system_status(&self, req: GetSystemStatusRequest) -> RpcResult<GetSystemStatusResponse> {
        let now = self.state.clock.now();
        let persistence_connected = match &self.state.pool {
            Some(pool) => pitboss_persistence::is_connected(pool).await,
            None => false,
        };
        let ingestion_enabled = self.state.ingestion.is_enabled().await;

        Ok(GetSystemStatusResponse {
            meta: meta_ok(&req.meta.request_id, now),
            server_time: now,
            persistence_connected,
            ingestion_enabled,
            component_versions: self.state.component_versions.clone(),
        })
    }
}

impl From<PlatformError> for jsonrpsee::types::ErrorObjectOwned {
    fn from(e: PlatformError) -> Self {
        jsonrpsee::types::ErrorObjectOwned::owned(-32000, e.reason(), None::<()>)
    }
}
