//! HTTP/JSON gateway (§6): one POST route per RPC method, each accepting
//! and returning the same typed request/response pair as its JSON-RPC 2.0
//! sibling in [`crate::api`] — response status is always 200; the
//! application outcome rides in `meta.result_code` exactly as it does over
//! JSON-RPC. The wire-level translation itself (content negotiation,
//! per-field HTTP binding annotations) is a named external collaborator
//! per §1; this module supplies the concrete axum routes that stand it up.
//!
//! Administrative paths (`/v1/config`, `/v1/reporting`, `/v1/audit`) are
//! wrapped by [`pitboss_remoteaccess::remote_access_layer`] at the router
//! level so the guard admission-controls them uniformly regardless of
//! which handler eventually runs (§4.6).

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use pitboss_ingestion::MeterKind;
use pitboss_remoteaccess::{remote_access_layer, RemoteAccessGuard};

use crate::server::RpcServerState;
use crate::types::{GetBalanceRequest, GetSystemStatusRequest, GetSystemStatusResponse, GetWagerResponse};

type S = Arc<RpcServerState>;

async fn deposit(State(s): State<S>, Json(req): Json<pitboss_ledger::MutationRequest>) -> Json<pitboss_ledger::MutationResponse> {
    Json(s.ledger.deposit(req).await)
}

async fn withdraw(State(s): State<S>, Json(req): Json<pitboss_ledger::MutationRequest>) -> Json<pitboss_ledger::MutationResponse> {
    Json(s.ledger.withdraw(req).await)
}

async fn transfer_to_device(
    State(s): State<S>,
    Json(req): Json<pitboss_ledger::TransferToDeviceRequest>,
) -> Json<pitboss_ledger::TransferResponse> {
    Json(s.ledger.transfer_to_device(req).await)
}

async fn transfer_to_account(
    State(s): State<S>,
    Json(req): Json<pitboss_ledger::MutationRequest>,
) -> Json<pitboss_ledger::TransferResponse> {
    let requested = req.amount.amount_minor;
    let resp = s.ledger.transfer_to_account(req).await;
    let succeeded = matches!(resp.meta.result_code, pitboss_core::ResultCode::Ok);
    Json(pitboss_ledger::TransferResponse {
        meta: resp.meta,
        tx_id: resp.tx_id,
        transfer_id: String::new(),
        transfer_status: if succeeded { "COMPLETED".to_string() } else { "DENIED".to_string() },
        transferred_minor: if succeeded { requested } else { 0 },
        available_minor: resp.available_minor,
        unresolved_reason: None,
    })
}

async fn get_balance(State(s): State<S>, Json(req): Json<GetBalanceRequest>) -> Json<pitboss_ledger::BalanceResponse> {
    use pitboss_core::PlatformError;
    use pitboss_envelope::{meta_from_error, resolve_actor};

    let now = s.clock.now();
    let result: Result<_, PlatformError> = async {
        let actor = resolve_actor(None, req.meta.actor.as_ref())?;
        s.ledger.get_balance(&actor, &req.account_id).await
    }
    .await;

    Json(result.unwrap_or_else(|e| pitboss_ledger::BalanceResponse {
        meta: meta_from_error(&req.meta.request_id, now, &e),
        available_minor: 0,
        pending_minor: 0,
        currency: String::new(),
    }))
}

async fn list_transactions(
    State(s): State<S>,
    Json(req): Json<pitboss_ledger::ListTransactionsRequest>,
) -> Json<pitboss_ledger::ListTransactionsResponse> {
    use pitboss_envelope::meta_from_error;

    let now = s.clock.now();
    let request_id = req.meta.request_id.clone();
    let offset = req.offset;
    Json(s.ledger.list_transactions(req).await.unwrap_or_else(|e| pitboss_ledger::ListTransactionsResponse {
        meta: meta_from_error(&request_id, now, &e),
        transactions: vec![],
        next_offset: offset,
    }))
}

async fn place_wager(
    State(s): State<S>,
    Json(req): Json<pitboss_wagering::PlaceWagerRequest>,
) -> Json<pitboss_wagering::WagerResponse> {
    Json(s.wagering.place_wager(req).await)
}

async fn settle_wager(
    State(s): State<S>,
    Json(req): Json<pitboss_wagering::SettleWagerRequest>,
) -> Json<pitboss_wagering::WagerResponse> {
    Json(s.wagering.settle_wager(req).await)
}

async fn cancel_wager(
    State(s): State<S>,
    Json(req): Json<pitboss_wagering::CancelWagerRequest>,
) -> Json<pitboss_wagering::WagerResponse> {
    Json(s.wagering.cancel_wager(req).await)
}

async fn get_wager(State(s): State<S>, Json(req): Json<pitboss_wagering::GetWagerRequest>) -> Json<GetWagerResponse> {
    use pitboss_envelope::{meta_from_error, meta_ok};

    let now = s.clock.now();
    let request_id = req.meta.request_id.clone();
    Json(match s.wagering.get_wager(req).await {
        Ok(wager) => GetWagerResponse { meta: meta_ok(&request_id, now), wager },
        Err(e) => GetWagerResponse { meta: meta_from_error(&request_id, now, &e), wager: None },
    })
}

async fn list_wagers(
    State(s): State<S>,
    Json(req): Json<pitboss_wagering::ListWagersRequest>,
) -> Json<pitboss_wagering::ListWagersResponse> {
    use pitboss_envelope::meta_from_error;

    let now = s.clock.now();
    let request_id = req.meta.request_id.clone();
    let offset = req.offset;
    Json(s.wagering.list_wagers(req).await.unwrap_or_else(|e| pitboss_wagering::ListWagersResponse {
        meta: meta_from_error(&request_id, now, &e),
        wagers: vec![],
        next_offset: offset,
    }))
}

async fn login(State(s): State<S>, Json(req): Json<pitboss_identity::LoginRequest>) -> Json<pitboss_identity::LoginResponse> {
    Json(s.identity.login(req).await)
}

async fn refresh_token(
    State(s): State<S>,
    Json(req): Json<pitboss_identity::RefreshTokenRequest>,
) -> Json<pitboss_identity::RefreshTokenResponse> {
    Json(s.identity.refresh_token(req).await)
}

async fn logout(State(s): State<S>, Json(req): Json<pitboss_identity::LogoutRequest>) -> Json<pitboss_identity::LogoutResponse> {
    Json(s.identity.logout(req).await)
}

async fn set_credential(
    State(s): State<S>,
    Json(req): Json<pitboss_identity::SetCredentialRequest>,
) -> Json<pitboss_identity::SetCredentialResponse> {
    Json(s.identity.set_credential(req).await)
}

async fn upsert_equipment(
    State(s): State<S>,
    Json(req): Json<pitboss_registry::UpsertEquipmentRequest>,
) -> Json<pitboss_registry::UpsertEquipmentResponse> {
    Json(s.registry.upsert_equipment(req).await)
}

async fn get_equipment(
    State(s): State<S>,
    Json(req): Json<pitboss_registry::GetEquipmentRequest>,
) -> Json<pitboss_registry::GetEquipmentResponse> {
    Json(s.registry.get_equipment(req).await)
}

async fn list_equipment(
    State(s): State<S>,
    Json(req): Json<pitboss_registry::ListEquipmentRequest>,
) -> Json<pitboss_registry::ListEquipmentResponse> {
    Json(s.registry.list_equipment(req).await)
}

async fn submit_significant_event(
    State(s): State<S>,
    Json(req): Json<pitboss_ingestion::SubmitSignificantEventRequest>,
) -> Json<pitboss_ingestion::SubmitEventResponse> {
    Json(s.ingestion.submit_significant_event(req).await)
}

async fn submit_meter_snapshot(
    State(s): State<S>,
    Json(mut req): Json<pitboss_ingestion::SubmitMeterRequest>,
) -> Json<pitboss_ingestion::SubmitMeterResponse> {
    req.kind = MeterKind::Snapshot;
    Json(s.ingestion.submit_meter(req).await)
}

async fn submit_meter_delta(
    State(s): State<S>,
    Json(mut req): Json<pitboss_ingestion::SubmitMeterRequest>,
) -> Json<pitboss_ingestion::SubmitMeterResponse> {
    req.kind = MeterKind::Delta;
    Json(s.ingestion.submit_meter(req).await)
}

async fn list_events(
    State(s): State<S>,
    Json(req): Json<pitboss_ingestion::ListEventsRequest>,
) -> Json<pitboss_ingestion::ListEventsResponse> {
    Json(s.ingestion.list_events(req).await)
}

async fn list_meters(
    State(s): State<S>,
    Json(req): Json<pitboss_ingestion::ListMetersRequest>,
) -> Json<pitboss_ingestion::ListMetersResponse> {
    Json(s.ingestion.list_meters(req).await)
}

async fn propose_config_change(
    State(s): State<S>,
    Json(req): Json<pitboss_config::ProposeConfigChangeRequest>,
) -> Json<pitboss_config::ConfigChangeResponse> {
    Json(s.config.propose_config_change(req).await)
}

async fn approve_config_change(
    State(s): State<S>,
    Json(req): Json<pitboss_config::ApproveConfigChangeRequest>,
) -> Json<pitboss_config::ConfigChangeResponse> {
    Json(s.config.approve_config_change(req).await)
}

async fn apply_config_change(
    State(s): State<S>,
    Json(req): Json<pitboss_config::ApplyConfigChangeRequest>,
) -> Json<pitboss_config::ConfigChangeResponse> {
    Json(s.config.apply_config_change(req).await)
}

async fn list_config_history(
    State(s): State<S>,
    Json(req): Json<pitboss_config::ListConfigHistoryRequest>,
) -> Json<pitboss_config::ListConfigHistoryResponse> {
    Json(s.config.list_config_history(req).await)
}

async fn generate_report(
    State(s): State<S>,
    Json(req): Json<pitboss_reporting::GenerateReportRequest>,
) -> Json<pitboss_reporting::GenerateReportResponse> {
    Json(s.reporting.generate_report(req).await)
}

async fn list_report_runs(
    State(s): State<S>,
    Json(req): Json<pitboss_reporting::ListReportRunsRequest>,
) -> Json<pitboss_reporting::ListReportRunsResponse> {
    Json(s.reporting.list_report_runs(req).await)
}

async fn get_report_run(
    State(s): State<S>,
    Json(req): Json<pitboss_reporting::GetReportRunRequest>,
) -> Json<pitboss_reporting::GetReportRunResponse> {
    Json(s.reporting.get_report_run(req).await)
}

async fn list_audit_events(
    State(s): State<S>,
    Json(req): Json<pitboss_audit::ListAuditEventsRequest>,
) -> Json<pitboss_audit::ListAuditEventsResponse> {
    Json(pitboss_audit::list_audit_events(&s.audit, &s.clock, req).await)
}

async fn list_remote_access_activities(
    State(s): State<S>,
    Json(req): Json<pitboss_remoteaccess::ListRemoteAccessActivitiesRequest>,
) -> Json<pitboss_remoteaccess::ListRemoteAccessActivitiesResponse> {
    Json(pitboss_remoteaccess::list_remote_access_activities(&s.remote_access, &s.clock, s.remote_access_fail_closed, req).await)
}

async fn verify_audit_chain(
    State(s): State<S>,
    Json(req): Json<pitboss_audit::VerifyAuditChainRequest>,
) -> Json<pitboss_audit::VerifyAuditChainResponse> {
    Json(pitboss_audit::verify_audit_chain(&s.audit, &s.clock, req).await)
}

async fn start_session(
    State(s): State<S>,
    Json(req): Json<pitboss_identity::StartSessionRequest>,
) -> Json<pitboss_identity::StartSessionResponse> {
    Json(s.sessions.start_session(req).await)
}

async fn get_session(
    State(s): State<S>,
    Json(req): Json<pitboss_identity::GetSessionRequest>,
) -> Json<pitboss_identity::GetSessionResponse> {
    Json(s.sessions.get_session(req).await)
}

async fn end_session(
    State(s): State<S>,
    Json(req): Json<pitboss_identity::EndSessionRequest>,
) -> Json<pitboss_identity::EndSessionResponse> {
    Json(s.sessions.end_session(req).await)
}

async fn get_system_status(State(s): State<S>, Json(req): Json<GetSystemStatusRequest>) -> Json<GetSystemStatusResponse> {
    use pitboss_envelope::meta_ok;

    let now = s.clock.now();
    let persistence_connected = match &s.pool {
        Some(pool) => pitboss_persistence::is_connected(pool).await,
        None => false,
    };
    let ingestion_enabled = s.ingestion.is_enabled().await;

    Json(GetSystemStatusResponse {
        meta: meta_ok(&req.meta.request_id, now),
        server_time: now,
        persistence_connected,
        ingestion_enabled,
        component_versions: s.component_versions.clone(),
    })
}

/// Builds the full HTTP/JSON gateway router, with the remote-access guard
/// layered over every route (it no-ops on non-administrative paths; see
/// [`pitboss_remoteaccess::guard`]).
pub fn build_router(state: Arc<RpcServerState>, guard: Arc<RemoteAccessGuard>) -> Router {
    let cors = CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_headers(Any);

    Router::new()
        .route("/v1/ledger/deposit", post(deposit))
        .route("/v1/ledger/withdraw", post(withdraw))
        .route("/v1/ledger/transferToDevice", post(transfer_to_device))
        .route("/v1/ledger/transferToAccount", post(transfer_to_account))
        .route("/v1/ledger/getBalance", post(get_balance))
        .route("/v1/ledger/listTransactions", post(list_transactions))
        .route("/v1/wagering/placeWager", post(place_wager))
        .route("/v1/wagering/settleWager", post(settle_wager))
        .route("/v1/wagering/cancelWager", post(cancel_wager))
        .route("/v1/wagering/getWager", post(get_wager))
        .route("/v1/wagering/listWagers", post(list_wagers))
        .route("/v1/identity/login", post(login))
        .route("/v1/identity/refreshToken", post(refresh_token))
        .route("/v1/identity/logout", post(logout))
        .route("/v1/identity/setCredential", post(set_credential))
        .route("/v1/registry/upsertEquipment", post(upsert_equipment))
        .route("/v1/registry/getEquipment", post(get_equipment))
        .route("/v1/registry/listEquipment", post(list_equipment))
        .route("/v1/events/submitSignificantEvent", post(submit_significant_event))
        .route("/v1/events/submitMeterSnapshot", post(submit_meter_snapshot))
        .route("/v1/events/submitMeterDelta", post(submit_meter_delta))
        .route("/v1/events/listEvents", post(list_events))
        .route("/v1/events/listMeters", post(list_meters))
        .route("/v1/sessions/startSession", post(start_session))
        .route("/v1/sessions/getSession", post(get_session))
        .route("/v1/sessions/endSession", post(end_session))
        .route("/v1/system/getSystemStatus", post(get_system_status))
        // Administrative prefixes (§4.6) — gated by the remote-access guard.
        .route("/v1/config/propose", post(propose_config_change))
        .route("/v1/config/approve", post(approve_config_change))
        .route("/v1/config/apply", post(apply_config_change))
        .route("/v1/config/history", post(list_config_history))
        .route("/v1/reporting/generate", post(generate_report))
        .route("/v1/reporting/runs", post(list_report_runs))
        .route("/v1/reporting/run", post(get_report_run))
        .route("/v1/audit/events", post(list_audit_events))
        .route("/v1/audit/remoteAccess", post(list_remote_access_activities))
        .route("/v1/audit/verify", post(verify_audit_chain))
        .layer(middleware::from_fn_with_state(guard, remote_access_layer))
        .layer(cors)
        .with_state(state)
}
