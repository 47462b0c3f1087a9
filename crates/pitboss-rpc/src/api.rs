use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use pitboss_audit::{ListAuditEventsRequest, ListAuditEventsResponse, VerifyAuditChainRequest, VerifyAuditChainResponse};
use pitboss_config::{
    ApplyConfigChangeRequest, ApproveConfigChangeRequest, ConfigChangeResponse, ListConfigHistoryRequest,
    ListConfigHistoryResponse, ProposeConfigChangeRequest,
};
use pitboss_identity::{
    EndSessionRequest, EndSessionResponse, GetSessionRequest, GetSessionResponse, LoginRequest, LoginResponse,
    LogoutRequest, LogoutResponse, RefreshTokenRequest, RefreshTokenResponse, SetCredentialRequest,
    SetCredentialResponse, StartSessionRequest, StartSessionResponse,
};
use pitboss_ingestion::{
    ListEventsRequest, ListEventsResponse, ListMetersRequest, ListMetersResponse, SubmitEventResponse,
    SubmitMeterRequest, SubmitMeterResponse, SubmitSignificantEventRequest,
};
use pitboss_ledger::{
    BalanceResponse, ListTransactionsRequest, ListTransactionsResponse, MutationRequest, MutationResponse,
    TransferResponse, TransferToDeviceRequest,
};
use pitboss_registry::{
    GetEquipmentRequest, GetEquipmentResponse, ListEquipmentRequest, ListEquipmentResponse, UpsertEquipmentRequest,
    UpsertEquipmentResponse,
};
use pitboss_remoteaccess::{ListRemoteAccessActivitiesRequest, ListRemoteAccessActivitiesResponse};
use pitboss_reporting::{
    GenerateReportRequest, GenerateReportResponse, GetReportRunRequest, GetReportRunResponse, ListReportRunsRequest,
    ListReportRunsResponse,
};
use pitboss_wagering::{
    CancelWagerRequest, GetWagerRequest, ListWagersRequest, ListWagersResponse, PlaceWagerRequest, SettleWagerRequest,
    WagerResponse,
};

use crate::types::{GetBalanceRequest, GetSystemStatusRequest, GetSystemStatusResponse, GetWagerResponse};

/// The regulated cashless-gaming operator platform's JSON-RPC 2.0 API.
/// All method names are prefixed with "pitboss_" via `namespace = "pitboss"`.
#[rpc(server, namespace = "pitboss")]
pub trait PitbossApi {
    // ── Ledger (§4.2) ─────────────────────────────────────────────────────
    #[method(name = "deposit")]
    async fn deposit(&self, req: MutationRequest) -> RpcResult<MutationResponse>;

    #[method(name = "withdraw")]
    async fn withdraw(&self, req: MutationRequest) -> RpcResult<MutationResponse>;

    #[method(name = "transferToDevice")]
    async fn transfer_to_device(&self, req: TransferToDeviceRequest) -> RpcResult<TransferResponse>;

    #[method(name = "transferToAccount")]
    async fn transfer_to_account(&self, req: MutationRequest) -> RpcResult<TransferResponse>;

    #[method(name = "getBalance")]
    async fn get_balance(&self, req: GetBalanceRequest) -> RpcResult<BalanceResponse>;

    #[method(name = "listTransactions")]
    async fn list_transactions(&self, req: ListTransactionsRequest) -> RpcResult<ListTransactionsResponse>;

    // ── Wagering (§4.3) ───────────────────────────────────────────────────
    #[method(name = "placeWager")]
    async fn place_wager(&self, req: PlaceWagerRequest) -> RpcResult<WagerResponse>;

    #[method(name = "settleWager")]
    async fn settle_wager(&self, req: SettleWagerRequest) -> RpcResult<WagerResponse>;

    #[method(name = "cancelWager")]
    async fn cancel_wager(&self, req: CancelWagerRequest) -> RpcResult<WagerResponse>;

    #[method(name = "getWager")]
    async fn get_wager(&self, req: GetWagerRequest) -> RpcResult<GetWagerResponse>;

    #[method(name = "listWagers")]
    async fn list_wagers(&self, req: ListWagersRequest) -> RpcResult<ListWagersResponse>;

    // ── Identity (§4.5) ───────────────────────────────────────────────────
    #[method(name = "login")]
    async fn login(&self, req: LoginRequest) -> RpcResult<LoginResponse>;

    #[method(name = "refreshToken")]
    async fn refresh_token(&self, req: RefreshTokenRequest) -> RpcResult<RefreshTokenResponse>;

    #[method(name = "logout")]
    async fn logout(&self, req: LogoutRequest) -> RpcResult<LogoutResponse>;

    #[method(name = "setCredential")]
    async fn set_credential(&self, req: SetCredentialRequest) -> RpcResult<SetCredentialResponse>;

    // ── Registry (§4.1 supplemented, §11) ────────────────────────────────
    #[method(name = "upsertEquipment")]
    async fn upsert_equipment(&self, req: UpsertEquipmentRequest) -> RpcResult<UpsertEquipmentResponse>;

    #[method(name = "getEquipment")]
    async fn get_equipment(&self, req: GetEquipmentRequest) -> RpcResult<GetEquipmentResponse>;

    #[method(name = "listEquipment")]
    async fn list_equipment(&self, req: ListEquipmentRequest) -> RpcResult<ListEquipmentResponse>;

    // ── Events (§4.8) ─────────────────────────────────────────────────────
    #[method(name = "submitSignificantEvent")]
    async fn submit_significant_event(&self, req: SubmitSignificantEventRequest) -> RpcResult<SubmitEventResponse>;

    #[method(name = "submitMeterSnapshot")]
    async fn submit_meter_snapshot(&self, req: SubmitMeterRequest) -> RpcResult<SubmitMeterResponse>;

    #[method(name = "submitMeterDelta")]
    async fn submit_meter_delta(&self, req: SubmitMeterRequest) -> RpcResult<SubmitMeterResponse>;

    #[method(name = "listEvents")]
    async fn list_events(&self, req: ListEventsRequest) -> RpcResult<ListEventsResponse>;

    #[method(name = "listMeters")]
    async fn list_meters(&self, req: ListMetersRequest) -> RpcResult<ListMetersResponse>;

    // ── Config (§4.7) ─────────────────────────────────────────────────────
    #[method(name = "proposeConfigChange")]
    async fn propose_config_change(&self, req: ProposeConfigChangeRequest) -> RpcResult<ConfigChangeResponse>;

    #[method(name = "approveConfigChange")]
    async fn approve_config_change(&self, req: ApproveConfigChangeRequest) -> RpcResult<ConfigChangeResponse>;

    #[method(name = "applyConfigChange")]
    async fn apply_config_change(&self, req: ApplyConfigChangeRequest) -> RpcResult<ConfigChangeResponse>;

    #[method(name = "listConfigHistory")]
    async fn list_config_history(&self, req: ListConfigHistoryRequest) -> RpcResult<ListConfigHistoryResponse>;

    // ── Reporting (§4.9, §11) ─────────────────────────────────────────────
    #[method(name = "generateReport")]
    async fn generate_report(&self, req: GenerateReportRequest) -> RpcResult<GenerateReportResponse>;

    #[method(name = "listReportRuns")]
    async fn list_report_runs(&self, req: ListReportRunsRequest) -> RpcResult<ListReportRunsResponse>;

    #[method(name = "getReportRun")]
    async fn get_report_run(&self, req: GetReportRunRequest) -> RpcResult<GetReportRunResponse>;

    // ── Audit (§4.4) ──────────────────────────────────────────────────────
    #[method(name = "listAuditEvents")]
    async fn list_audit_events(&self, req: ListAuditEventsRequest) -> RpcResult<ListAuditEventsResponse>;

    #[method(name = "listRemoteAccessActivities")]
    async fn list_remote_access_activities(
        &self,
        req: ListRemoteAccessActivitiesRequest,
    ) -> RpcResult<ListRemoteAccessActivitiesResponse>;

    #[method(name = "verifyAuditChain")]
    async fn verify_audit_chain(&self, req: VerifyAuditChainRequest) -> RpcResult<VerifyAuditChainResponse>;

    // ── Sessions (§11) ────────────────────────────────────────────────────
    #[method(name = "startSession")]
    async fn start_session(&self, req: StartSessionRequest) -> RpcResult<StartSessionResponse>;

    #[method(name = "getSession")]
    async fn get_session(&self, req: GetSessionRequest) -> RpcResult<GetSessionResponse>;

    #[method(name = "endSession")]
    async fn end_session(&self, req: EndSessionRequest) -> RpcResult<EndSessionResponse>;

    // ── System (§11) ──────────────────────────────────────────────────────
    #[method(name = "getSystemStatus")]
    async fn get_system_status(&self, req: GetSystemStatusRequest) -> RpcResult<GetSystemStatusResponse>;
}
