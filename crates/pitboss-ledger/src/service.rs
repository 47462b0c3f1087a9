use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::info;

use pitboss_audit::{AuditEventInput, AuditResult, AuditStore};
use pitboss_core::constants::{
    DEFAULT_LIST_PAGE_SIZE, DEVICE_ESCROW_ACCOUNT, DEVICE_ESCROW_PREFIX, MAX_LIST_PAGE_SIZE,
    OPERATOR_LIABILITY_ACCOUNT,
};
use pitboss_core::types::Timestamp;
use pitboss_core::{Actor, ActorType, Clock, Money, PlatformError, ResultCode};
use pitboss_envelope::{admit, commit, meta_from_error, meta_ok, resolve_actor, Admission};

use crate::idempotency::LedgerIdempotencyStore;
use crate::model::{Direction, LedgerAccount, LedgerTransaction, Posting, TransactionType, TransferStatus};
use crate::requests::{
    requesting_actor, transfer_status_response, BalanceResponse, ListTransactionsRequest,
    ListTransactionsResponse, MutationRequest, MutationResponse, TransferResponse,
    TransferToDeviceRequest,
};

/// The double-entry ledger (§4.2). All mutating operations are serialized
/// under `accounts` — the single per-service mutex — for the duration of
/// their write critical section, matching §5's concurrency model.
pub struct LedgerService {
    pool: Option<PgPool>,
    accounts: Mutex<HashMap<String, LedgerAccount>>,
    idempotency: LedgerIdempotencyStore,
    audit: Arc<AuditStore>,
    clock: Arc<dyn Clock>,
    disable_in_memory_cache: bool,
    idempotency_ttl_hours: i64,
}

enum MutationKind {
    Deposit,
    Withdraw,
    TransferToAccount,
}

impl LedgerService {
    pub fn new(
        pool: Option<PgPool>,
        audit: Arc<AuditStore>,
        clock: Arc<dyn Clock>,
        disable_in_memory_cache: bool,
        idempotency_ttl_hours: i64,
    ) -> Self {
        Self {
            idempotency: LedgerIdempotencyStore::new(pool.clone()),
            pool,
            accounts: Mutex::new(HashMap::new()),
            audit,
            clock,
            disable_in_memory_cache,
            idempotency_ttl_hours,
        }
    }

    fn scope_for(op: &str, account_id: &str) -> String {
        format!("{account_id}|{op}")
    }

    async fn load_account(&self, id: &str) -> Result<Option<LedgerAccount>, PlatformError> {
        if !self.disable_in_memory_cache {
            if let Some(acc) = self.accounts.lock().await.get(id) {
                return Ok(Some(acc.clone()));
            }
        }
        if let Some(pool) = &self.pool {
            let row: Option<LedgerAccount> = sqlx::query_as(
                "SELECT id, account_type, currency, available_minor, pending_minor, status FROM ledger_accounts WHERE id = $1",
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

    /// Resolves an account, lazily creating it against `currency` on first
    /// reference (§3). Does not check currency agreement — callers do that.
    async fn get_or_create_account(&self, id: &str, currency: &str) -> Result<LedgerAccount, PlatformError> {
        if let Some(acc) = self.load_account(id).await? {
            return Ok(acc);
        }
        let created = LedgerAccount::new_lazy(id, currency);
        if let Some(pool) = &self.pool {
            sqlx::query(
                "INSERT INTO ledger_accounts (id, account_type, currency, available_minor, pending_minor, status)
                 VALUES ($1,$2,$3,0,0,'active') ON CONFLICT (id) DO NOTHING",
            )
            .bind(&created.id)
            .bind(&created.account_type_raw)
            .bind(&created.currency)
            .execute(pool)
            .await?;
        }
        if !self.disable_in_memory_cache {
            self.accounts.lock().await.insert(id.to_string(), created.clone());
        }
        Ok(created)
    }

    /// Player actors may only operate on (or list) the account matching
    /// their own id; operator/service actors are authorized on any account.
    fn authorize_account_access(actor: &Actor, account_id: &str) -> Result<(), PlatformError> {
        match actor.actor_type {
            ActorType::Player if actor.id != account_id => {
                Err(PlatformError::denied("player actor must match account"))
            }
            ActorType::Player | ActorType::Operator | ActorType::Service => Ok(()),
            ActorType::Unspecified => Err(PlatformError::denied("unauthorized actor type")),
        }
    }

    async fn persist_mutation(
        &self,
        tx: &LedgerTransaction,
        postings: &[Posting],
        updated_account: &LedgerAccount,
    ) -> Result<(), PlatformError> {
        let Some(pool) = &self.pool else { return Ok(()) };
        let mut db_tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO ledger_transactions
               (tx_id, account_id, tx_type, amount_minor, currency, occurred_at, authorization_id, description, transfer_id, transfer_status)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
             ON CONFLICT (tx_id) DO NOTHING",
        )
        .bind(&tx.tx_id)
        .bind(&tx.account_id)
        .bind(&tx.tx_type)
        .bind(tx.amount_minor)
        .bind(&tx.currency)
        .bind(tx.occurred_at)
        .bind(&tx.authorization_id)
        .bind(&tx.description)
        .bind(&tx.transfer_id)
        .bind(&tx.transfer_status)
        .execute(&mut *db_tx)
        .await?;

        for p in postings {
            sqlx::query(
                "INSERT INTO ledger_postings (tx_id, account_id, direction, amount_minor, currency, created_at)
                 VALUES ($1,$2,$3,$4,$5,$6)",
            )
            .bind(&p.tx_id)
            .bind(&p.account_id)
            .bind(p.direction.as_str())
            .bind(p.amount_minor)
            .bind(&p.currency)
            .bind(p.created_at)
            .execute(&mut *db_tx)
            .await?;
        }

        sqlx::query("UPDATE ledger_accounts SET available_minor = $1, updated_at = now() WHERE id = $2")
            .bind(updated_account.available_minor)
            .bind(&updated_account.id)
            .execute(&mut *db_tx)
            .await?;

        db_tx.commit().await?;
        Ok(())
    }

    /// Shared engine for Deposit / Withdraw / TransferToAccount: the three
    /// operations whose postings are a single account vs. a single
    /// well-known counterparty, with no partial-transfer behavior.
    #[allow(clippy::too_many_lines)]
    async fn mutate(
        &self,
        req: MutationRequest,
        kind: MutationKind,
        required_types: &[ActorType],
    ) -> Result<MutationResponse, PlatformError> {
        let now = self.clock.now();

        if !req.amount.is_valid_for_mutation() {
            return Err(PlatformError::invalid("amount and currency are required"));
        }
        if req.meta.idempotency_key.is_empty() {
            return Err(PlatformError::invalid("idempotency_key is required"));
        }

        let actor = resolve_actor(None, requesting_actor(&req.meta))?;
        pitboss_envelope::require_actor_type(&actor, required_types)?;
        Self::authorize_account_access(&actor, &req.account_id)?;

        let op_name = match kind {
            MutationKind::Deposit => "deposit",
            MutationKind::Withdraw => "withdraw",
            MutationKind::TransferToAccount => "to_account",
        };
        let scope = Self::scope_for(op_name, &req.account_id);
        let fingerprint_payload = req.fingerprint_payload();

        match admit(&self.idempotency, &scope, &req.meta.idempotency_key, &fingerprint_payload).await? {
            Admission::Replay(payload) => {
                return Ok(serde_json::from_value(payload)
                    .map_err(|e| PlatformError::Internal(format!("corrupt idempotency replay: {e}")))?);
            }
            Admission::Proceed => {}
        }

        let account = self.get_or_create_account(&req.account_id, &req.amount.currency.0).await?;
        if account.currency != req.amount.currency.0 {
            return Err(PlatformError::invalid("currency mismatch for account"));
        }

        let counterparty_id = match kind {
            MutationKind::Deposit | MutationKind::Withdraw => OPERATOR_LIABILITY_ACCOUNT.to_string(),
            MutationKind::TransferToAccount => DEVICE_ESCROW_ACCOUNT.to_string(),
        };

        let (primary_direction, tx_type) = match kind {
            MutationKind::Deposit => (Direction::Credit, TransactionType::Deposit),
            MutationKind::Withdraw => {
                if account.available_minor < req.amount.amount_minor {
                    return Err(PlatformError::denied("insufficient balance"));
                }
                (Direction::Debit, TransactionType::Withdrawal)
            }
            MutationKind::TransferToAccount => (Direction::Credit, TransactionType::TransferToAccount),
        };
        let counterparty_direction = match primary_direction {
            Direction::Debit => Direction::Credit,
            Direction::Credit => Direction::Debit,
        };

        let tx_id = pitboss_core::types::new_tx_id();
        let postings = vec![
            Posting {
                tx_id: tx_id.clone(),
                account_id: req.account_id.clone(),
                direction: primary_direction,
                amount_minor: req.amount.amount_minor,
                currency: req.amount.currency.0.clone(),
                created_at: now,
            },
            Posting {
                tx_id: tx_id.clone(),
                account_id: counterparty_id,
                direction: counterparty_direction,
                amount_minor: req.amount.amount_minor,
                currency: req.amount.currency.0.clone(),
                created_at: now,
            },
        ];
        let signed_sum: i64 = postings.iter().map(|p| p.direction.sign() * p.amount_minor).sum();
        if signed_sum != 0 {
            return Err(PlatformError::UnbalancedPostings);
        }

        let mut updated_account = account.clone();
        updated_account.available_minor += primary_direction.sign() * req.amount.amount_minor;

        let transaction = LedgerTransaction {
            tx_id: tx_id.clone(),
            account_id: req.account_id.clone(),
            tx_type: tx_type.as_wire().to_string(),
            amount_minor: req.amount.amount_minor,
            currency: req.amount.currency.0.clone(),
            occurred_at: now,
            authorization_id: req.authorization_id.clone(),
            description: req.description.clone(),
            transfer_id: None,
            transfer_status: None,
        };

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type,
                auth_context: None,
                object_type: "ledger_account".to_string(),
                object_id: req.account_id.clone(),
                action: op_name.to_string(),
                before: Some(serde_json::to_value(&account).unwrap_or_default()),
                after: Some(serde_json::to_value(&updated_account).unwrap_or_default()),
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        if !self.disable_in_memory_cache {
            self.accounts.lock().await.insert(req.account_id.clone(), updated_account.clone());
        }

        if let Err(e) = self.persist_mutation(&transaction, &postings, &updated_account).await {
            if !self.disable_in_memory_cache {
                self.accounts.lock().await.insert(req.account_id.clone(), account.clone());
            }
            return Err(e);
        }

        let response = MutationResponse {
            meta: meta_ok(&req.meta.request_id, now),
            tx_id: tx_id.clone(),
            available_minor: updated_account.available_minor,
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

        info!(tx_id = %tx_id, account_id = %req.account_id, op = op_name, "ledger mutation applied");
        Ok(response)
    }

    pub async fn deposit(&self, req: MutationRequest) -> MutationResponse {
        self.run_mutation(req, MutationKind::Deposit, &[ActorType::Player, ActorType::Operator, ActorType::Service])
            .await
    }

    pub async fn withdraw(&self, req: MutationRequest) -> MutationResponse {
        self.run_mutation(req, MutationKind::Withdraw, &[ActorType::Player, ActorType::Operator, ActorType::Service])
            .await
    }

    pub async fn transfer_to_account(&self, req: MutationRequest) -> MutationResponse {
        self.run_mutation(
            req,
            MutationKind::TransferToAccount,
            &[ActorType::Player, ActorType::Operator, ActorType::Service],
        )
        .await
    }

    async fn run_mutation(
        &self,
        req: MutationRequest,
        kind: MutationKind,
        required_types: &[ActorType],
    ) -> MutationResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.mutate(req, kind, required_types).await {
            Ok(resp) => resp,
            Err(e) => MutationResponse {
                meta: meta_from_error(&request_id, now, &e),
                tx_id: String::new(),
                available_minor: 0,
            },
        }
    }

    /// TransferToDevice carries partial-transfer semantics unique among the
    /// mutation operations (§4.2): if the account has nothing available the
    /// call is denied outright; if less is available than requested, exactly
    /// the available amount moves and the response is marked `PARTIAL`.
    pub async fn transfer_to_device(&self, req: TransferToDeviceRequest) -> TransferResponse {
        let request_id = req.meta.request_id.clone();
        let now = self.clock.now();
        match self.transfer_to_device_inner(req).await {
            Ok(resp) => resp,
            Err(e) => transfer_status_response(
                meta_from_error(&request_id, now, &e),
                String::new(),
                String::new(),
                TransferStatus::Denied,
                0,
                0,
                Some(e.reason()),
            ),
        }
    }

    async fn transfer_to_device_inner(&self, req: TransferToDeviceRequest) -> Result<TransferResponse, PlatformError> {
        let now = self.clock.now();

        if !req.amount.is_valid_for_mutation() {
            return Err(PlatformError::invalid("amount and currency are required"));
        }
        if req.meta.idempotency_key.is_empty() {
            return Err(PlatformError::invalid("idempotency_key is required"));
        }

        let actor = resolve_actor(None, requesting_actor(&req.meta))?;
        pitboss_envelope::require_actor_type(
            &actor,
            &[ActorType::Player, ActorType::Operator, ActorType::Service],
        )?;
        Self::authorize_account_access(&actor, &req.account_id)?;

        let scope = Self::scope_for("to_device", &req.account_id);
        let fingerprint_payload = req.fingerprint_payload();

        match admit(&self.idempotency, &scope, &req.meta.idempotency_key, &fingerprint_payload).await? {
            Admission::Replay(payload) => {
                return Ok(serde_json::from_value(payload)
                    .map_err(|e| PlatformError::Internal(format!("corrupt idempotency replay: {e}")))?);
            }
            Admission::Proceed => {}
        }

        let account = self.get_or_create_account(&req.account_id, &req.amount.currency.0).await?;
        if account.currency != req.amount.currency.0 {
            return Err(PlatformError::invalid("currency mismatch for account"));
        }

        if account.available_minor <= 0 {
            return Err(PlatformError::denied("insufficient balance"));
        }

        let (transferred, status, unresolved_reason) = if account.available_minor < req.amount.amount_minor {
            (
                account.available_minor,
                TransferStatus::Partial,
                Some("requested amount exceeds available balance; partial transfer executed".to_string()),
            )
        } else {
            (req.amount.amount_minor, TransferStatus::Completed, None)
        };

        let device_account_id = format!("{DEVICE_ESCROW_PREFIX}{}", req.device_id);
        let tx_id = pitboss_core::types::new_tx_id();
        let transfer_id = pitboss_core::types::new_transfer_id();

        let postings = vec![
            Posting {
                tx_id: tx_id.clone(),
                account_id: req.account_id.clone(),
                direction: Direction::Debit,
                amount_minor: transferred,
                currency: req.amount.currency.0.clone(),
                created_at: now,
            },
            Posting {
                tx_id: tx_id.clone(),
                account_id: device_account_id.clone(),
                direction: Direction::Credit,
                amount_minor: transferred,
                currency: req.amount.currency.0.clone(),
                created_at: now,
            },
        ];

        let mut updated_account = account.clone();
        updated_account.available_minor -= transferred;

        let transaction = LedgerTransaction {
            tx_id: tx_id.clone(),
            account_id: req.account_id.clone(),
            tx_type: TransactionType::TransferToDevice.as_wire().to_string(),
            amount_minor: transferred,
            currency: req.amount.currency.0.clone(),
            occurred_at: now,
            authorization_id: req.authorization_id.clone(),
            description: None,
            transfer_id: Some(transfer_id.clone()),
            transfer_status: Some(status.as_wire().to_string()),
        };

        self.audit
            .append(AuditEventInput {
                occurred_at: now,
                actor_id: actor.id.clone(),
                actor_type: actor.actor_type,
                auth_context: None,
                object_type: "ledger_account".to_string(),
                object_id: req.account_id.clone(),
                action: "transfer_to_device".to_string(),
                before: Some(serde_json::to_value(&account).unwrap_or_default()),
                after: Some(serde_json::to_value(&updated_account).unwrap_or_default()),
                result: AuditResult::Success,
                reason: None,
            })
            .await?;

        if !self.disable_in_memory_cache {
            self.accounts.lock().await.insert(req.account_id.clone(), updated_account.clone());
        }

        if let Err(e) = self.persist_mutation(&transaction, &postings, &updated_account).await {
            if !self.disable_in_memory_cache {
                self.accounts.lock().await.insert(req.account_id.clone(), account.clone());
            }
            return Err(e);
        }

        let response = transfer_status_response(
            meta_ok(&req.meta.request_id, now),
            tx_id.clone(),
            transfer_id,
            status,
            transferred,
            updated_account.available_minor,
            unresolved_reason,
        );

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

        info!(tx_id = %tx_id, account_id = %req.account_id, transferred, "partial-capable device transfer applied");
        Ok(response)
    }

    pub async fn get_balance(&self, actor: &Actor, account_id: &str) -> Result<BalanceResponse, PlatformError> {
        Self::authorize_account_access(actor, account_id)?;
        let now = self.clock.now();
        let account = self
            .load_account(account_id)
            .await?
            .unwrap_or_else(|| LedgerAccount::new_lazy(account_id, "USD"));
        Ok(BalanceResponse {
            meta: meta_ok("", now),
            available_minor: account.available_minor,
            pending_minor: account.pending_minor,
            currency: account.currency,
        })
    }

    /// Cursor pagination over integer offsets; page size defaults to 50 when
    /// the caller's requested size is <= 0.
    pub async fn list_transactions(&self, req: ListTransactionsRequest) -> Result<ListTransactionsResponse, PlatformError> {
        let actor = resolve_actor(None, requesting_actor(&req.meta))?;
        Self::authorize_account_access(&actor, &req.account_id)?;

        let page_size = if req.page_size <= 0 { DEFAULT_LIST_PAGE_SIZE } else { req.page_size.min(MAX_LIST_PAGE_SIZE) };
        let now = self.clock.now();

        let Some(pool) = &self.pool else {
            return Ok(ListTransactionsResponse {
                meta: meta_ok(&req.meta.request_id, now),
                transactions: vec![],
                next_offset: req.offset,
            });
        };

        let rows: Vec<LedgerTransactionRow> = sqlx::query_as(
            "SELECT tx_id, account_id, tx_type, amount_minor, currency, occurred_at, authorization_id, description, transfer_id, transfer_status
             FROM ledger_transactions WHERE account_id = $1
             ORDER BY occurred_at ASC, tx_id ASC
             LIMIT $2 OFFSET $3",
        )
        .bind(&req.account_id)
        .bind(page_size)
        .bind(req.offset)
        .fetch_all(pool)
        .await?;

        let count = rows.len() as i64;
        Ok(ListTransactionsResponse {
            meta: meta_ok(&req.meta.request_id, now),
            transactions: rows.into_iter().map(Into::into).collect(),
            next_offset: req.offset + count,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LedgerTransactionRow {
    tx_id: String,
    account_id: String,
    tx_type: String,
    amount_minor: i64,
    currency: String,
    occurred_at: Timestamp,
    authorization_id: Option<String>,
    description: Option<String>,
    transfer_id: Option<String>,
    transfer_status: Option<String>,
}

impl From<LedgerTransactionRow> for LedgerTransaction {
    fn from(r: LedgerTransactionRow) -> Self {
        LedgerTransaction {
            tx_id: r.tx_id,
            account_id: r.account_id,
            tx_type: r.tx_type,
            amount_minor: r.amount_minor,
            currency: r.currency,
            occurred_at: r.occurred_at,
            authorization_id: r.authorization_id,
            description: r.description,
            transfer_id: r.transfer_id,
            transfer_status: r.transfer_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboss_core::{Actor, FixedClock, Money, RequestMeta};

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

    fn svc() -> LedgerService {
        LedgerService::new(
            None,
            Arc::new(AuditStore::new(None, false)),
            clock(),
            false,
            pitboss_core::constants::IDEMPOTENCY_TTL_HOURS,
        )
    }

    fn deposit_req(account_id: &str, amount_minor: i64, idem: &str) -> MutationRequest {
        MutationRequest {
            meta: player_meta(account_id, idem),
            account_id: account_id.to_string(),
            amount: Money::new(amount_minor, "USD"),
            authorization_id: None,
            description: None,
        }
    }

    // Scenario 1 (§8): deposit idempotency — replaying the identical
    // request returns the same tx id and does not double the balance.
    #[tokio::test]
    async fn deposit_idempotency_replays_same_tx_id() {
        let svc = svc();
        let req = deposit_req("acct-1", 1000, "idem-1");

        let first = svc.deposit(req.clone()).await;
        assert_eq!(first.meta.result_code, ResultCode::Ok);
        assert_eq!(first.available_minor, 1000);

        let replay = svc.deposit(req).await;
        assert_eq!(replay.meta.result_code, ResultCode::Ok);
        assert_eq!(replay.tx_id, first.tx_id);
        assert_eq!(replay.available_minor, 1000);
    }

    #[tokio::test]
    async fn deposit_with_same_key_different_amount_is_error() {
        let svc = svc();
        svc.deposit(deposit_req("acct-1", 1000, "idem-1")).await;

        let mismatched = svc.deposit(deposit_req("acct-1", 2000, "idem-1")).await;
        assert_eq!(mismatched.meta.result_code, ResultCode::Error);
    }

    // Scenario 2 (§8): withdrawing more than available leaves the balance
    // untouched and returns DENIED.
    #[tokio::test]
    async fn withdraw_insufficient_balance_leaves_state_untouched() {
        let svc = svc();
        svc.deposit(deposit_req("acct-2", 500, "idem-seed")).await;

        let withdraw = svc
            .withdraw(MutationRequest {
                meta: player_meta("acct-2", "idem-withdraw"),
                account_id: "acct-2".to_string(),
                amount: Money::new(700, "USD"),
                authorization_id: None,
                description: None,
            })
            .await;
        assert_eq!(withdraw.meta.result_code, ResultCode::Denied);
        assert_eq!(withdraw.meta.denial_reason.as_deref(), Some("insufficient balance"));

        let balance = svc
            .get_balance(&Actor { id: "acct-2".to_string(), actor_type: ActorType::Player }, "acct-2")
            .await
            .unwrap();
        assert_eq!(balance.available_minor, 500);
    }

    // Scenario 3 (§8): partial transfer to device drains exactly what's
    // available and marks the transfer PARTIAL.
    #[tokio::test]
    async fn transfer_to_device_partial_drains_account() {
        let svc = svc();
        svc.deposit(deposit_req("acct-3", 800, "idem-seed")).await;

        let transfer = svc
            .transfer_to_device(TransferToDeviceRequest {
                meta: player_meta("acct-3", "idem-transfer"),
                account_id: "acct-3".to_string(),
                device_id: "device-1".to_string(),
                amount: Money::new(1000, "USD"),
                authorization_id: None,
            })
            .await;

        assert_eq!(transfer.meta.result_code, ResultCode::Ok);
        assert_eq!(transfer.transfer_status, "PARTIAL");
        assert_eq!(transfer.transferred_minor, 800);
        assert_eq!(transfer.available_minor, 0);
        assert!(transfer.unresolved_reason.is_some());
    }

    #[tokio::test]
    async fn transfer_to_device_denied_when_zero_balance() {
        let svc = svc();
        let transfer = svc
            .transfer_to_device(TransferToDeviceRequest {
                meta: player_meta("acct-4", "idem-transfer"),
                account_id: "acct-4".to_string(),
                device_id: "device-1".to_string(),
                amount: Money::new(100, "USD"),
                authorization_id: None,
            })
            .await;
        assert_eq!(transfer.meta.result_code, ResultCode::Denied);
        assert_eq!(transfer.transfer_status, "DENIED");
    }

    #[tokio::test]
    async fn player_actor_cannot_mutate_other_account() {
        let svc = svc();
        let req = MutationRequest {
            meta: player_meta("player-1", "idem-1"),
            account_id: "player-2".to_string(),
            amount: Money::new(100, "USD"),
            authorization_id: None,
            description: None,
        };
        let resp = svc.deposit(req).await;
        assert_eq!(resp.meta.result_code, ResultCode::Denied);
        assert_eq!(resp.meta.denial_reason.as_deref(), Some("player actor must match account"));
    }

    #[tokio::test]
    async fn operator_actor_may_mutate_any_account() {
        let svc = svc();
        let req = MutationRequest {
            meta: operator_meta("idem-1"),
            account_id: "player-9".to_string(),
            amount: Money::new(250, "USD"),
            authorization_id: None,
            description: None,
        };
        let resp = svc.deposit(req).await;
        assert_eq!(resp.meta.result_code, ResultCode::Ok);
        assert_eq!(resp.available_minor, 250);
    }

    #[tokio::test]
    async fn missing_idempotency_key_is_invalid() {
        let svc = svc();
        let req = MutationRequest {
            meta: RequestMeta {
                request_id: "req-1".to_string(),
                idempotency_key: String::new(),
                actor: Some(Actor { id: "acct-5".to_string(), actor_type: ActorType::Player }),
            },
            account_id: "acct-5".to_string(),
            amount: Money::new(100, "USD"),
            authorization_id: None,
            description: None,
        };
        let resp = svc.deposit(req).await;
        assert_eq!(resp.meta.result_code, ResultCode::Invalid);
    }

    #[tokio::test]
    async fn zero_amount_is_invalid() {
        let svc = svc();
        let resp = svc.deposit(deposit_req("acct-6", 0, "idem-1")).await;
        assert_eq!(resp.meta.result_code, ResultCode::Invalid);
    }

    #[tokio::test]
    async fn currency_mismatch_against_existing_account_is_invalid() {
        let svc = svc();
        svc.deposit(deposit_req("acct-7", 100, "idem-usd")).await;

        let eur_req = MutationRequest {
            meta: player_meta("acct-7", "idem-eur"),
            account_id: "acct-7".to_string(),
            amount: Money::new(100, "EUR"),
            authorization_id: None,
            description: None,
        };
        let resp = svc.deposit(eur_req).await;
        assert_eq!(resp.meta.result_code, ResultCode::Invalid);
        assert_eq!(resp.meta.denial_reason.as_deref(), Some("currency mismatch for account"));
    }

    #[tokio::test]
    async fn list_transactions_without_persistence_returns_empty() {
        let svc = svc();
        svc.deposit(deposit_req("acct-8", 100, "idem-1")).await;

        let resp = svc
            .list_transactions(ListTransactionsRequest {
                meta: player_meta("acct-8", "idem-list"),
                account_id: "acct-8".to_string(),
                page_size: 0,
                offset: 0,
            })
            .await
            .unwrap();
        assert!(resp.transactions.is_empty());
    }
}
