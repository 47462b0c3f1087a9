//! ─── Pitboss Platform Constants ─────────────────────────────────────────────
//!
//! Tunable defaults. All are overridable via the node's configuration file or
//! CLI flags (see pitboss-node::config); these are the values used when no
//! override is present.

// ── Idempotency ───────────────────────────────────────────────────────────────

/// Default TTL for idempotency key rows (hours). §4.1.
pub const IDEMPOTENCY_TTL_HOURS: i64 = 24;

/// Max rows deleted per cleanup-sweep tick.
pub const IDEMPOTENCY_SWEEP_BATCH_SIZE: i64 = 500;

/// Interval between idempotency cleanup sweeps (seconds).
pub const IDEMPOTENCY_SWEEP_INTERVAL_SECS: u64 = 300;

// ── Identity / tokens ─────────────────────────────────────────────────────────

/// Access token lifetime (minutes). §4.5.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Refresh token lifetime (hours). §4.5.
pub const REFRESH_TOKEN_TTL_HOURS: i64 = 1;

/// Consecutive failed logins before lockout engages.
pub const LOCKOUT_THRESHOLD: u32 = 5;

/// Lockout duration once the threshold is reached (minutes).
pub const LOCKOUT_DURATION_MINUTES: i64 = 15;

/// Interval between expired-refresh-token cleanup sweeps (seconds).
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 300;

/// Max refresh-token rows deleted per cleanup-sweep tick.
pub const SESSION_SWEEP_BATCH_SIZE: i64 = 500;

// ── Ledger / pagination ───────────────────────────────────────────────────────

/// Default page size for `ListTransactions` when the caller's requested size
/// is <= 0.
pub const DEFAULT_LIST_PAGE_SIZE: i64 = 50;

/// Maximum page size for `ListAuditEvents` and `ListTransactions` alike.
pub const MAX_LIST_PAGE_SIZE: i64 = 500;

// ── Ingestion ──────────────────────────────────────────────────────────────────

/// Default capacity of the in-process ingestion buffer before it disables
/// itself. Overridable via the `bufferCap` CLI/config knob.
pub const DEFAULT_INGESTION_BUFFER_CAP: usize = 10_000;

// ── Well-known account ids ─────────────────────────────────────────────────────

/// Counterparty account for deposits and withdrawals.
pub const OPERATOR_LIABILITY_ACCOUNT: &str = "operator_liability";

/// Counterparty account for `TransferToAccount` (funds returning from a device).
pub const DEVICE_ESCROW_ACCOUNT: &str = "device_escrow";

/// Prefix for per-device escrow accounts used by `TransferToDevice`.
pub const DEVICE_ESCROW_PREFIX: &str = "device_escrow:";

// ── Remote access ───────────────────────────────────────────────────────────────

/// Administrative path prefixes gated by the RemoteAccessGuard. §4.6.
pub const ADMIN_PATH_PREFIXES: &[&str] = &["/v1/config", "/v1/reporting", "/v1/audit"];

/// Default trusted CIDR set when none is configured: localhost only.
pub const DEFAULT_TRUSTED_CIDRS: &[&str] = &["127.0.0.1/32", "::1/128"];
