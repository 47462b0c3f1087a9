//! pitboss-node — the platform node binary.
//!
//! Startup sequence:
//!   1. Resolve configuration (CLI flags over config file over defaults)
//!   2. Connect and migrate persistence (or run in-memory-only if no DSN)
//!   3. Construct every component service behind the shared audit/clock
//!   4. Start the JSON-RPC 2.0 server and the HTTP/JSON gateway
//!   5. Spawn background idempotency/session cleanup sweeps

mod config;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use pitboss_audit::AuditStore;
use pitboss_config::ConfigService;
use pitboss_core::constants::{IDEMPOTENCY_SWEEP_BATCH_SIZE, IDEMPOTENCY_SWEEP_INTERVAL_SECS, SESSION_SWEEP_BATCH_SIZE, SESSION_SWEEP_INTERVAL_SECS};
use pitboss_core::SystemClock;
use pitboss_crypto::AccessTokenSigner;
use pitboss_identity::{IdentityConfig, IdentityService, UserSessionService};
use pitboss_ingestion::IngestionService;
use pitboss_ledger::LedgerService;
use pitboss_registry::RegistryService;
use pitboss_remoteaccess::{RemoteAccessGuard, RemoteAccessStore};
use pitboss_reporting::ReportingService;
use pitboss_rpc::{build_router, RpcServer, RpcServerState};
use pitboss_wagering::WageringService;

use crate::config::{Args, NodeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pitboss=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let cfg = NodeConfig::resolve(&args)?;
    info!("pitboss node starting");

    // ── Persistence ────────────────────────────────────────────────────────
    let pool = match &cfg.database_url {
        Some(dsn) => {
            let pool = pitboss_persistence::connect(dsn, cfg.max_db_connections)
                .await
                .context("connecting to persistence")?;
            pitboss_persistence::migrate(&pool).await.context("running persistence migrations")?;
            info!("connected to persistence and applied migrations");
            Some(pool)
        }
        None => {
            warn!("no --database-url configured — running in-memory only. All state is lost on restart.");
            None
        }
    };

    if cfg.disable_in_memory_cache && pool.is_none() {
        anyhow::bail!("--disable-in-memory-cache requires --database-url; refusing to start with no durable state at all");
    }

    let clock: Arc<dyn pitboss_core::Clock> = Arc::new(SystemClock);
    let signer = Arc::new(AccessTokenSigner::new(cfg.token_signing_secret.as_bytes()));

    // ── Shared audit journal ──────────────────────────────────────────────
    let audit = Arc::new(AuditStore::new(pool.clone(), cfg.disable_in_memory_cache));

    // ── Component services ─────────────────────────────────────────────────
    let ledger = Arc::new(LedgerService::new(
        pool.clone(),
        Arc::clone(&audit),
        Arc::clone(&clock),
        cfg.disable_in_memory_cache,
        cfg.idempotency_ttl_hours,
    ));
    let wagering = Arc::new(WageringService::new(
        pool.clone(),
        Arc::clone(&audit),
        Arc::clone(&clock),
        cfg.disable_in_memory_cache,
        cfg.idempotency_ttl_hours,
    ));

    let identity_config = IdentityConfig {
        access_token_ttl_minutes: pitboss_core::constants::ACCESS_TOKEN_TTL_MINUTES,
        refresh_token_ttl_hours: cfg.session_timeout_hours,
        lockout_threshold: pitboss_core::constants::LOCKOUT_THRESHOLD,
        lockout_duration_minutes: pitboss_core::constants::LOCKOUT_DURATION_MINUTES,
    };
    let identity = Arc::new(IdentityService::new(
        pool.clone(),
        Arc::clone(&audit),
        Arc::clone(&clock),
        Arc::clone(&signer),
        identity_config,
    ));
    let sessions = Arc::new(UserSessionService::new(pool.clone(), Arc::clone(&clock), cfg.disable_in_memory_cache));
    let registry = Arc::new(RegistryService::new(pool.clone(), Arc::clone(&audit), Arc::clone(&clock), cfg.disable_in_memory_cache));
    let ingestion = Arc::new(IngestionService::new(
        pool.clone(),
        cfg.buffer_cap,
        Arc::clone(&audit),
        Arc::clone(&clock),
        cfg.disable_in_memory_cache,
    ));
    let config_service = Arc::new(ConfigService::new(pool.clone(), Arc::clone(&audit), Arc::clone(&clock), cfg.disable_in_memory_cache));
    let reporting = Arc::new(ReportingService::new(pool.clone(), Arc::clone(&audit), Arc::clone(&clock), cfg.disable_in_memory_cache));

    let remote_access = Arc::new(RemoteAccessStore::new(pool.clone(), 10_000, cfg.disable_in_memory_cache));
    let remote_access_guard = Arc::new(RemoteAccessGuard::new(
        cfg.trusted_networks(),
        Arc::clone(&remote_access),
        Arc::clone(&audit),
        Arc::clone(&clock),
        cfg.remote_access_fail_closed,
    ));

    let mut component_versions = BTreeMap::new();
    component_versions.insert("pitboss-node".to_string(), env!("CARGO_PKG_VERSION").to_string());

    let state = Arc::new(RpcServerState {
        ledger,
        wagering,
        identity,
        sessions,
        registry,
        ingestion,
        config: config_service,
        reporting,
        audit,
        remote_access,
        remote_access_fail_closed: cfg.remote_access_fail_closed,
        clock: Arc::clone(&clock),
        pool: pool.clone(),
        component_versions,
    });

    // ── JSON-RPC server ────────────────────────────────────────────────────
    let _rpc_handle = RpcServer::new(Arc::clone(&state))
        .start(cfg.rpc_addr)
        .await
        .context("starting JSON-RPC server")?;

    // ── HTTP/JSON gateway ──────────────────────────────────────────────────
    let router = build_router(Arc::clone(&state), Arc::clone(&remote_access_guard));
    let http_listener = tokio::net::TcpListener::bind(cfg.http_addr)
        .await
        .with_context(|| format!("binding HTTP gateway listener on {}", cfg.http_addr))?;
    info!(addr = %cfg.http_addr, "HTTP gateway starting");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, router.into_make_service_with_connect_info::<std::net::SocketAddr>()).await {
            tracing::error!(error = %e, "HTTP gateway terminated");
        }
    });

    // ── Background sweeps ──────────────────────────────────────────────────
    if let Some(pool) = pool.clone() {
        tokio::spawn(sweep_ledger_idempotency(pool.clone()));
        tokio::spawn(sweep_wagering_idempotency(pool.clone()));
        tokio::spawn(sweep_identity_sessions(pool));
    } else {
        info!("no persistence configured — skipping background cleanup sweeps");
    }

    info!("pitboss node ready");
    std::future::pending::<()>().await;
    Ok(())
}

async fn sweep_ledger_idempotency(pool: sqlx::PgPool) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(IDEMPOTENCY_SWEEP_INTERVAL_SECS));
    loop {
        ticker.tick().await;
        match pitboss_ledger::idempotency::sweep_expired(&pool, IDEMPOTENCY_SWEEP_BATCH_SIZE).await {
            Ok(n) if n > 0 => info!(deleted = n, "swept expired ledger idempotency keys"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "ledger idempotency sweep failed"),
        }
    }
}

async fn sweep_wagering_idempotency(pool: sqlx::PgPool) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(IDEMPOTENCY_SWEEP_INTERVAL_SECS));
    loop {
        ticker.tick().await;
        match pitboss_wagering::idempotency::sweep_expired(&pool, IDEMPOTENCY_SWEEP_BATCH_SIZE).await {
            Ok(n) if n > 0 => info!(deleted = n, "swept expired wagering idempotency keys"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "wagering idempotency sweep failed"),
        }
    }
}

async fn sweep_identity_sessions(pool: sqlx::PgPool) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
    loop {
        ticker.tick().await;
        match pitboss_identity::sweep_expired_sessions(&pool, SESSION_SWEEP_BATCH_SIZE).await {
            Ok(n) if n > 0 => info!(deleted = n, "swept expired refresh-token sessions"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "identity session sweep failed"),
        }
    }
}
