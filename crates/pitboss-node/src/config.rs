//! Layered node configuration (§10): a `clap::Parser` derive struct for CLI
//! flags, which also accepts a TOML config file whose values are overridden
//! by any CLI flag actually supplied — the same file-or-derive precedence
//! the teacher's `load_or_generate_genesis_params` establishes (file
//! present -> load; absent -> fall back to built-in defaults, logging
//! loudly that defaults were used).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use tracing::warn;

use pitboss_core::constants::{DEFAULT_INGESTION_BUFFER_CAP, IDEMPOTENCY_TTL_HOURS, REFRESH_TOKEN_TTL_HOURS};

#[derive(Parser, Debug)]
#[command(
    name = "pitboss-node",
    version,
    about = "Pitboss platform node — ledger, wagering, identity, and audit services for a regulated cashless-gaming operator"
)]
pub struct Args {
    /// Path to a TOML configuration file. CLI flags override values it sets.
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// JSON-RPC listen address.
    #[arg(long)]
    pub rpc_addr: Option<SocketAddr>,

    /// HTTP/JSON gateway listen address.
    #[arg(long)]
    pub http_addr: Option<SocketAddr>,

    /// Postgres DSN. Omit to run with no persistence (in-memory mirrors only).
    #[arg(long)]
    pub database_url: Option<String>,

    /// Maximum pooled database connections.
    #[arg(long)]
    pub max_db_connections: Option<u32>,

    /// Trusted CIDR networks for administrative paths (comma-separated).
    /// Defaults to localhost-only when neither this nor the config file sets it.
    #[arg(long, value_delimiter = ',')]
    pub trusted_cidrs: Vec<String>,

    /// Deny administrative requests with HTTP 503 if the access-activity
    /// log fails to persist, instead of forwarding on a best-effort basis.
    #[arg(long)]
    pub remote_access_fail_closed: bool,

    /// Idempotency key TTL in hours.
    #[arg(long)]
    pub idempotency_ttl_hours: Option<i64>,

    /// Refresh-token lifetime in hours.
    #[arg(long)]
    pub session_timeout_hours: Option<i64>,

    /// Ingestion buffer capacity before the service disables itself.
    #[arg(long)]
    pub buffer_cap: Option<usize>,

    /// Disable the in-memory mirror on every component; reads and writes go
    /// to persistence only (ERROR "persistence unavailable" if absent).
    #[arg(long)]
    pub disable_in_memory_cache: bool,

    /// Symmetric secret used to sign access-token bearers. Generating one
    /// ad hoc on every start is fine for local development only — it
    /// invalidates all previously issued access tokens.
    #[arg(long)]
    pub token_signing_secret: Option<String>,

    /// TLS certificate path (plumbing only — TLS termination is an external
    /// collaborator per §1; this flag is accepted and logged, not acted on).
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key path (see `tls_cert`).
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// File-sourced overrides, parsed with `serde` from TOML. Every field is
/// optional — an absent file or an absent key both fall through to the
/// built-in default in [`NodeConfig::resolve`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub rpc_addr: Option<SocketAddr>,
    pub http_addr: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub max_db_connections: Option<u32>,
    pub trusted_cidrs: Option<Vec<String>>,
    pub remote_access_fail_closed: Option<bool>,
    pub idempotency_ttl_hours: Option<i64>,
    pub session_timeout_hours: Option<i64>,
    pub buffer_cap: Option<usize>,
    pub disable_in_memory_cache: Option<bool>,
    pub token_signing_secret: Option<String>,
}

impl FileConfig {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))
    }
}

/// The fully resolved configuration a node runs with: CLI flag, then config
/// file value, then built-in default, in that precedence order.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub rpc_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub database_url: Option<String>,
    pub max_db_connections: u32,
    pub trusted_cidrs: Vec<String>,
    pub remote_access_fail_closed: bool,
    pub idempotency_ttl_hours: i64,
    pub session_timeout_hours: i64,
    pub buffer_cap: usize,
    pub disable_in_memory_cache: bool,
    pub token_signing_secret: String,
}

impl NodeConfig {
    pub fn resolve(args: &Args) -> anyhow::Result<Self> {
        let file = match &args.config_file {
            Some(path) => FileConfig::load(path)?,
            None => {
                warn!("no --config-file provided; using CLI flags and built-in defaults only");
                FileConfig::default()
            }
        };

        let token_signing_secret = args
            .token_signing_secret
            .clone()
            .or_else(|| file.token_signing_secret.clone())
            .unwrap_or_else(|| {
                warn!("no --token-signing-secret configured — generating an ephemeral one. Access tokens will not survive a restart. DO NOT USE IN PRODUCTION.");
                pitboss_core::types::new_refresh_token()
            });

        Ok(Self {
            rpc_addr: args
                .rpc_addr
                .or(file.rpc_addr)
                .unwrap_or_else(|| "127.0.0.1:8645".parse().unwrap()),
            http_addr: args
                .http_addr
                .or(file.http_addr)
                .unwrap_or_else(|| "127.0.0.1:8080".parse().unwrap()),
            database_url: args.database_url.clone().or(file.database_url),
            max_db_connections: args.max_db_connections.or(file.max_db_connections).unwrap_or(10),
            trusted_cidrs: if !args.trusted_cidrs.is_empty() {
                args.trusted_cidrs.clone()
            } else {
                file.trusted_cidrs.unwrap_or_default()
            },
            remote_access_fail_closed: args.remote_access_fail_closed || file.remote_access_fail_closed.unwrap_or(false),
            idempotency_ttl_hours: args
                .idempotency_ttl_hours
                .or(file.idempotency_ttl_hours)
                .unwrap_or(IDEMPOTENCY_TTL_HOURS),
            session_timeout_hours: args
                .session_timeout_hours
                .or(file.session_timeout_hours)
                .unwrap_or(REFRESH_TOKEN_TTL_HOURS),
            buffer_cap: args.buffer_cap.or(file.buffer_cap).unwrap_or(DEFAULT_INGESTION_BUFFER_CAP),
            disable_in_memory_cache: args.disable_in_memory_cache || file.disable_in_memory_cache.unwrap_or(false),
            token_signing_secret,
        })
    }

    pub fn trusted_networks(&self) -> Vec<ipnet::IpNet> {
        self.trusted_cidrs.iter().filter_map(|c| c.parse().ok()).collect()
    }
}
