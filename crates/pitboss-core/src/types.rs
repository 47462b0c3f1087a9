use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minor-unit integer amount. Never floating point — see `Money`.
pub type AmountMinor = i64;

/// Unix-epoch nanosecond precision timestamp, always UTC.
pub type Timestamp = DateTime<Utc>;

/// Current UTC instant, RFC3339 with nanosecond precision.
pub fn now_rfc3339_nanos(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

// ── Money ────────────────────────────────────────────────────────────────────

/// (amount_minor, currency) pair. Arithmetic on amounts is always integer;
/// floating point is never used anywhere in the money path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: AmountMinor,
    pub currency: Currency,
}

/// 3-letter currency code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency(pub String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn is_valid(&self) -> bool {
        self.0.len() == 3 && self.0.chars().all(|c| c.is_ascii_alphabetic())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Money {
    pub fn new(amount_minor: AmountMinor, currency: impl Into<String>) -> Self {
        Self { amount_minor, currency: Currency::new(currency) }
    }

    /// Valid for mutation iff amount_minor > 0 and currency is a well-formed
    /// non-empty 3-letter code.
    pub fn is_valid_for_mutation(&self) -> bool {
        self.amount_minor > 0 && self.currency.is_valid()
    }
}

// ── Actor ────────────────────────────────────────────────────────────────────

/// Closed enumeration of authenticated principal kinds. UNSPECIFIED is never
/// authorized for any operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorType {
    Unspecified,
    Player,
    Operator,
    Service,
}

impl ActorType {
    pub const fn as_wire(self) -> &'static str {
        match self {
            ActorType::Unspecified => "ACTOR_TYPE_UNSPECIFIED",
            ActorType::Player => "ACTOR_TYPE_PLAYER",
            ActorType::Operator => "ACTOR_TYPE_OPERATOR",
            ActorType::Service => "ACTOR_TYPE_SERVICE",
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s {
            "ACTOR_TYPE_PLAYER" => ActorType::Player,
            "ACTOR_TYPE_OPERATOR" => ActorType::Operator,
            "ACTOR_TYPE_SERVICE" => ActorType::Service,
            _ => ActorType::Unspecified,
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

impl Serialize for ActorType {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ActorType {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(ActorType::from_wire(&raw))
    }
}

/// An authenticated principal: a player, a staff operator, or an automated
/// service caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    #[serde(rename = "type")]
    pub actor_type: ActorType,
}

impl Actor {
    pub fn is_authorizable(&self) -> bool {
        self.actor_type != ActorType::Unspecified && !self.id.is_empty()
    }
}

// ── Request / response envelope metadata ────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMeta {
    pub request_id: String,
    #[serde(default)]
    pub idempotency_key: String,
    #[serde(default)]
    pub actor: Option<Actor>,
}

/// Closed outward result taxonomy — see pitboss-core::error for the mapping
/// from internal errors onto these four codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    Invalid,
    Denied,
    Error,
}

impl ResultCode {
    pub const fn as_wire(self) -> &'static str {
        match self {
            ResultCode::Ok => "OK",
            ResultCode::Invalid => "INVALID",
            ResultCode::Denied => "DENIED",
            ResultCode::Error => "ERROR",
        }
    }
}

impl Serialize for ResultCode {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ResultCode {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(match raw.as_str() {
            "OK" => ResultCode::Ok,
            "INVALID" => ResultCode::Invalid,
            "DENIED" => ResultCode::Denied,
            _ => ResultCode::Error,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub result_code: ResultCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,
    pub server_time: String,
}

impl ResponseMeta {
    pub fn ok(request_id: impl Into<String>, now: Timestamp) -> Self {
        Self {
            request_id: request_id.into(),
            result_code: ResultCode::Ok,
            denial_reason: None,
            server_time: now_rfc3339_nanos(now),
        }
    }

    pub fn with_code(
        request_id: impl Into<String>,
        now: Timestamp,
        code: ResultCode,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            result_code: code,
            denial_reason: if code == ResultCode::Ok { None } else { Some(reason.into()) },
            server_time: now_rfc3339_nanos(now),
        }
    }
}

// ── Identifiers ──────────────────────────────────────────────────────────────

/// Generates a new random identifier of the given domain, e.g. `new_id("tx")`
/// -> `"tx-3fa...".`
pub fn new_tx_id() -> String {
    new_id("tx")
}

pub fn new_wager_id() -> String {
    new_id("wager")
}

pub fn new_transfer_id() -> String {
    new_id("xfer")
}

pub fn new_audit_id() -> String {
    new_id("audit")
}

pub fn new_refresh_token() -> String {
    // Opaque, random, server-side-stored handle — not a JWT, unlike the
    // access token. 256 bits of randomness base64-free (uuid v4 x2 for width).
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn new_session_id() -> String {
    new_id("session")
}

pub fn new_run_id() -> String {
    new_id("run")
}
