use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ipnet::IpNet;
use tracing::warn;

use pitboss_audit::{AuditEventInput, AuditResult, AuditStore};
use pitboss_core::constants::DEFAULT_TRUSTED_CIDRS;
use pitboss_core::{ActorType, Clock};

use crate::model::{is_administrative_path, RemoteAccessActivityInput};
use crate::store::RemoteAccessStore;

/// HTTP admission wrapper for administrative paths (§4.6).
pub struct RemoteAccessGuard {
    trusted: Vec<IpNet>,
    store: Arc<RemoteAccessStore>,
    audit: Arc<AuditStore>,
    clock: Arc<dyn Clock>,
    fail_closed: bool,
}

impl RemoteAccessGuard {
    pub fn new(trusted: Vec<IpNet>, store: Arc<RemoteAccessStore>, audit: Arc<AuditStore>, clock: Arc<dyn Clock>, fail_closed: bool) -> Self {
        let trusted = if trusted.is_empty() { default_trusted_networks() } else { trusted };
        Self { trusted, store, audit, clock, fail_closed }
    }

    fn is_trusted(&self, ip: IpAddr) -> bool {
        self.trusted.iter().any(|net| net.contains(&ip))
    }

    /// Runs the admission check for one request. Returns `Ok(())` to
    /// forward, or the terminal `Response` to send instead (403 denied, or
    /// 503 when fail-closed persistence fails).
    pub async fn admit(&self, client_ip: IpAddr, path: &str, method: &str) -> Result<(), Response> {
        if !is_administrative_path(path) {
            return Ok(());
        }

        let now = self.clock.now();
        let allowed = self.is_trusted(client_ip);
        let reason = if allowed { None } else { Some("source network not trusted".to_string()) };

        let outcome = self
            .store
            .append(RemoteAccessActivityInput {
                ts: now,
                source_ip: client_ip.to_string(),
                source_port: None,
                destination: path.to_string(),
                destination_port: None,
                path: path.to_string(),
                method: method.to_string(),
                allowed,
                reason: reason.clone(),
            })
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "failed to persist remote access activity");
                if self.fail_closed {
                    return Err(StatusCode::SERVICE_UNAVAILABLE.into_response());
                }
                return if allowed { Ok(()) } else { Err(StatusCode::FORBIDDEN.into_response()) };
            }
        };

        if outcome.capacity_exceeded {
            warn!(path = %path, "remote access activity log capacity exceeded");
        }

        if !allowed {
            let _ = self
                .audit
                .append(AuditEventInput {
                    occurred_at: now,
                    actor_id: client_ip.to_string(),
                    actor_type: ActorType::Unspecified,
                    auth_context: None,
                    object_type: "remote_access".to_string(),
                    object_id: path.to_string(),
                    action: "admission_denied".to_string(),
                    before: None,
                    after: None,
                    result: AuditResult::Denied,
                    reason: reason.clone(),
                })
                .await;
            return Err(StatusCode::FORBIDDEN.into_response());
        }

        Ok(())
    }
}

fn default_trusted_networks() -> Vec<IpNet> {
    DEFAULT_TRUSTED_CIDRS.iter().filter_map(|c| c.parse().ok()).collect()
}

/// Prefers the leftmost `X-Forwarded-For` entry; falls back to the socket
/// peer address (§4.6).
pub fn extract_client_ip(headers: &axum::http::HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    if let Some(value) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = value.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    peer.map(|addr| addr.ip())
}

/// `axum::middleware::from_fn_with_state`-compatible entry point.
pub async fn remote_access_layer(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    axum::extract::State(guard): axum::extract::State<Arc<RemoteAccessGuard>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client_ip = extract_client_ip(request.headers(), Some(peer)).unwrap_or(peer.ip());
    let path = request.uri().path().to_string();
    let method = request.method().to_string();

    match guard.admit(client_ip, &path, &method).await {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use pitboss_core::FixedClock;

    fn guard(fail_closed: bool) -> RemoteAccessGuard {
        RemoteAccessGuard::new(
            vec![],
            Arc::new(RemoteAccessStore::new(None, 100, false)),
            Arc::new(AuditStore::new(None, false)),
            Arc::new(FixedClock(chrono::Utc::now())),
            fail_closed,
        )
    }

    #[tokio::test]
    async fn non_administrative_path_passes_through() {
        let g = guard(false);
        let result = g.admit("203.0.113.5".parse().unwrap(), "/v1/ledger/deposit", "POST").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn untrusted_source_is_denied_on_admin_path() {
        let g = guard(false);
        let result = g.admit("203.0.113.5".parse().unwrap(), "/v1/config/propose", "POST").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn localhost_is_trusted_by_default() {
        let g = guard(false);
        let result = g.admit("127.0.0.1".parse().unwrap(), "/v1/audit/list", "GET").await;
        assert!(result.is_ok());
    }

    #[test]
    fn x_forwarded_for_prefers_leftmost_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        let ip = extract_client_ip(&headers, Some("127.0.0.1:9999".parse().unwrap()));
        assert_eq!(ip, Some("203.0.113.7".parse().unwrap()));
    }
}
