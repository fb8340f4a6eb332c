//! Tenant routing middleware
//!
//! Rewrites inbound requests onto the internal `/t/{tenantId}` namespace
//! based on the request hostname. The middleware never fails a request:
//! any resolution error, timeout, or malformed input passes the request
//! through unchanged and lets the inner router answer.

use crate::service::resolution::normalize_host;
use crate::state::HasServices;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Uri},
    middleware::Next,
    response::Response,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Paths the tenant router never touches: the management API and probes.
fn is_exempt_path(path: &str) -> bool {
    path.starts_with("/api/") || path == "/health" || path == "/ready"
}

/// Landing paths eligible for assertion-based auto-routing on the
/// platform host.
fn is_landing_path(path: &str) -> bool {
    path == "/" || path == "/dashboard"
}

/// Rewrite a legacy `/store/{id}/...` path onto the internal namespace.
fn rewrite_legacy_path(path: &str) -> Option<String> {
    let rest = path.strip_prefix("/store/")?;
    if rest.is_empty() {
        return None;
    }
    Some(format!("/t/{}", rest))
}

/// Swap the request path, preserving the query string. Returns `false`
/// when the rewritten URI does not parse; the caller passes through.
fn set_path(request: &mut Request<Body>, new_path: &str) -> bool {
    let uri = request.uri().clone();
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", new_path, query),
        None => new_path.to_string(),
    };

    let mut parts = uri.into_parts();
    parts.path_and_query = match path_and_query.parse() {
        Ok(pq) => Some(pq),
        Err(_) => return false,
    };

    match Uri::from_parts(parts) {
        Ok(new_uri) => {
            *request.uri_mut() = new_uri;
            true
        }
        Err(_) => false,
    }
}

fn host_of(request: &Request<Body>) -> Option<String> {
    let raw = request.headers().get(header::HOST)?.to_str().ok()?;
    let host = normalize_host(raw);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Map an inbound request onto the internal tenant namespace.
///
/// Platform hosts (`{root_domain}` and `www.{root_domain}`) pass through,
/// except legacy `/store/{id}` paths, which are rewritten to `/t/{id}`,
/// and landing paths carrying an identity assertion, which route to the
/// asserted owner's tenant. Every other hostname is resolved to a tenant
/// and the path is prefixed with `/t/{tenantId}`.
pub async fn tenant_router<S: HasServices>(
    State(state): State<S>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // Internal-namespace paths are already routed.
    if is_exempt_path(&path) || path.starts_with("/t/") {
        return next.run(request).await;
    }

    let Some(host) = host_of(&request) else {
        return next.run(request).await;
    };

    let routing = &state.config().routing;
    let is_platform_host =
        host == routing.root_domain || host == format!("www.{}", routing.root_domain);

    if is_platform_host {
        if let Some(new_path) = rewrite_legacy_path(&path) {
            if set_path(&mut request, &new_path) {
                debug!("Rewrote legacy path '{}' to '{}'", path, new_path);
            }
            return next.run(request).await;
        }

        if is_landing_path(&path) {
            let resolver = state.assertion_resolver();
            let token = request
                .headers()
                .get(resolver.header_name())
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if let Some(token) = token {
                if let Some(tenant_id) = resolver.resolve_identity(&token).await {
                    let new_path = format!("/t/{}{}", tenant_id, path);
                    if set_path(&mut request, &new_path) {
                        debug!("Routed asserted identity to tenant '{}'", tenant_id);
                    }
                }
            }
        }

        return next.run(request).await;
    }

    let budget = Duration::from_millis(routing.resolve_timeout_ms);
    match tokio::time::timeout(budget, state.resolver().resolve(&host)).await {
        Ok(Ok(tenant_id)) => {
            let new_path = format!("/t/{}{}", tenant_id, path);
            if !set_path(&mut request, &new_path) {
                warn!("Rewritten path for host '{}' did not parse", host);
            }
        }
        Ok(Err(e)) => {
            debug!("Hostname '{}' did not resolve: {}", host, e);
        }
        Err(_) => {
            warn!("Hostname resolution for '{}' timed out", host);
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt_path("/api/v1/resolve-domain"));
        assert!(is_exempt_path("/health"));
        assert!(is_exempt_path("/ready"));
        assert!(!is_exempt_path("/"));
        assert!(!is_exempt_path("/api")); // no trailing slash, not the API tree
        assert!(!is_exempt_path("/products"));
    }

    #[test]
    fn test_landing_paths() {
        assert!(is_landing_path("/"));
        assert!(is_landing_path("/dashboard"));
        assert!(!is_landing_path("/dashboard/settings"));
        assert!(!is_landing_path("/products"));
    }

    #[test]
    fn test_rewrite_legacy_path() {
        assert_eq!(
            rewrite_legacy_path("/store/abc/products").as_deref(),
            Some("/t/abc/products")
        );
        assert_eq!(rewrite_legacy_path("/store/abc").as_deref(), Some("/t/abc"));
        assert_eq!(rewrite_legacy_path("/store/"), None);
        assert_eq!(rewrite_legacy_path("/stores/abc"), None);
        assert_eq!(rewrite_legacy_path("/"), None);
    }

    #[test]
    fn test_set_path_preserves_query() {
        let mut request = Request::builder()
            .uri("/products?page=2")
            .body(Body::empty())
            .unwrap();

        assert!(set_path(&mut request, "/t/store-1/products"));
        assert_eq!(request.uri().path(), "/t/store-1/products");
        assert_eq!(request.uri().query(), Some("page=2"));
    }

    #[test]
    fn test_host_of_normalizes() {
        let request = Request::builder()
            .uri("/")
            .header(header::HOST, "Shop.Example.com:443")
            .body(Body::empty())
            .unwrap();

        assert_eq!(host_of(&request).as_deref(), Some("shop.example.com"));
    }

    #[test]
    fn test_host_of_missing_header() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert!(host_of(&request).is_none());
    }
}
