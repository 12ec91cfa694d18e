//! Request handling and transformation.
//!
//! # Responsibilities
//! - Point the request at the resolved upstream
//! - Preserve the original Host header
//! - Strip hop-by-hop headers and ask for a one-shot upstream connection
//! - Record the caller in X-Forwarded-For
//!
//! # Design Decisions
//! - Body is streamed through untouched; nothing is buffered
//! - Upstream requests always speak HTTP/1.1

use std::net::IpAddr;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Request, Version};

use crate::routing::{RoutingError, RoutingTarget};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn remove_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove(header::UPGRADE);
}

/// Rewrite an inbound request into the upstream request for `target`.
pub fn prepare_upstream_request(
    request: Request<Body>,
    target: &RoutingTarget,
    original_host: &str,
    peer: Option<IpAddr>,
) -> Result<Request<Body>, RoutingError> {
    let (mut parts, body) = request.into_parts();

    parts.uri = target.uri(parts.uri.path_and_query())?;
    parts.version = Version::HTTP_11;

    remove_hop_by_hop(&mut parts.headers);

    let host = HeaderValue::from_str(original_host)
        .map_err(|_| RoutingError::InvalidHost(original_host.to_string()))?;
    parts.headers.insert(header::HOST, host);
    parts
        .headers
        .insert(header::CONNECTION, HeaderValue::from_static("close"));

    if let Some(ip) = peer {
        let prior: Vec<&str> = parts
            .headers
            .get_all(X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let value = if prior.is_empty() {
            ip.to_string()
        } else {
            format!("{}, {}", prior.join(", "), ip)
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            parts.headers.insert(X_FORWARDED_FOR, value);
        }
    }

    Ok(Request::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Instance;

    fn target() -> RoutingTarget {
        RoutingTarget::from_instance(&Instance::new("10.0.0.5", 8080, "orders"))
    }

    #[test]
    fn test_rewrites_uri_and_keeps_host() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/items?page=2")
            .header("Host", "orders:1500")
            .header("X-Custom", "kept")
            .body(Body::empty())
            .unwrap();

        let upstream = prepare_upstream_request(request, &target(), "orders:1500", None).unwrap();

        assert_eq!(upstream.uri().to_string(), "http://10.0.0.5:8080/api/items?page=2");
        assert_eq!(upstream.method(), "POST");
        assert_eq!(upstream.headers()["host"], "orders:1500");
        assert_eq!(upstream.headers()["x-custom"], "kept");
        assert_eq!(upstream.headers()["connection"], "close");
        assert!(upstream.headers().get(X_FORWARDED_FOR).is_none());
    }

    #[test]
    fn test_strips_hop_by_hop() {
        let request = Request::builder()
            .uri("/")
            .header("Connection", "keep-alive, X-Session-Hint")
            .header("Keep-Alive", "timeout=5")
            .header("X-Session-Hint", "abc")
            .header("Proxy-Authorization", "Basic Zm9v")
            .header("TE", "trailers")
            .header("Accept", "text/plain")
            .body(Body::empty())
            .unwrap();

        let upstream = prepare_upstream_request(request, &target(), "orders", None).unwrap();
        let headers = upstream.headers();

        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get("x-session-hint").is_none());
        assert!(headers.get("proxy-authorization").is_none());
        assert!(headers.get("te").is_none());
        assert_eq!(headers["accept"], "text/plain");
    }

    #[test]
    fn test_appends_forwarded_for() {
        let request = Request::builder()
            .uri("/")
            .header(X_FORWARDED_FOR, "192.0.2.1")
            .body(Body::empty())
            .unwrap();

        let peer: IpAddr = "198.51.100.7".parse().unwrap();
        let upstream = prepare_upstream_request(request, &target(), "orders", Some(peer)).unwrap();
        assert_eq!(upstream.headers()[X_FORWARDED_FOR], "192.0.2.1, 198.51.100.7");
    }

    #[test]
    fn test_upstream_is_http11() {
        let request = Request::builder()
            .version(Version::HTTP_2)
            .uri("http://orders/")
            .body(Body::empty())
            .unwrap();

        let upstream = prepare_upstream_request(request, &target(), "orders", None).unwrap();
        assert_eq!(upstream.version(), Version::HTTP_11);
    }
}
