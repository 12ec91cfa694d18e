//! Virtual-host extraction.
//!
//! # Responsibilities
//! - Read the original host of a request (Host header, else URI authority)
//! - Strip any `:port` suffix to obtain the routing key
//!
//! # Design Decisions
//! - Names are compared as-is; directory service names are case-sensitive
//! - A bracketed IPv6 literal keeps its brackets and loses only the port

use axum::http::{header, Request};

/// The host the caller addressed, exactly as sent.
pub fn request_host<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_string()))
}

/// The name component of a host value, without a port suffix.
pub fn virtual_host(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.split_once(':') {
        Some((name, _)) => name,
        None => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_strips_port() {
        assert_eq!(virtual_host("orders"), "orders");
        assert_eq!(virtual_host("orders:1500"), "orders");
        assert_eq!(virtual_host("unknownsvc.internal:80"), "unknownsvc.internal");
        assert_eq!(virtual_host(""), "");
    }

    #[test]
    fn test_ipv6_literal() {
        assert_eq!(virtual_host("[::1]:8080"), "[::1]");
        assert_eq!(virtual_host("[::1]"), "[::1]");
    }

    #[test]
    fn test_host_header_preferred() {
        let req = Request::builder()
            .uri("http://absolute.example/path")
            .header("Host", "Orders:1500")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_host(&req).as_deref(), Some("Orders:1500"));
    }

    #[test]
    fn test_falls_back_to_uri_authority() {
        let req = Request::builder()
            .uri("http://orders:1500/path")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_host(&req).as_deref(), Some("orders:1500"));

        let req = Request::builder().uri("/path").body(Body::empty()).unwrap();
        assert_eq!(request_host(&req), None);
    }
}
