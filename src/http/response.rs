//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the upstream status, headers and body to the caller
//! - Strip hop-by-hop headers that belong to the upstream connection
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - End-to-end headers are passed through unmodified

use axum::body::Body;
use axum::http::Response;
use hyper::body::Incoming;

use crate::http::request::remove_hop_by_hop;

/// Convert an upstream response into the response sent to the caller.
pub fn relay_response(response: Response<Incoming>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    remove_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
