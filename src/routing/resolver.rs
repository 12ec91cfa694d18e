//! Per-request upstream resolution.

use std::fmt;
use std::sync::Arc;

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::Uri;
use thiserror::Error;

use crate::directory::{DirectoryClient, Instance};
use crate::observability::metrics;
use crate::routing::host::virtual_host;

/// Port assumed for a fallback host without an explicit one.
const DEFAULT_HTTP_PORT: u16 = 80;

/// Where a routing target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    /// A healthy instance reported by the directory.
    Directory,
    /// The original host, resolved by ordinary name resolution.
    Fallback,
}

impl RouteSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteSource::Directory => "directory",
            RouteSource::Fallback => "fallback",
        }
    }
}

/// Errors that make a request unroutable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("unparsable host {0:?}")]
    InvalidHost(String),
}

/// A resolved upstream address for exactly one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTarget {
    /// Host in URI form (IPv6 literals bracketed).
    host: String,
    port: u16,
    source: RouteSource,
}

impl RoutingTarget {
    /// Target pointing at a discovered instance.
    pub fn from_instance(instance: &Instance) -> Self {
        let host = if instance.ip.contains(':') && !instance.ip.starts_with('[') {
            format!("[{}]", instance.ip)
        } else {
            instance.ip.clone()
        };
        Self {
            host,
            port: instance.port,
            source: RouteSource::Directory,
        }
    }

    /// Target that treats the original host as a directly resolvable address.
    ///
    /// A port that is present but not a valid `u16` makes the host unparsable;
    /// only a missing or empty port means port 80.
    pub fn literal(host: &str) -> Result<Self, RoutingError> {
        let invalid = || RoutingError::InvalidHost(host.to_string());
        let authority: Authority = host.parse().map_err(|_| invalid())?;
        if authority.host().is_empty() {
            return Err(invalid());
        }

        let port = match port_text(authority.as_str()) {
            "" => DEFAULT_HTTP_PORT,
            text => text.parse::<u16>().map_err(|_| invalid())?,
        };

        Ok(Self {
            host: authority.host().to_string(),
            port,
            source: RouteSource::Fallback,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn source(&self) -> RouteSource {
        self.source
    }

    /// Absolute `http://` URI for the upstream request.
    pub fn uri(&self, path_and_query: Option<&PathAndQuery>) -> Result<Uri, RoutingError> {
        let authority: Authority = self
            .to_string()
            .parse()
            .map_err(|_| RoutingError::InvalidHost(self.to_string()))?;
        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(authority)
            .path_and_query(path_and_query.map(PathAndQuery::as_str).unwrap_or("/"))
            .build()
            .map_err(|_| RoutingError::InvalidHost(self.to_string()))
    }
}

/// Text after the port separator of an authority, empty when there is none.
fn port_text(authority: &str) -> &str {
    let host_end = authority.rfind(']').map_or(0, |i| i + 1);
    match authority[host_end..].rfind(':') {
        Some(i) => &authority[host_end + i + 1..],
        None => "",
    }
}

impl fmt::Display for RoutingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Turns a request's host into an upstream address via the directory.
#[derive(Clone)]
pub struct RoutingResolver {
    directory: Arc<dyn DirectoryClient>,
}

impl RoutingResolver {
    pub fn new(directory: Arc<dyn DirectoryClient>) -> Self {
        Self { directory }
    }

    /// Resolve the original `host` value of a request.
    ///
    /// The directory is asked for a healthy instance of the service named
    /// like the virtual host. Any lookup failure falls back to `host` itself;
    /// only an unparsable fallback is an error.
    pub async fn resolve(&self, host: &str) -> Result<RoutingTarget, RoutingError> {
        let name = virtual_host(host);

        if !name.is_empty() {
            match self.directory.select_one_healthy(name).await {
                Ok(instance) => {
                    let target = RoutingTarget::from_instance(&instance);
                    tracing::debug!(service = %name, target = %target, "Resolved via directory");
                    metrics::record_route(RouteSource::Directory);
                    return Ok(target);
                }
                Err(e) => {
                    tracing::debug!(service = %name, error = %e, "Directory lookup failed, falling back to host");
                }
            }
        }

        let target = RoutingTarget::literal(host)?;
        metrics::record_route(RouteSource::Fallback);
        Ok(target)
    }
}
