//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header)
//!     → host.rs (original host, virtual-host name without port)
//!     → resolver.rs (directory lookup keyed by the name)
//!         ├─ healthy instance found → RoutingTarget(ip, port)
//!         └─ lookup failed          → RoutingTarget(original host, literal)
//!     → Return: RoutingTarget or RoutingError (unparsable host)
//! ```
//!
//! # Design Decisions
//! - Every request re-resolves; no target is cached here
//! - Discovery failures degrade to ordinary name resolution
//! - Only an unparsable fallback host fails the request

pub mod host;
pub mod resolver;

pub use host::{request_host, virtual_host};
pub use resolver::{RouteSource, RoutingError, RoutingResolver, RoutingTarget};
