//! Service-discovery sidecar library.

pub mod config;
pub mod directory;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::schema::SidecarConfig;
pub use directory::{DirectoryClient, Instance};
pub use http::ProxyServer;
pub use lifecycle::{Shutdown, Sidecar, SidecarState};
