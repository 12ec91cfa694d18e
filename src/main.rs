//! Service-discovery sidecar (v1)
//!
//! Runs next to one application instance, registers it with the service
//! directory while it answers on its port, and proxies outbound calls by
//! virtual host.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                   SIDECAR                    │
//!                         │                                              │
//!   Outbound call         │  ┌─────────┐    ┌───────────┐                │
//!   Host: orders ─────────┼─▶│  http   │───▶│  routing  │── lookup ──────┼──▶ Directory
//!                         │  │ server  │    │ resolver  │◀─ instance ────┼──  (Nacos)
//!                         │  └────┬────┘    └───────────┘                │      ▲
//!                         │       │ fresh connection                     │      │
//!   Upstream ◀────────────┼───────┘                                      │      │
//!                         │                                              │      │
//!                         │  ┌──────────┐   ┌─────────────────────────┐  │      │
//!   Local app ◀── probe ──┼──│  health  │──▶│ lifecycle (register,    │──┼──────┘
//!                         │  │   TCP    │   │ enable/disable, dereg)  │  │
//!                         │  └──────────┘   └─────────────────────────┘  │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use discovery_sidecar::config::{loader, SidecarConfig};
use discovery_sidecar::lifecycle::startup;
use discovery_sidecar::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "discovery-sidecar", version, about = "Service-discovery sidecar and dynamic reverse proxy")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IP address the application is reachable on
    #[arg(long)]
    ip: Option<String>,

    /// Port the application listens on
    #[arg(short, long)]
    port: Option<u16>,

    /// Service name to register under
    #[arg(short, long)]
    service: Option<String>,

    /// Cluster name to register under
    #[arg(long)]
    cluster: Option<String>,

    /// Directory group
    #[arg(long)]
    group: Option<String>,

    /// Proxy listen address
    #[arg(long)]
    listen: Option<String>,

    /// Directory server address (host:port), repeatable
    #[arg(long = "server-addr")]
    server_addrs: Vec<String>,

    /// Directory namespace
    #[arg(long)]
    namespace: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, mut config: SidecarConfig) -> SidecarConfig {
        if let Some(ip) = self.ip {
            config.application.ip = ip;
        }
        if let Some(port) = self.port {
            config.application.port = port;
        }
        if let Some(service) = self.service {
            config.registration.service = service;
        }
        if let Some(cluster) = self.cluster {
            config.registration.cluster = cluster;
        }
        if let Some(group) = self.group {
            config.registration.group = group;
        }
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if !self.server_addrs.is_empty() {
            config.directory.server_addresses = self.server_addrs;
        }
        if let Some(namespace) = self.namespace {
            config.directory.namespace = namespace;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();

    let base = match cli.config.take() {
        Some(path) => loader::read_config(&path)?,
        None => SidecarConfig::default(),
    };
    let config = loader::finalize(cli.apply(base))?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("discovery-sidecar v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;
    Ok(())
}
