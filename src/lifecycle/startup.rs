//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the proxy listener
//! - Initialize the directory client and metrics exporter
//! - Start the proxy and the registration lifecycle side by side
//! - Tear both down once shutdown has been handled
//!
//! # Design Decisions
//! - Fail fast only on bind and directory construction errors
//! - Directory outages after startup are retried, never fatal
//! - The proxy serves traffic while the lifecycle waits for the application

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::SidecarConfig;
use crate::directory::{DirectoryClient, DirectoryError, Instance, NacosDirectory};
use crate::health::TcpProbe;
use crate::http::ProxyServer;
use crate::lifecycle::registration::SidecarLifecycle;
use crate::lifecycle::shutdown::{Shutdown, ShutdownSignal};
use crate::lifecycle::signals::listen_for_signals;
use crate::lifecycle::state::SidecarState;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("directory client: {0}")]
    Directory(#[from] DirectoryError),
}

/// A bound, not yet running sidecar.
pub struct Sidecar {
    config: SidecarConfig,
    directory: Arc<dyn DirectoryClient>,
    listener: TcpListener,
}

impl Sidecar {
    /// Bind the proxy listener from `config`.
    pub async fn bind(
        config: SidecarConfig,
        directory: Arc<dyn DirectoryClient>,
    ) -> Result<Self, StartupError> {
        let addr = config.listener.bind_address.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;

        Ok(Self {
            config,
            directory,
            listener,
        })
    }

    /// Address the proxy actually listens on.
    pub fn proxy_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve and keep the registration in step until `shutdown` fires.
    ///
    /// Returns the lifecycle's final state. The proxy stops accepting as soon
    /// as deregistration has been attempted.
    pub async fn run(self, shutdown: ShutdownSignal) -> SidecarState {
        let Sidecar {
            config,
            directory,
            listener,
        } = self;

        let server = ProxyServer::new(&config, Arc::clone(&directory));
        let server_task = tokio::spawn(async move {
            if let Err(e) = server.run(listener).await {
                tracing::error!(error = %e, "Proxy server failed");
            }
        });

        let probe = Arc::new(TcpProbe::new(
            config.application.port,
            config.lifecycle.probe_timeout(),
        ));
        let lifecycle = SidecarLifecycle::new(
            Instance::local(&config.application, &config.registration),
            directory,
            probe,
            config.lifecycle.clone(),
        );

        let state = lifecycle.run(shutdown).await;

        server_task.abort();
        state
    }
}

/// Run the sidecar against the configured Nacos servers until a termination
/// signal arrives.
pub async fn run(config: SidecarConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let directory: Arc<dyn DirectoryClient> = Arc::new(NacosDirectory::new(
        &config.directory,
        &config.registration.group,
    )?);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        app_port = config.application.port,
        service = %config.registration.service,
        cluster = %config.registration.cluster,
        servers = ?config.directory.server_addresses,
        "Configuration loaded"
    );

    let sidecar = Sidecar::bind(config, directory).await?;

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let signals = listen_for_signals(shutdown);

    let state = sidecar.run(signal).await;
    signals.abort();

    tracing::info!(state = %state, "Shutdown complete");
    Ok(())
}
