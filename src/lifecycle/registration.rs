//! Health-driven registration of the local instance.
//!
//! # Responsibilities
//! - Block until the application first answers, then register it
//! - Sample liveness every tick and flip the directory `enabled` flag
//! - Retry directory updates until they stick
//! - Deregister exactly once on shutdown
//!
//! # Design Decisions
//! - The record stays in the directory while unhealthy (enabled=false) so
//!   cluster and weight metadata survive
//! - The shutdown flag is sampled once per iteration and also cuts sleeps short
//! - Deregistration is best-effort: logged, never retried

use std::sync::Arc;

use crate::config::LifecycleConfig;
use crate::directory::{DirectoryClient, Instance};
use crate::health::LivenessProbe;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::lifecycle::state::SidecarState;
use crate::observability::metrics;
use crate::resilience::retry_until_success;

/// Keeps the directory's view of the local instance in step with its liveness.
pub struct SidecarLifecycle {
    directory: Arc<dyn DirectoryClient>,
    probe: Arc<dyn LivenessProbe>,
    /// Last successfully applied record.
    instance: Instance,
    timing: LifecycleConfig,
    state: SidecarState,
}

impl SidecarLifecycle {
    pub fn new(
        instance: Instance,
        directory: Arc<dyn DirectoryClient>,
        probe: Arc<dyn LivenessProbe>,
        timing: LifecycleConfig,
    ) -> Self {
        Self {
            directory,
            probe,
            instance,
            timing,
            state: SidecarState::Unregistered,
        }
    }

    pub fn state(&self) -> SidecarState {
        self.state
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Drive the instance through its whole lifetime.
    ///
    /// Returns once shutdown has been handled; the final state is always
    /// [`SidecarState::ShuttingDown`].
    pub async fn run(mut self, mut shutdown: ShutdownSignal) -> SidecarState {
        tracing::info!(
            service = %self.instance.service_name,
            cluster = %self.instance.cluster_name,
            instance = %self.instance,
            directory = self.directory.name(),
            "Sidecar lifecycle starting"
        );

        if self.wait_until_alive(&mut shutdown).await
            && self
                .transition(SidecarState::RegisteredHealthy, &mut shutdown)
                .await
        {
            loop {
                if shutdown.sleep(self.timing.probe_interval()).await {
                    break;
                }
                if !self.tick(&mut shutdown).await {
                    break;
                }
            }
        }

        self.shut_down().await;
        self.state
    }

    /// Startup gate: poll liveness until the application answers.
    ///
    /// Returns false if shutdown arrives first.
    pub async fn wait_until_alive(&mut self, shutdown: &mut ShutdownSignal) -> bool {
        loop {
            if shutdown.is_triggered() {
                return false;
            }
            let alive = self.probe.is_alive().await;
            metrics::record_liveness(alive);
            if alive {
                tracing::info!(instance = %self.instance, "Application ready");
                return true;
            }
            tracing::info!(port = self.instance.port, "Waiting for application to accept connections");
            if shutdown.sleep(self.timing.probe_interval()).await {
                return false;
            }
        }
    }

    /// One monitoring iteration: probe, compare, update the directory if needed.
    ///
    /// Returns false if shutdown interrupted a pending directory update.
    pub async fn tick(&mut self, shutdown: &mut ShutdownSignal) -> bool {
        if shutdown.is_triggered() {
            return false;
        }
        let alive = self.probe.is_alive().await;
        metrics::record_liveness(alive);

        match self.state.on_sample(alive) {
            Some(next) => self.transition(next, shutdown).await,
            None => true,
        }
    }

    async fn transition(&mut self, next: SidecarState, shutdown: &mut ShutdownSignal) -> bool {
        let Some(enabled) = next.enabled() else {
            return true;
        };
        let record = self.instance.clone().with_healthy(true).with_enabled(enabled);
        let directory = Arc::clone(&self.directory);

        let applied = retry_until_success("register", self.timing.retry_interval(), shutdown, || {
            let directory = Arc::clone(&directory);
            let record = record.clone();
            async move { directory.register(&record).await }
        })
        .await;

        if applied.is_none() {
            return false;
        }

        tracing::info!(
            instance = %record,
            service = %record.service_name,
            from = %self.state,
            to = %next,
            enabled,
            "Directory record updated"
        );
        metrics::record_transition(next.as_str());
        self.instance = record;
        self.state = next;
        true
    }

    async fn shut_down(&mut self) {
        let previous = self.state;
        self.state = SidecarState::ShuttingDown;
        metrics::record_transition(self.state.as_str());

        if !previous.is_registered() {
            tracing::info!("Shutting down before registration; nothing to deregister");
            return;
        }

        match self.directory.deregister(&self.instance).await {
            Ok(()) => tracing::info!(instance = %self.instance, "Instance deregistered"),
            Err(e) => tracing::warn!(instance = %self.instance, error = %e, "Deregistration failed; leaving expiry to the directory"),
        }
    }
}
