//! In-process directory.
//!
//! Keeps instances in memory keyed by (service, cluster, ip, port). Every call
//! is journaled and failures can be injected per operation, which makes it
//! the backend of choice for exercising the lifecycle and routing layers
//! without a discovery server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::directory::types::{DirectoryError, DirectoryResult, Instance};
use crate::directory::DirectoryClient;

/// A journaled directory call and its outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryCall {
    Select { service: String, ok: bool },
    Register { instance: Instance, ok: bool },
    Deregister { instance: Instance, ok: bool },
}

impl DirectoryCall {
    pub fn is_register(&self) -> bool {
        matches!(self, DirectoryCall::Register { .. })
    }

    pub fn is_deregister(&self) -> bool {
        matches!(self, DirectoryCall::Deregister { .. })
    }

    pub fn succeeded(&self) -> bool {
        match self {
            DirectoryCall::Select { ok, .. }
            | DirectoryCall::Register { ok, .. }
            | DirectoryCall::Deregister { ok, .. } => *ok,
        }
    }
}

#[derive(Default)]
struct FailureBudget {
    select: AtomicUsize,
    register: AtomicUsize,
    deregister: AtomicUsize,
}

fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Directory held entirely in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    /// Instances indexed by service name.
    services: Arc<RwLock<HashMap<String, Vec<Instance>>>>,
    journal: Arc<RwLock<Vec<DirectoryCall>>>,
    failures: Arc<FailureBudget>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` select calls fail as if the directory were down.
    pub fn fail_selects(&self, n: usize) {
        self.failures.select.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` register calls fail.
    pub fn fail_registrations(&self, n: usize) {
        self.failures.register.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` deregister calls fail.
    pub fn fail_deregistrations(&self, n: usize) {
        self.failures.deregister.store(n, Ordering::SeqCst);
    }

    /// Look up the stored record matching `probe`'s identity.
    pub async fn get(&self, probe: &Instance) -> Option<Instance> {
        let services = self.services.read().await;
        services
            .get(&probe.service_name)?
            .iter()
            .find(|i| i.same_identity(probe))
            .cloned()
    }

    /// All records registered for a service.
    pub async fn instances(&self, service: &str) -> Vec<Instance> {
        let services = self.services.read().await;
        services.get(service).cloned().unwrap_or_default()
    }

    /// Every call made so far, oldest first.
    pub async fn calls(&self) -> Vec<DirectoryCall> {
        self.journal.read().await.clone()
    }

    async fn record(&self, call: DirectoryCall) {
        self.journal.write().await.push(call);
    }
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    async fn select_one_healthy(&self, service: &str) -> DirectoryResult<Instance> {
        if take(&self.failures.select) {
            self.record(DirectoryCall::Select {
                service: service.to_string(),
                ok: false,
            })
            .await;
            return Err(DirectoryError::Unavailable("injected failure".into()));
        }

        let found = {
            let services = self.services.read().await;
            services
                .get(service)
                .and_then(|instances| instances.iter().find(|i| i.is_routable()).cloned())
        };

        self.record(DirectoryCall::Select {
            service: service.to_string(),
            ok: found.is_some(),
        })
        .await;

        found.ok_or_else(|| DirectoryError::NotFound(service.to_string()))
    }

    async fn register(&self, instance: &Instance) -> DirectoryResult<()> {
        if take(&self.failures.register) {
            self.record(DirectoryCall::Register {
                instance: instance.clone(),
                ok: false,
            })
            .await;
            return Err(DirectoryError::Unavailable("injected failure".into()));
        }

        {
            let mut services = self.services.write().await;
            let entries = services.entry(instance.service_name.clone()).or_default();
            match entries.iter_mut().find(|i| i.same_identity(instance)) {
                Some(existing) => *existing = instance.clone(),
                None => entries.push(instance.clone()),
            }
        }

        debug!(instance = %instance, service = %instance.service_name, enabled = instance.enabled, "Registered instance");
        self.record(DirectoryCall::Register {
            instance: instance.clone(),
            ok: true,
        })
        .await;
        Ok(())
    }

    async fn deregister(&self, instance: &Instance) -> DirectoryResult<()> {
        if take(&self.failures.deregister) {
            self.record(DirectoryCall::Deregister {
                instance: instance.clone(),
                ok: false,
            })
            .await;
            return Err(DirectoryError::Unavailable("injected failure".into()));
        }

        {
            let mut services = self.services.write().await;
            if let Some(entries) = services.get_mut(&instance.service_name) {
                entries.retain(|i| !i.same_identity(instance));
                if entries.is_empty() {
                    services.remove(&instance.service_name);
                }
            }
        }

        debug!(instance = %instance, service = %instance.service_name, "Deregistered instance");
        self.record(DirectoryCall::Deregister {
            instance: instance.clone(),
            ok: true,
        })
        .await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
