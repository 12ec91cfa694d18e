//! Nacos directory backend over the v1 HTTP open API.
//!
//! # Responsibilities
//! - Register, update and deregister instances
//! - Select one healthy instance per service (weighted random)
//! - Keep ephemeral registrations alive with periodic heartbeats
//! - Fail over across the configured directory servers
//!
//! # Design Decisions
//! - The full host list is fetched and filtered here, so an instance that
//!   turns unhealthy replaces its cached copy instead of vanishing from it
//! - Last non-empty host list per service is cached; an empty answer never
//!   clears it and a failed fetch falls back to it
//! - Each call starts at a random server and walks the rest on transport errors
//! - A heartbeat answered with "unknown instance" re-registers the instance

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time;
use url::Url;

use crate::config::DirectoryConfig;
use crate::directory::types::{DirectoryError, DirectoryResult, Instance};
use crate::directory::DirectoryClient;

const INSTANCE_PATH: &str = "v1/ns/instance";
const INSTANCE_LIST_PATH: &str = "v1/ns/instance/list";
const BEAT_PATH: &str = "v1/ns/instance/beat";

/// Beat response code meaning the server no longer knows the instance.
const CODE_RESOURCE_NOT_FOUND: i32 = 20404;

#[derive(Debug, Deserialize)]
struct ServiceInfo {
    #[serde(default)]
    hosts: Vec<Instance>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BeatInfo<'a> {
    ip: &'a str,
    port: u16,
    service_name: String,
    cluster: &'a str,
    weight: f64,
    scheduled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BeatResponse {
    #[serde(default)]
    code: i32,
}

struct Inner {
    http: reqwest::Client,
    /// Base URLs ending in the context path, e.g. `http://10.0.0.1:8848/nacos/`.
    servers: Vec<Url>,
    namespace: String,
    group: String,
    beat_interval: Duration,
}

/// Directory client for a Nacos cluster.
pub struct NacosDirectory {
    inner: Arc<Inner>,
    /// Last non-empty host list per service.
    cache: DashMap<String, Vec<Instance>>,
    /// Running heartbeat per registered instance.
    beats: DashMap<String, JoinHandle<()>>,
}

impl NacosDirectory {
    /// Build a client for the configured servers.
    ///
    /// Fails only when the configuration cannot describe a usable client.
    pub fn new(config: &DirectoryConfig, group: &str) -> DirectoryResult<Self> {
        if config.server_addresses.is_empty() {
            return Err(DirectoryError::Config("no directory servers configured".into()));
        }

        let servers = config
            .server_addresses
            .iter()
            .map(|addr| server_url(addr, &config.context_path))
            .collect::<DirectoryResult<Vec<_>>>()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DirectoryError::Config(format!("failed to create HTTP client: {e}")))?;

        tracing::info!(
            servers = ?config.server_addresses,
            namespace = %config.namespace,
            group = %group,
            "Nacos directory client created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                servers,
                namespace: config.namespace.clone(),
                group: group.to_string(),
                beat_interval: config.beat_interval(),
            }),
            cache: DashMap::new(),
            beats: DashMap::new(),
        })
    }

    /// Number of instances currently kept alive by heartbeats.
    pub fn heartbeat_count(&self) -> usize {
        self.beats.len()
    }

    fn start_heartbeat(&self, instance: &Instance) {
        let inner = Arc::clone(&self.inner);
        let beat_instance = instance.clone();
        let handle = tokio::spawn(async move {
            beat_loop(inner, beat_instance).await;
        });
        if let Some(previous) = self.beats.insert(beat_key(instance), handle) {
            previous.abort();
        }
    }

    fn stop_heartbeat(&self, instance: &Instance) {
        if let Some((_, handle)) = self.beats.remove(&beat_key(instance)) {
            handle.abort();
        }
    }
}

impl Drop for NacosDirectory {
    fn drop(&mut self) {
        for entry in self.beats.iter() {
            entry.value().abort();
        }
    }
}

#[async_trait]
impl DirectoryClient for NacosDirectory {
    async fn select_one_healthy(&self, service: &str) -> DirectoryResult<Instance> {
        let fetch_error = match self.inner.list_instances(service).await {
            Ok(hosts) if hosts.is_empty() => {
                tracing::debug!(service = %service, "Directory returned no hosts, keeping cached list");
                None
            }
            Ok(hosts) => {
                self.cache.insert(service.to_string(), hosts);
                None
            }
            Err(e) => {
                tracing::warn!(service = %service, error = %e, "Instance list fetch failed, using cached list");
                Some(e)
            }
        };

        let cached = self.cache.get(service).map(|entry| entry.value().clone());
        match (cached, fetch_error) {
            (Some(hosts), _) => {
                choose_weighted(&hosts).ok_or_else(|| DirectoryError::NotFound(service.to_string()))
            }
            (None, Some(e)) => Err(e),
            (None, None) => Err(DirectoryError::NotFound(service.to_string())),
        }
    }

    async fn register(&self, instance: &Instance) -> DirectoryResult<()> {
        self.inner.register(instance).await?;
        if instance.ephemeral {
            self.start_heartbeat(instance);
        }
        Ok(())
    }

    async fn deregister(&self, instance: &Instance) -> DirectoryResult<()> {
        self.stop_heartbeat(instance);
        self.inner
            .call(
                "deregister",
                Method::DELETE,
                INSTANCE_PATH,
                &[
                    ("serviceName", instance.service_name.clone()),
                    ("groupName", self.inner.group.clone()),
                    ("namespaceId", self.inner.namespace.clone()),
                    ("clusterName", instance.cluster_name.clone()),
                    ("ip", instance.ip.clone()),
                    ("port", instance.port.to_string()),
                    ("ephemeral", instance.ephemeral.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "nacos"
    }
}

impl Inner {
    async fn register(&self, instance: &Instance) -> DirectoryResult<()> {
        let body = self
            .call(
                "register",
                Method::POST,
                INSTANCE_PATH,
                &[
                    ("serviceName", instance.service_name.clone()),
                    ("groupName", self.group.clone()),
                    ("namespaceId", self.namespace.clone()),
                    ("clusterName", instance.cluster_name.clone()),
                    ("ip", instance.ip.clone()),
                    ("port", instance.port.to_string()),
                    ("weight", instance.weight.to_string()),
                    ("healthy", instance.healthy.to_string()),
                    ("enabled", instance.enabled.to_string()),
                    ("ephemeral", instance.ephemeral.to_string()),
                ],
            )
            .await?;

        if body.trim() != "ok" {
            return Err(DirectoryError::Rejected {
                operation: "register",
                status: 200,
                body,
            });
        }
        Ok(())
    }

    async fn list_instances(&self, service: &str) -> DirectoryResult<Vec<Instance>> {
        let body = self
            .call(
                "select",
                Method::GET,
                INSTANCE_LIST_PATH,
                &[
                    ("serviceName", service.to_string()),
                    ("groupName", self.group.clone()),
                    ("namespaceId", self.namespace.clone()),
                    ("healthyOnly", "false".to_string()),
                ],
            )
            .await?;

        let info: ServiceInfo =
            serde_json::from_str(&body).map_err(|e| DirectoryError::Decode(e.to_string()))?;
        Ok(info.hosts)
    }

    async fn send_beat(&self, instance: &Instance) -> DirectoryResult<BeatResponse> {
        let grouped = format!("{}@@{}", self.group, instance.service_name);
        let beat = BeatInfo {
            ip: &instance.ip,
            port: instance.port,
            service_name: grouped.clone(),
            cluster: &instance.cluster_name,
            weight: instance.weight,
            scheduled: false,
        };
        let beat = serde_json::to_string(&beat).map_err(|e| DirectoryError::Decode(e.to_string()))?;

        let body = self
            .call(
                "beat",
                Method::PUT,
                BEAT_PATH,
                &[
                    ("serviceName", grouped),
                    ("groupName", self.group.clone()),
                    ("namespaceId", self.namespace.clone()),
                    ("beat", beat),
                ],
            )
            .await?;

        serde_json::from_str(&body).map_err(|e| DirectoryError::Decode(e.to_string()))
    }

    /// Issue one API call, failing over across servers on transport errors.
    async fn call(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> DirectoryResult<String> {
        let count = self.servers.len();
        let start = rand::thread_rng().gen_range(0..count);
        let mut last_error = String::from("no servers tried");

        for offset in 0..count {
            let base = &self.servers[(start + offset) % count];
            let url = base
                .join(path)
                .map_err(|e| DirectoryError::Config(format!("invalid API path {path}: {e}")))?;

            match self.http.request(method.clone(), url).query(params).send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| DirectoryError::Decode(e.to_string()))?;
                    if status.is_success() {
                        return Ok(body);
                    }
                    return Err(DirectoryError::Rejected {
                        operation,
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(e) => {
                    tracing::warn!(server = %base, operation, error = %e, "Directory server unreachable, trying next");
                    last_error = e.to_string();
                }
            }
        }

        Err(DirectoryError::Unavailable(last_error))
    }
}

async fn beat_loop(inner: Arc<Inner>, instance: Instance) {
    let mut ticker = time::interval(inner.beat_interval);
    // The first tick completes immediately; registration just happened.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match inner.send_beat(&instance).await {
            Ok(response) if response.code == CODE_RESOURCE_NOT_FOUND => {
                tracing::warn!(instance = %instance, service = %instance.service_name, "Directory lost instance, re-registering");
                if let Err(e) = inner.register(&instance).await {
                    tracing::warn!(instance = %instance, error = %e, "Re-registration from heartbeat failed");
                }
            }
            Ok(_) => tracing::trace!(instance = %instance, "Heartbeat sent"),
            Err(e) => tracing::warn!(instance = %instance, error = %e, "Heartbeat failed"),
        }
    }
}

fn beat_key(instance: &Instance) -> String {
    format!("{}#{}#{}", instance.service_name, instance.cluster_name, instance)
}

fn server_url(addr: &str, context_path: &str) -> DirectoryResult<Url> {
    let base = if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    };
    let context = context_path.trim_matches('/');
    let full = if context.is_empty() {
        format!("{}/", base.trim_end_matches('/'))
    } else {
        format!("{}/{}/", base.trim_end_matches('/'), context)
    };
    Url::parse(&full).map_err(|e| DirectoryError::Config(format!("invalid server address {addr:?}: {e}")))
}

/// Weighted random pick among routable hosts.
fn choose_weighted(hosts: &[Instance]) -> Option<Instance> {
    let candidates: Vec<&Instance> = hosts.iter().filter(|i| i.is_routable()).collect();
    if candidates.is_empty() {
        return None;
    }
    let index = WeightedIndex::new(candidates.iter().map(|i| i.weight)).ok()?;
    let picked = index.sample(&mut rand::thread_rng());
    Some(candidates[picked].clone())
}
