//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sidecar.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the sidecar.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SidecarConfig {
    /// Proxy listener configuration.
    pub listener: ListenerConfig,

    /// The colocated application this sidecar manages.
    pub application: ApplicationConfig,

    /// How the application is advertised in the directory.
    pub registration: RegistrationConfig,

    /// Service-discovery backend settings.
    pub directory: DirectoryConfig,

    /// Liveness monitoring cadence.
    pub lifecycle: LifecycleConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:1500").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:1500".to_string(),
        }
    }
}

/// Local application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// IP advertised to the directory for this instance.
    pub ip: String,

    /// Port the application listens on. Probed on loopback.
    pub port: u16,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 0,
        }
    }
}

/// Directory registration settings for the local instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Service name the instance registers under.
    pub service: String,

    /// Cluster name within the service.
    pub cluster: String,

    /// Directory group.
    pub group: String,

    /// Weight advertised with the instance.
    pub weight: f64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            service: String::new(),
            cluster: String::new(),
            group: "DEFAULT_GROUP".to_string(),
            weight: 1.0,
        }
    }
}

/// Service-discovery backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Directory server addresses (host:port).
    pub server_addresses: Vec<String>,

    /// Namespace identifier. Empty selects the public namespace.
    pub namespace: String,

    /// HTTP context path of the directory API.
    pub context_path: String,

    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,

    /// Heartbeat interval for ephemeral registrations in milliseconds.
    pub beat_interval_ms: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            server_addresses: vec!["127.0.0.1:8848".to_string()],
            namespace: String::new(),
            context_path: "/nacos".to_string(),
            timeout_ms: 5000,
            beat_interval_ms: 5000,
        }
    }
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn beat_interval(&self) -> Duration {
        Duration::from_millis(self.beat_interval_ms)
    }
}

/// Liveness monitoring and registration retry cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Delay between liveness samples in milliseconds.
    pub probe_interval_ms: u64,

    /// Connect timeout of a single liveness probe in milliseconds.
    pub probe_timeout_ms: u64,

    /// Delay between failed directory updates in milliseconds.
    pub retry_interval_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: 1000,
            probe_timeout_ms: 1000,
            retry_interval_ms: 1000,
        }
    }
}

impl LifecycleConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Timeout configuration for outbound proxy connections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_secs: 5 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
