//! Directory record types and error definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ApplicationConfig, RegistrationConfig};

/// A directory-visible service instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub ip: String,
    pub port: u16,
    pub service_name: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_true")]
    pub healthy: bool,
    /// Availability for routing, independent of health.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// The directory drops the record if its owner disappears.
    #[serde(default = "default_true")]
    pub ephemeral: bool,
}

fn default_weight() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Instance {
    /// Create a healthy, enabled, ephemeral instance with weight 1.
    pub fn new(ip: impl Into<String>, port: u16, service_name: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            port,
            service_name: service_name.into(),
            cluster_name: String::new(),
            weight: 1.0,
            healthy: true,
            enabled: true,
            ephemeral: true,
        }
    }

    /// The record the sidecar owns for its colocated application.
    pub fn local(application: &ApplicationConfig, registration: &RegistrationConfig) -> Self {
        Self {
            cluster_name: registration.cluster.clone(),
            weight: registration.weight,
            ..Self::new(
                application.ip.clone(),
                application.port,
                registration.service.clone(),
            )
        }
    }

    #[must_use]
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster_name = cluster.into();
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_healthy(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Whether the directory should hand this instance out for routing.
    pub fn is_routable(&self) -> bool {
        self.healthy && self.enabled && self.weight > 0.0
    }

    /// True when both records describe the same (service, cluster, ip, port).
    pub fn same_identity(&self, other: &Instance) -> bool {
        self.ip == other.ip
            && self.port == other.port
            && self.service_name == other.service_name
            && self.cluster_name == other.cluster_name
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ip.contains(':') {
            write!(f, "[{}]:{}", self.ip, self.port)
        } else {
            write!(f, "{}:{}", self.ip, self.port)
        }
    }
}

/// Errors returned by a directory backend.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No routable instance is registered for the service.
    #[error("no healthy instance for service {0:?}")]
    NotFound(String),

    /// Every configured directory server failed at the transport level.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// The directory answered but refused the call.
    #[error("directory rejected {operation}: {status} {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The directory answered with a payload we could not read.
    #[error("invalid directory response: {0}")]
    Decode(String),

    /// The client could not be constructed from its configuration.
    #[error("directory client misconfigured: {0}")]
    Config(String),
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_instance_takes_registration_fields() {
        let application = ApplicationConfig {
            ip: "10.1.2.3".into(),
            port: 8080,
        };
        let registration = RegistrationConfig {
            service: "orders".into(),
            cluster: "blue".into(),
            ..RegistrationConfig::default()
        };

        let instance = Instance::local(&application, &registration);
        assert_eq!(instance.to_string(), "10.1.2.3:8080");
        assert_eq!(instance.cluster_name, "blue");
        assert!(instance.healthy && instance.enabled && instance.ephemeral);
    }

    #[test]
    fn test_routable_requires_health_enabled_and_weight() {
        let instance = Instance::new("10.0.0.5", 8080, "orders");
        assert!(instance.is_routable());
        assert!(!instance.clone().with_enabled(false).is_routable());
        assert!(!instance.clone().with_healthy(false).is_routable());
        assert!(!instance.with_weight(0.0).is_routable());
    }

    #[test]
    fn test_ipv6_display_is_bracketed() {
        let instance = Instance::new("fe80::1", 9000, "orders");
        assert_eq!(instance.to_string(), "[fe80::1]:9000");
    }

    #[test]
    fn test_decodes_directory_host_json() {
        let json = r#"{"ip":"10.0.0.5","port":8080,"serviceName":"DEFAULT_GROUP@@orders",
            "clusterName":"DEFAULT","weight":2.0,"healthy":true,"enabled":false,
            "ephemeral":true,"instanceId":"x","metadata":{}}"#;
        let instance: Instance = serde_json::from_str(json).unwrap();
        assert_eq!(instance.port, 8080);
        assert_eq!(instance.weight, 2.0);
        assert!(!instance.enabled);
    }
}
