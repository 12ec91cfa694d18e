//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::SidecarConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read configuration from a TOML file without validating it.
///
/// Command-line overrides are applied on top of the result before
/// [`finalize`] runs the semantic checks.
pub fn read_config(path: &Path) -> Result<SidecarConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: SidecarConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Validate a merged configuration and freeze it for use.
pub fn finalize(config: SidecarConfig) -> Result<SidecarConfig, ConfigError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_and_finalizes_file() {
        let path = std::env::temp_dir().join(format!("sidecar-config-{}.toml", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[application]
ip = "10.0.0.7"
port = 9000

[registration]
service = "orders"
cluster = "blue"

[directory]
server_addresses = ["10.0.0.1:8848", "10.0.0.2:8848"]
namespace = "myns"
"#
        )
        .unwrap();

        let config = finalize(read_config(&path).unwrap()).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.application.ip, "10.0.0.7");
        assert_eq!(config.registration.cluster, "blue");
        assert_eq!(config.directory.server_addresses.len(), 2);
        assert_eq!(config.directory.namespace, "myns");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_config(Path::new("/nonexistent/sidecar.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = finalize(SidecarConfig::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("application.port must be set"));
        assert!(message.contains("registration.service must not be empty"));
    }
}
