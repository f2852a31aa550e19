//! Configuration for the exporter.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Management-interface connection settings.
    #[serde(default)]
    pub mi: MiConfig,

    /// Prometheus endpoint settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Management-interface connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiConfig {
    /// UDP address of the OpenSIPS `mi_datagram` socket
    /// (default: "127.0.0.1:8080").
    #[serde(default = "default_mi_address")]
    pub address: String,

    /// How long to wait for a management-interface reply (seconds).
    #[serde(default = "default_mi_timeout")]
    pub timeout_secs: u64,
}

fn default_mi_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_mi_timeout() -> u64 {
    5
}

impl Default for MiConfig {
    fn default() -> Self {
        Self {
            address: default_mi_address(),
            timeout_secs: default_mi_timeout(),
        }
    }
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0:9434").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for the metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,

    /// Metric namespace (default: "opensips").
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_listen() -> String {
    "0.0.0.0:9434".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

fn default_namespace() -> String {
    "opensips".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            namespace: default_namespace(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ExporterConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .prometheus
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen
            )));
        }

        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if !valid_namespace(&self.prometheus.namespace) {
            return Err(ConfigError::Validation(format!(
                "Invalid metric namespace: {}",
                self.prometheus.namespace
            )));
        }

        if self.mi.address.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid management interface address: {}",
                self.mi.address
            )));
        }

        if self.mi.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Namespaces must be valid metric-name prefixes: `[a-zA-Z_][a-zA-Z0-9_]*`.
fn valid_namespace(namespace: &str) -> bool {
    let mut chars = namespace.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.prometheus.listen, "0.0.0.0:9434");
        assert_eq!(config.prometheus.path, "/metrics");
        assert_eq!(config.prometheus.namespace, "opensips");
        assert_eq!(config.mi.address, "127.0.0.1:8080");
        assert_eq!(config.mi.timeout_secs, 5);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            mi: {
                address: "10.0.0.5:8888",
                timeout_secs: 2
            },
            prometheus: {
                listen: "127.0.0.1:9435",
                path: "/opensips/metrics",
                namespace: "sip"
            },
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.mi.address, "10.0.0.5:8888");
        assert_eq!(config.mi.timeout_secs, 2);
        assert_eq!(config.prometheus.listen, "127.0.0.1:9435");
        assert_eq!(config.prometheus.path, "/opensips/metrics");
        assert_eq!(config.prometheus.namespace, "sip");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ prometheus: {{ listen: "127.0.0.1:9435" }}, mi: {{ timeout_secs: 3 }} }}"#
        )
        .unwrap();

        let config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.prometheus.listen, "127.0.0.1:9435");
        assert_eq!(config.mi.timeout_secs, 3);
    }

    #[test]
    fn test_validate_invalid_listen() {
        let result = ExporterConfig::parse(r#"{ prometheus: { listen: "not-an-address" } }"#);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_invalid_path() {
        let result = ExporterConfig::parse(r#"{ prometheus: { path: "no-leading-slash" } }"#);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("must start with /"));
    }

    #[test]
    fn test_validate_invalid_namespace() {
        let result = ExporterConfig::parse(r#"{ prometheus: { namespace: "9sips" } }"#);
        assert!(result.is_err());

        let result = ExporterConfig::parse(r#"{ prometheus: { namespace: "open-sips" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_invalid_mi_address() {
        let result = ExporterConfig::parse(r#"{ mi: { address: "udp:localhost" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let result = ExporterConfig::parse(r#"{ mi: { timeout_secs: 0 } }"#);
        assert!(result.is_err());
    }
}
