//! The root configuration type.

use std::collections::HashSet;
use std::net::SocketAddr;

use feast_telemetry::{LogConfig, LogFormat, MetricsConfig};
use serde::{Deserialize, Serialize};

use crate::{
    ApiSection, AuthSection, ConfigError, LoggingSection, MetricsSection, ServerSection,
};

/// Complete Feast configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables over the defaults.
///
/// # Example
///
/// ```
/// use feast_config::FeastConfig;
///
/// let config = FeastConfig::default();
/// assert_eq!(config.api.route_prefix, "/feast/api");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct FeastConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerSection,

    /// Request-level switches.
    #[serde(default)]
    pub api: ApiSection,

    /// Static Basic-auth users.
    #[serde(default)]
    pub auth: AuthSection,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Prometheus exporter.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl FeastConfig {
    /// Pretty logs at debug, bound to localhost.
    #[must_use]
    pub fn development() -> Self {
        Self {
            server: ServerSection {
                http_addr: "127.0.0.1:8080".to_string(),
                shutdown_timeout_secs: 5,
                ..ServerSection::default()
            },
            logging: LoggingSection {
                enabled: true,
                level: "debug".to_string(),
                format: LogFormat::Pretty,
            },
            ..Self::default()
        }
    }

    /// JSON logs and metrics on.
    #[must_use]
    pub fn production() -> Self {
        Self {
            metrics: MetricsSection {
                enabled: true,
                ..MetricsSection::default()
            },
            ..Self::default()
        }
    }

    /// Checks cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_size",
                "must be greater than zero",
            ));
        }

        if self.metrics.enabled && self.metrics.addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "metrics.addr",
                format!("invalid socket address: {}", self.metrics.addr),
            ));
        }

        let prefix = &self.api.route_prefix;
        if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
            return Err(ConfigError::invalid_value(
                "api.route_prefix",
                "must be empty or start with '/' and not end with '/'",
            ));
        }

        let charset = &self.api.charset;
        if charset.is_empty()
            || !charset
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(ConfigError::invalid_value(
                "api.charset",
                format!("not a charset token: {charset:?}"),
            ));
        }

        let mut seen = HashSet::new();
        for user in &self.auth.users {
            if user.username.is_empty() || user.username.contains(':') {
                return Err(ConfigError::invalid_value(
                    "auth.users.username",
                    "must be non-empty and must not contain ':'",
                ));
            }
            if !seen.insert(user.username.as_str()) {
                return Err(ConfigError::validation_error(format!(
                    "duplicate auth user '{}'",
                    user.username
                )));
            }
        }

        Ok(())
    }

    /// Logging settings for `feast-telemetry`.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let preset = match self.logging.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            enabled: self.logging.enabled,
            level: self.logging.level.clone(),
            ..preset
        }
    }

    /// Metrics settings for `feast-telemetry`.
    #[must_use]
    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            enabled: self.metrics.enabled,
            addr: self.metrics.addr.clone(),
        }
    }
}
