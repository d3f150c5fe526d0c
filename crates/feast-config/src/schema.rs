//! Configuration sections.
//!
//! Every section rejects unknown keys and fills missing keys from its
//! `Default`.

use feast_telemetry::LogFormat;
use serde::{Deserialize, Serialize};

/// Default HTTP listen address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
/// Default path prefix the API is mounted under.
pub const DEFAULT_ROUTE_PREFIX: &str = "/feast/api";
/// Default response charset.
pub const DEFAULT_CHARSET: &str = "UTF-8";
/// Default request body limit in bytes (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;
/// Default Prometheus listen address.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9090";

/// `[server]`: the HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ServerSection {
    /// Listen address.
    pub http_addr: String,

    /// Seconds to wait for in-flight connections on shutdown.
    pub shutdown_timeout_secs: u64,

    /// Per-request time limit in milliseconds.
    pub request_timeout_ms: u64,

    /// Concurrent connection limit. `0` means unlimited.
    pub max_connections: usize,

    /// Largest accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout_secs: 30,
            request_timeout_ms: 30_000,
            max_connections: 10_000,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// `[api]`: request-level switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ApiSection {
    /// Serve the API at all.
    pub enabled: bool,

    /// Honour the `_jsonp` query parameter.
    pub jsonp_enabled: bool,

    /// Path prefix stripped before routing. Empty mounts at the root.
    pub route_prefix: String,

    /// Charset declared in `Content-Type`.
    pub charset: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            enabled: true,
            jsonp_enabled: true,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
        }
    }
}

/// One `[[auth.users]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UserEntry {
    /// Login name.
    pub username: String,

    /// Plain password.
    pub password: String,

    /// Granted roles.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// `[auth]`: static credentials for Basic authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct AuthSection {
    /// Accepted users. Empty means Basic credentials are never accepted.
    pub users: Vec<UserEntry>,
}

/// `[logging]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingSection {
    /// Install a subscriber at all.
    pub enabled: bool,

    /// Filter directive.
    pub level: String,

    /// `json` or `pretty`.
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// `[metrics]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct MetricsSection {
    /// Run the Prometheus exporter.
    pub enabled: bool,

    /// Exporter listen address.
    pub addr: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: DEFAULT_METRICS_ADDR.to_string(),
        }
    }
}
