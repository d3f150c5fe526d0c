//! Runtime configuration for the service and the listener.
//!
//! ```rust
//! use feast_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:8080")
//!     .request_timeout(Duration::from_secs(5))
//!     .jsonp_enabled(false)
//!     .build();
//!
//! assert_eq!(config.route_prefix(), "/feast/api");
//! assert!(!config.jsonp_enabled());
//! ```

use std::net::SocketAddr;
use std::time::Duration;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default shutdown grace period in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default request time limit in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default mount point of the API.
pub const DEFAULT_ROUTE_PREFIX: &str = "/feast/api";

/// Default response charset.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Listener and request-level settings.
///
/// Build with [`ServerConfig::builder()`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    max_connections: Option<usize>,
    max_body_size: usize,
    api_enabled: bool,
    jsonp_enabled: bool,
    route_prefix: String,
    charset: String,
}

impl ServerConfig {
    /// Starts a builder with default values.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// The HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// How long to wait for open connections on shutdown.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Time limit for reading and answering one request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Concurrent connection limit, if any.
    #[must_use]
    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    /// Largest request body the listener will buffer, in bytes.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Whether the API answers at all.
    #[must_use]
    pub fn api_enabled(&self) -> bool {
        self.api_enabled
    }

    /// Whether `_jsonp` is honoured.
    #[must_use]
    pub fn jsonp_enabled(&self) -> bool {
        self.jsonp_enabled
    }

    /// Path prefix stripped before routing.
    #[must_use]
    pub fn route_prefix(&self) -> &str {
        &self.route_prefix
    }

    /// Charset declared in `Content-Type`.
    #[must_use]
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// The full `Content-Type` value for responses.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("application/json; charset={}", self.charset)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            config: ServerConfig {
                http_addr: DEFAULT_HTTP_ADDR.to_string(),
                shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
                max_connections: None,
                max_body_size: DEFAULT_MAX_BODY_SIZE,
                api_enabled: true,
                jsonp_enabled: true,
                route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
                charset: DEFAULT_CHARSET.to_string(),
            },
        }
    }
}

impl ServerConfigBuilder {
    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// Sets the shutdown grace period.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Sets the per-request time limit.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Caps concurrent connections. `None` means unlimited.
    #[must_use]
    pub fn max_connections(mut self, max: Option<usize>) -> Self {
        self.config.max_connections = max;
        self
    }

    /// Caps the request body size in bytes.
    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.config.max_body_size = bytes;
        self
    }

    /// Turns the whole API on or off.
    #[must_use]
    pub fn api_enabled(mut self, enabled: bool) -> Self {
        self.config.api_enabled = enabled;
        self
    }

    /// Turns JSONP on or off.
    #[must_use]
    pub fn jsonp_enabled(mut self, enabled: bool) -> Self {
        self.config.jsonp_enabled = enabled;
        self
    }

    /// Sets the mount point. An empty prefix mounts at the root.
    #[must_use]
    pub fn route_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.config.route_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Sets the response charset.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.config.charset = charset.into();
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        self.config
    }
}
