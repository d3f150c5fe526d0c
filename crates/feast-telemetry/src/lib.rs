//! Observability for Feast.
//!
//! - **Logging**: `tracing` events through a JSON or pretty fmt layer
//! - **Metrics**: request counters and latency via the `metrics` facade,
//!   exported in Prometheus format
//!
//! ```text
//!   feast-server ──tracing──► fmt layer (json | pretty) ──► stdout
//!        │
//!        └─────metrics─────► Prometheus recorder ──► :9090/metrics
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use feast_telemetry::{init_telemetry, LogConfig, MetricsConfig};
//!
//! init_telemetry(&LogConfig::production(), &MetricsConfig::default())?;
//! ```

#![doc(html_root_url = "https://docs.rs/feast-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use self::metrics::{install_prometheus, record_auth_failure, record_request, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs logging, then metrics.
///
/// # Errors
///
/// Returns the first subsystem failure.
pub fn init_telemetry(log: &LogConfig, metrics: &MetricsConfig) -> TelemetryResult<()> {
    init_logging(log)?;
    install_prometheus(metrics)?;
    Ok(())
}
