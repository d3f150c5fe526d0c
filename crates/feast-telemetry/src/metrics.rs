//! Request metrics.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `feast_requests_total` | Counter | `callback`, `status` | Served requests |
//! | `feast_request_duration_seconds` | Histogram | `callback` | Latency |
//! | `feast_auth_failures_total` | Counter | - | Rejected credentials |
//! | `feast_in_flight_requests` | Gauge | - | Requests being served |
//!
//! Requests that never reached a handler (no route, wrong verb, disabled
//! API) are labelled with [`UNROUTED`].
//!
//! Recording is a no-op until a recorder is installed, so library code can
//! call these functions unconditionally.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Counter of served requests.
pub const REQUESTS_TOTAL: &str = "feast_requests_total";
/// Histogram of request latency.
pub const REQUEST_DURATION_SECONDS: &str = "feast_request_duration_seconds";
/// Counter of rejected credentials.
pub const AUTH_FAILURES_TOTAL: &str = "feast_auth_failures_total";
/// Gauge of requests currently being served.
pub const IN_FLIGHT_REQUESTS: &str = "feast_in_flight_requests";

/// `callback` label for requests that did not select a handler.
pub const UNROUTED: &str = "unrouted";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Listen address for the Prometheus scrape endpoint.
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Installs the Prometheus recorder with its HTTP listener.
///
/// # Errors
///
/// Fails when the address does not parse or a recorder is already installed.
pub fn install_prometheus(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let handle = PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    describe_metrics();

    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

/// Renders the current metrics in Prometheus text format.
///
/// Returns `None` before [`install_prometheus`] ran.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of API requests served");
    describe_histogram!(REQUEST_DURATION_SECONDS, "API request duration in seconds");
    describe_counter!(AUTH_FAILURES_TOTAL, "Requests rejected by the credential verifier");
    describe_gauge!(IN_FLIGHT_REQUESTS, "API requests currently being served");
}

/// Records one served request.
pub fn record_request(callback: &str, status: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "callback" => callback.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "callback" => callback.to_string())
        .record(duration.as_secs_f64());
}

/// Records a credential rejection.
pub fn record_auth_failure() {
    counter!(AUTH_FAILURES_TOTAL).increment(1);
}

/// Keeps [`IN_FLIGHT_REQUESTS`] raised while alive.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}
