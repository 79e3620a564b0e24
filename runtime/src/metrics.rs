//! Prometheus metrics for the dispatcher.
//!
//! The dispatcher records through the `metrics` facade, so counters are free
//! when no recorder is installed. [`MetricsServer`] installs the Prometheus
//! recorder for hosts that want to scrape them.
//!
//! # Example
//!
//! ```rust,no_run
//! use rsaa_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Render for a /metrics handler
//! let _body = server.render();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Untagged actions forwarded unchanged.
pub const PASSTHROUGH: &str = "rsaa.actions.passthrough";
/// Tagged actions failing validation.
pub const INVALID: &str = "rsaa.actions.invalid";
/// Calls cancelled by `bailout`.
pub const BAILOUT: &str = "rsaa.actions.bailout";
/// Calls handed to the transport.
pub const STARTED: &str = "rsaa.requests.started";
/// Calls ending in a success action.
pub const SUCCEEDED: &str = "rsaa.requests.succeeded";
/// Calls ending in a failure action.
pub const FAILED: &str = "rsaa.requests.failed";
/// Calls ending in an abort.
pub const ABORTED: &str = "rsaa.requests.aborted";
/// Failing endpoint, headers or bailout resolvers.
pub const RESOLVERS_FAILED: &str = "rsaa.resolvers.failed";
/// Time from handing the call to the transport until it settled.
pub const DURATION: &str = "rsaa.request.duration_seconds";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address the host will serve `/metrics` on
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Describe the dispatcher metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g. in tests), this logs a warning
    /// and succeeds without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(PASSTHROUGH, "Untagged actions forwarded unchanged");
    describe_counter!(INVALID, "Tagged actions rejected by schema validation");
    describe_counter!(BAILOUT, "Calls skipped because bailout was true");
    describe_counter!(STARTED, "Calls handed to the transport");
    describe_counter!(SUCCEEDED, "Calls that produced a success action");
    describe_counter!(FAILED, "Calls that produced a failure action");
    describe_counter!(ABORTED, "Calls aborted while in flight");
    describe_counter!(RESOLVERS_FAILED, "Endpoint, headers or bailout resolvers that failed");
    describe_histogram!(DURATION, "Time from handing a call to the transport until it settled");
}

/// Dispatcher metrics recorder.
pub struct RequestMetrics;

impl RequestMetrics {
    /// Record an untagged action.
    pub fn record_passthrough() {
        counter!(PASSTHROUGH).increment(1);
    }

    /// Record an invalid tagged action.
    pub fn record_invalid() {
        counter!(INVALID).increment(1);
    }

    /// Record a bailout.
    pub fn record_bailout() {
        counter!(BAILOUT).increment(1);
    }

    /// Record a failing field resolver.
    pub fn record_resolver_failure(field: &'static str) {
        counter!(RESOLVERS_FAILED, "field" => field).increment(1);
    }

    /// Record a call handed to the transport.
    pub fn record_started() {
        counter!(STARTED).increment(1);
    }

    /// Record a call the transport refused before sending.
    pub fn record_refused() {
        counter!(FAILED).increment(1);
    }

    /// Record a success.
    pub fn record_succeeded(duration: Duration) {
        counter!(SUCCEEDED).increment(1);
        histogram!(DURATION).record(duration.as_secs_f64());
    }

    /// Record a failure.
    pub fn record_failed(duration: Duration) {
        counter!(FAILED).increment(1);
        histogram!(DURATION).record(duration.as_secs_f64());
    }

    /// Record an abort.
    pub fn record_aborted(duration: Duration) {
        counter!(ABORTED).increment(1);
        histogram!(DURATION).record(duration.as_secs_f64());
    }
}
