//! Tracing subscriber and Prometheus metrics setup.

use crate::config::DEFAULT_LOG_FILTER;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Metrics errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. With `json` set, events are
/// written as JSON lines.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Install the Prometheus recorder and describe the ticket metrics.
///
/// The returned handle renders the `/metrics` body.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a global recorder is already installed.
pub fn install_metrics() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    Ok(handle)
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "take_a_number_tickets_issued_total",
        "Total number of tickets issued"
    );
    describe_counter!(
        "take_a_number_tickets_completed_total",
        "Total number of tickets marked as served"
    );
    describe_counter!(
        "take_a_number_tickets_expired_total",
        "Total number of tickets expired, labelled by reason (ttl, cancelled, forced)"
    );
    describe_counter!(
        "take_a_number_resets_total",
        "Total number of queue resets"
    );
    describe_counter!(
        "take_a_number_tickets_purged_total",
        "Total number of tickets deleted by cleanup"
    );
    describe_counter!(
        "take_a_number_store_errors_total",
        "Total number of failed ticket store queries, labelled by operation"
    );
    describe_gauge!(
        "take_a_number_cleanup_last_run_timestamp_seconds",
        "Unix time of the last successful scheduled cleanup"
    );
}
