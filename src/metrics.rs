//! Prometheus metrics for the relay.
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed, so library users and tests never need one.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the Prometheus recorder, once per process.
///
/// Returns `None` when another recorder already owns the global slot.
pub fn install() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Metrics recorder not installed: {}", e);
                None
            }
        })
        .clone()
}

/// Count a completed relay response. `kind` is `playlist` or `segment`.
pub fn record_request(kind: &'static str, status: u16) {
    metrics::counter!("relay_requests_total", "kind" => kind, "status" => status.to_string())
        .increment(1);
}

pub fn record_duration(kind: &'static str, start: Instant) {
    metrics::histogram!("relay_request_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

/// Count a failed relay request by error class
pub fn record_failure(kind: &'static str) {
    metrics::counter!("relay_failures_total", "kind" => kind).increment(1);
}
