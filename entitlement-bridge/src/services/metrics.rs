//! Metrics for the bridge.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the process-wide Prometheus recorder and return its handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Render metrics in Prometheus text format.
pub fn render_metrics(handle: Option<&PrometheusHandle>) -> String {
    handle
        .map(|h| h.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Count one reconciled event by direction and outcome.
pub fn record_event(kind: &'static str, outcome: &'static str) {
    metrics::counter!("bridge_events_total", "kind" => kind, "outcome" => outcome).increment(1);
}
