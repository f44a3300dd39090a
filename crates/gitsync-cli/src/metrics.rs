//! Metrics recorder for a single invocation.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

/// Installs a Prometheus recorder and describes the engine metrics.
///
/// The handle renders everything recorded so far in the text exposition
/// format.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        // Seconds; git invocations range from milliseconds to many minutes.
        .set_buckets(&[
            0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0, 600.0,
        ])?
        .install_recorder()?;

    gitsync_git::register_metrics();
    debug!("metrics recorder installed");
    Ok(handle)
}
