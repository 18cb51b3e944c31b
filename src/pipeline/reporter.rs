//! Periodic metrics reporting

use crate::processing::metrics::{MetricsCollector, MetricsSnapshot};
use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// How often registered consumers receive a snapshot
pub const REPORT_INTERVAL: Duration = Duration::from_millis(1000);

pub type MetricsCallback = Arc<dyn Fn(MetricsSnapshot) + Send + Sync>;

/// Spawns the reporting timer. The first report fires one interval after spawning.
pub(crate) fn spawn_reporter(
    handle: &Handle,
    metrics: Arc<ParkingMutex<MetricsCollector>>,
    on_metrics: Option<MetricsCallback>,
    debug: bool,
    active: Arc<AtomicBool>,
) -> JoinHandle<()> {
    handle.spawn(async move {
        let start = tokio::time::Instant::now() + REPORT_INTERVAL;
        let mut interval = tokio::time::interval_at(start, REPORT_INTERVAL);

        loop {
            interval.tick().await;
            if !active.load(Ordering::Acquire) {
                break;
            }

            let snapshot = metrics.lock().snapshot();
            if debug {
                tracing::debug!(
                    "Metrics: polling={:?} ({}Hz) raw={} flushed={} reduction={}% fps={:.1} avg_processing={:.3}ms",
                    snapshot.polling_rate,
                    snapshot.estimated_hz,
                    snapshot.raw_count,
                    snapshot.flushed_count,
                    snapshot.reduction_percentage,
                    snapshot.current_fps,
                    snapshot.average_processing_time_ms
                );
            }
            if let Some(callback) = &on_metrics {
                callback(snapshot);
            }
        }
    })
}
