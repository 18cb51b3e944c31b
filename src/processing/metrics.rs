//! Pipeline metrics
//!
//! [`MetricsCollector`] keeps live counters and two rolling windows (processing
//! times and delivered-frame timestamps). Consumers only ever see a
//! [`MetricsSnapshot`], a copy taken at the moment of the call.

use crate::processing::detector::{PollingClassification, PollingRate};
use crate::runtime::clock::Clock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Processing-time samples kept for the rolling average
pub const PROCESSING_WINDOW: usize = 100;

/// Frame timestamps kept for the FPS estimate
pub const FRAME_WINDOW: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub polling_rate: PollingRate,
    pub estimated_hz: u32,
    pub raw_count: u64,
    pub flushed_count: u64,
    /// Share of raw events that never reached the consumer, 0-100.
    pub reduction_percentage: u32,
    pub current_fps: f64,
    pub average_processing_time_ms: f64,
    /// Clock time (ms) when the snapshot was taken.
    pub capture_timestamp: f64,
}

/// `round(100 * (raw - flushed) / raw)`, or 0 when nothing was recorded.
pub fn reduction_percentage(raw_count: u64, flushed_count: u64) -> u32 {
    if raw_count == 0 {
        return 0;
    }
    let dropped = raw_count.saturating_sub(flushed_count);
    (100.0 * dropped as f64 / raw_count as f64).round() as u32
}

pub struct MetricsCollector {
    clock: Arc<dyn Clock>,
    classification: PollingClassification,
    raw_count: u64,
    flushed_count: u64,
    processing_times: VecDeque<f64>,
    average_processing_time_ms: f64,
    frame_times: VecDeque<f64>,
    current_fps: f64,
}

impl MetricsCollector {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            classification: PollingClassification::default(),
            raw_count: 0,
            flushed_count: 0,
            processing_times: VecDeque::with_capacity(PROCESSING_WINDOW),
            average_processing_time_ms: 0.0,
            frame_times: VecDeque::with_capacity(FRAME_WINDOW),
            current_fps: 0.0,
        }
    }

    pub fn record_raw(&mut self) {
        self.raw_count += 1;
    }

    /// Never lets `flushed_count` exceed `raw_count`. A flush of an event counted
    /// before a [`reset`](Self::reset) is not counted again.
    pub fn record_flushed(&mut self) {
        if self.flushed_count < self.raw_count {
            self.flushed_count += 1;
        }
    }

    pub fn record_processing_time(&mut self, ms: f64) {
        self.processing_times.push_back(ms);
        if self.processing_times.len() > PROCESSING_WINDOW {
            self.processing_times.pop_front();
        }
        self.average_processing_time_ms =
            self.processing_times.iter().sum::<f64>() / self.processing_times.len() as f64;
    }

    /// Stamps a delivered frame with the current clock time and updates FPS.
    pub fn record_frame(&mut self) {
        self.frame_times.push_back(self.clock.now_ms());
        if self.frame_times.len() > FRAME_WINDOW {
            self.frame_times.pop_front();
        }

        if let (Some(oldest), Some(newest)) = (self.frame_times.front(), self.frame_times.back()) {
            let span = newest - oldest;
            if self.frame_times.len() >= 2 && span > 0.0 {
                self.current_fps = (self.frame_times.len() - 1) as f64 / span * 1000.0;
            }
        }
    }

    pub fn set_classification(&mut self, classification: PollingClassification) {
        self.classification = classification;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polling_rate: self.classification.rate,
            estimated_hz: self.classification.estimated_hz,
            raw_count: self.raw_count,
            flushed_count: self.flushed_count,
            reduction_percentage: reduction_percentage(self.raw_count, self.flushed_count),
            current_fps: self.current_fps,
            average_processing_time_ms: self.average_processing_time_ms,
            capture_timestamp: self.clock.now_ms(),
        }
    }

    /// Zeroes counters and clears both windows. The classification is kept:
    /// it mirrors the detector cache, which this does not touch.
    pub fn reset(&mut self) {
        self.raw_count = 0;
        self.flushed_count = 0;
        self.processing_times.clear();
        self.average_processing_time_ms = 0.0;
        self.frame_times.clear();
        self.current_fps = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::clock::ManualClock;

    fn collector() -> (Arc<ManualClock>, MetricsCollector) {
        let clock = Arc::new(ManualClock::new(0.0));
        let metrics = MetricsCollector::new(clock.clone());
        (clock, metrics)
    }

    #[test]
    fn test_reduction_percentage_formula() {
        assert_eq!(reduction_percentage(0, 0), 0);
        assert_eq!(reduction_percentage(100, 10), 90);
        assert_eq!(reduction_percentage(3, 1), 67);
        assert_eq!(reduction_percentage(8000, 144), 98);
        assert_eq!(reduction_percentage(5, 5), 0);
    }

    #[test]
    fn test_100_raw_10_flushed_is_90_percent() {
        let (_clock, mut metrics) = collector();
        for _ in 0..100 {
            metrics.record_raw();
        }
        for _ in 0..10 {
            metrics.record_flushed();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.raw_count, 100);
        assert_eq!(snapshot.flushed_count, 10);
        assert_eq!(snapshot.reduction_percentage, 90);
    }

    #[test]
    fn test_average_processing_time() {
        let (_clock, mut metrics) = collector();
        metrics.record_processing_time(1.5);
        metrics.record_processing_time(2.5);

        assert_eq!(metrics.snapshot().average_processing_time_ms, 2.0);
    }

    #[test]
    fn test_processing_window_is_bounded() {
        let (_clock, mut metrics) = collector();
        for _ in 0..PROCESSING_WINDOW {
            metrics.record_processing_time(10.0);
        }
        for _ in 0..PROCESSING_WINDOW {
            metrics.record_processing_time(2.0);
        }

        assert_eq!(metrics.snapshot().average_processing_time_ms, 2.0);
    }

    #[test]
    fn test_fps_needs_two_frames() {
        let (clock, mut metrics) = collector();
        metrics.record_frame();
        assert_eq!(metrics.snapshot().current_fps, 0.0);

        clock.advance(10.0);
        metrics.record_frame();
        assert_eq!(metrics.snapshot().current_fps, 100.0);
    }

    #[test]
    fn test_fps_over_full_window() {
        let (clock, mut metrics) = collector();
        // 120 frames at 8ms; only the last 60 count
        for _ in 0..120 {
            metrics.record_frame();
            clock.advance(8.0);
        }

        assert_eq!(metrics.snapshot().current_fps, 125.0);
    }

    #[test]
    fn test_fps_keeps_previous_value_on_zero_span() {
        let (clock, mut metrics) = collector();
        metrics.record_frame();
        clock.advance(20.0);
        metrics.record_frame();
        assert_eq!(metrics.snapshot().current_fps, 50.0);

        metrics.reset();
        metrics.record_frame();
        metrics.record_frame();
        assert_eq!(metrics.snapshot().current_fps, 0.0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let (clock, mut metrics) = collector();
        metrics.record_raw();
        clock.set(5.0);
        let before = metrics.snapshot();

        metrics.record_raw();

        assert_eq!(before.raw_count, 1);
        assert_eq!(before.capture_timestamp, 5.0);
        assert_eq!(metrics.snapshot().raw_count, 2);
    }

    #[test]
    fn test_reset_keeps_classification() {
        let (_clock, mut metrics) = collector();
        metrics.set_classification(PollingClassification {
            rate: PollingRate::High,
            estimated_hz: 8000,
        });
        metrics.record_raw();
        metrics.record_flushed();
        metrics.record_processing_time(3.0);

        metrics.reset();
        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.raw_count, 0);
        assert_eq!(snapshot.flushed_count, 0);
        assert_eq!(snapshot.reduction_percentage, 0);
        assert_eq!(snapshot.average_processing_time_ms, 0.0);
        assert_eq!(snapshot.polling_rate, PollingRate::High);
    }

    #[test]
    fn test_flushed_never_exceeds_raw() {
        let (_clock, mut metrics) = collector();
        metrics.record_raw();
        metrics.reset();

        // Flush of the event counted before the reset
        metrics.record_flushed();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.raw_count, 0);
        assert_eq!(snapshot.flushed_count, 0);

        metrics.record_raw();
        metrics.record_flushed();
        metrics.record_flushed();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.raw_count, 1);
        assert_eq!(snapshot.flushed_count, 1);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let (_clock, metrics) = collector();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();

        assert_eq!(json["pollingRate"], "unknown");
        assert_eq!(json["reductionPercentage"], 0);
        assert!(json.get("averageProcessingTimeMs").is_some());
    }
}
