//! Polling-rate detection from event timestamps
//!
//! Keeps the last [`WINDOW_SIZE`] pointer timestamps and, once the window is full,
//! classifies the device as standard or high polling. The first resolved
//! classification is cached for the detector's lifetime; a device is assumed not to
//! change mid-session. Call [`PollingRateDetector::reset`] when it might have.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of timestamps needed before classifying
pub const WINDOW_SIZE: usize = 10;

/// Deltas below this are counted as high-polling samples
pub const HIGH_POLLING_THRESHOLD_MS: f64 = 1.0;

/// Sub-threshold deltas (out of `WINDOW_SIZE - 1`) needed for `High`
pub const MIN_HIGH_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollingRate {
    #[default]
    Unknown,
    Standard,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingClassification {
    pub rate: PollingRate,
    pub estimated_hz: u32,
}

impl PollingClassification {
    pub fn is_resolved(&self) -> bool {
        self.rate != PollingRate::Unknown
    }
}

#[derive(Debug, Default)]
pub struct PollingRateDetector {
    window: VecDeque<f64>,
    cached: PollingClassification,
}

impl PollingRateDetector {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(WINDOW_SIZE),
            cached: PollingClassification::default(),
        }
    }

    /// Feeds one timestamp and returns the current classification.
    pub fn classify(&mut self, timestamp_ms: f64) -> PollingClassification {
        if self.cached.is_resolved() {
            return self.cached;
        }

        self.window.push_back(timestamp_ms);
        if self.window.len() > WINDOW_SIZE {
            self.window.pop_front();
        }
        if self.window.len() < WINDOW_SIZE {
            return self.cached;
        }

        let deltas: Vec<f64> = self
            .window
            .iter()
            .zip(self.window.iter().skip(1))
            .map(|(prev, next)| next - prev)
            .collect();

        let high_samples = deltas
            .iter()
            .filter(|&&delta| delta < HIGH_POLLING_THRESHOLD_MS)
            .count();
        let average = deltas.iter().sum::<f64>() / deltas.len() as f64;

        self.cached = PollingClassification {
            rate: if high_samples >= MIN_HIGH_SAMPLES {
                PollingRate::High
            } else {
                PollingRate::Standard
            },
            estimated_hz: estimate_hz(average),
        };
        self.cached
    }

    pub fn classification(&self) -> PollingClassification {
        self.cached
    }

    pub fn is_resolved(&self) -> bool {
        self.cached.is_resolved()
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    /// Forgets the window and cached classification.
    pub fn reset(&mut self) {
        self.window.clear();
        self.cached = PollingClassification::default();
    }
}

fn estimate_hz(average_delta_ms: f64) -> u32 {
    if average_delta_ms > 0.0 {
        (1000.0 / average_delta_ms).round() as u32
    } else {
        0
    }
}
