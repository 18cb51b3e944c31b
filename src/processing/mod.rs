//! Rate-reduction processing
//!
//! The pieces that turn a raw high-frequency stream into one delivery per frame:
//! polling-rate detection, the sampling buffer, and metrics.

pub mod detector;
pub mod metrics;
pub mod sampling;

pub use detector::{PollingClassification, PollingRate, PollingRateDetector};
pub use metrics::{reduction_percentage, MetricsCollector, MetricsSnapshot};
pub use sampling::{DeliverFn, SamplingBuffer};
