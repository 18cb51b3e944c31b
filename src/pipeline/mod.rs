//! Throttle pipeline
//!
//! Configuration, error types and the [`Throttle`] that wires the input and
//! processing modules together.

pub mod config;
pub mod error;
mod reporter;
pub mod throttle;

pub use config::{SampleRate, ThrottleConfig};
pub use error::{ThrottleError, ThrottleResult};
pub use reporter::{MetricsCallback, REPORT_INTERVAL};
pub use throttle::{Throttle, ThrottleBuilder};
