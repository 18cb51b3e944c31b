//! Frame Throttle - refresh-aligned coalescing of high-frequency input.
//!
//! High-polling pointing devices deliver pointer, wheel and touch events far faster
//! than a display can present frames. This crate intercepts those events before the
//! application sees them, keeps only the most recent one per frame (summing wheel
//! deltas on the way), and hands it to a consumer after a cooperative yield.

pub mod input;
pub mod pipeline;
pub mod processing;
pub mod runtime;

pub use input::{AccumulatedDeltas, EventCategory, EventDispatcher, EventSource, Phase, RawEvent};
pub use pipeline::{SampleRate, Throttle, ThrottleBuilder, ThrottleConfig, ThrottleError};
pub use processing::{DeliverFn, MetricsSnapshot, PollingClassification, PollingRate};
pub use runtime::{Clock, FrameLoop, FrameScheduler, ManualClock, MonotonicClock, Priority};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging. `RUST_LOG` overrides the default filter.
pub fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "frame_throttle=debug"
    } else {
        "frame_throttle=info"
    };

    // A second call finds a subscriber already installed; keep the first one.
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
