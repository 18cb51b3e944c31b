//! Host environment ports
//!
//! The pipeline never talks to a windowing system or an executor directly. It
//! depends on the small traits in this module, each with an in-crate
//! implementation that works on top of tokio or a host-driven loop.

pub mod clock;
pub mod frame;
pub mod yielding;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use frame::{FrameCallback, FrameLoop, FrameRequestId, FrameScheduler};
pub use yielding::{DeferredYield, NativeYield, Priority, YieldError, YieldScheduler, YieldStrategy};
