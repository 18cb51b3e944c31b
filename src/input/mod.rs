//! Raw input model and interception
//!
//! Raw events enter through an [`EventSource`]; the [`EventInterceptor`] sits in
//! the capture phase, suppresses what the pipeline coalesces, and forwards every
//! raw event into the sampling buffer.

pub mod dispatch;
pub mod interceptor;
pub mod types;

pub use dispatch::{DispatchOutcome, EventDispatcher, EventHandler, EventSource, ListenerId, Phase, Propagation};
pub use interceptor::{EventInterceptor, ForwardFn, InterceptPredicate};
pub use types::{
    AccumulatedDeltas, DeltaMode, EventCategory, EventPayload, PointerKind, PointerMove, RawEvent,
    TouchMove, TouchPoint, WheelDelta,
};
