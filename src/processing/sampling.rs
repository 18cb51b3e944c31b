//! Refresh-aligned sampling buffer
//!
//! Holds at most one pending raw event. Every submission overwrites it, and the
//! first submission after a flush requests a frame from the [`FrameScheduler`].
//! When the frame fires, the pending event (plus the deltas accumulated since the
//! previous delivery) is handed to the delivery callback. Under sustained input
//! faster than the refresh cadence this yields exactly one delivery per frame
//! carrying the most recent event.

use crate::input::types::{AccumulatedDeltas, RawEvent};
use crate::runtime::frame::{FrameRequestId, FrameScheduler};
use parking_lot::Mutex as ParkingMutex;
use std::sync::{Arc, Weak};

/// Receives the coalesced event. Deltas are present only for wheel/scroll events
/// when accumulation is enabled.
pub type DeliverFn = Arc<dyn Fn(RawEvent, Option<AccumulatedDeltas>) + Send + Sync>;

#[derive(Clone)]
pub struct SamplingBuffer {
    inner: Arc<BufferInner>,
}

struct BufferInner {
    frames: Arc<dyn FrameScheduler>,
    deliver: DeliverFn,
    accumulate_deltas: bool,
    state: ParkingMutex<BufferState>,
}

struct BufferState {
    pending: Option<RawEvent>,
    deltas: AccumulatedDeltas,
    flush_scheduled: bool,
    request: Option<FrameRequestId>,
    active: bool,
}

impl SamplingBuffer {
    pub fn new(frames: Arc<dyn FrameScheduler>, accumulate_deltas: bool, deliver: DeliverFn) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                frames,
                deliver,
                accumulate_deltas,
                state: ParkingMutex::new(BufferState {
                    pending: None,
                    deltas: AccumulatedDeltas::ZERO,
                    flush_scheduled: false,
                    request: None,
                    active: true,
                }),
            }),
        }
    }

    /// Replaces the pending event and schedules a flush if none is scheduled yet.
    /// No-op after [`teardown`](Self::teardown).
    pub fn submit(&self, event: RawEvent) {
        let needs_flush = {
            let mut state = self.inner.state.lock();
            if !state.active {
                return;
            }

            if self.inner.accumulate_deltas {
                if let Some(delta) = event.deltas() {
                    state.deltas.add(delta);
                }
            }
            state.pending = Some(event);

            !std::mem::replace(&mut state.flush_scheduled, true)
        };

        if needs_flush {
            self.schedule_flush();
        }
    }

    /// Deactivates the buffer, cancels a scheduled flush and drops pending state.
    pub fn teardown(&self) {
        let request = {
            let mut state = self.inner.state.lock();
            state.active = false;
            state.pending = None;
            state.deltas = AccumulatedDeltas::ZERO;
            state.flush_scheduled = false;
            state.request.take()
        };

        if let Some(id) = request {
            self.inner.frames.cancel_frame(id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active
    }

    pub fn has_pending(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.inner.state.lock().flush_scheduled
    }

    /// Deltas accumulated since the last delivery.
    pub fn accumulated(&self) -> AccumulatedDeltas {
        self.inner.state.lock().deltas
    }

    fn schedule_flush(&self) {
        let weak: Weak<BufferInner> = Arc::downgrade(&self.inner);
        let id = self.inner.frames.request_frame(Box::new(move |_timestamp_ms| {
            if let Some(inner) = weak.upgrade() {
                inner.flush();
            }
        }));

        let mut state = self.inner.state.lock();
        if !state.active {
            drop(state);
            self.inner.frames.cancel_frame(id);
        } else if state.flush_scheduled {
            state.request = Some(id);
        }
    }
}

impl BufferInner {
    fn flush(&self) {
        let delivery = {
            let mut state = self.state.lock();
            state.flush_scheduled = false;
            state.request = None;

            let accumulated = std::mem::take(&mut state.deltas);
            match state.pending.take() {
                Some(event) if state.active => {
                    let deltas = (self.accumulate_deltas && event.category().carries_deltas())
                        .then_some(accumulated);
                    Some((event, deltas))
                }
                _ => None,
            }
        };

        if let Some((event, deltas)) = delivery {
            (self.deliver)(event, deltas);
        }
    }
}
