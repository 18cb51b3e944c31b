//! Refresh-aligned callback port
//!
//! [`FrameScheduler`] is the schedule-once, cancelable callback the sampling buffer
//! flushes on. [`FrameLoop`] implements it for hosts that own their render loop:
//! call [`FrameLoop::tick`] once per presented frame, or let
//! [`FrameLoop::drive`] tick it from a fixed-rate tokio interval.

use crate::runtime::clock::Clock;
use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Invoked with the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(u64);

pub trait FrameScheduler: Send + Sync {
    /// Runs `callback` once at the next frame.
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId;

    /// Drops a request that has not fired yet. Unknown ids are ignored.
    fn cancel_frame(&self, id: FrameRequestId);
}

pub struct FrameLoop {
    next_id: AtomicU64,
    pending: ParkingMutex<Vec<(FrameRequestId, FrameCallback)>>,
    frames: AtomicU64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            pending: ParkingMutex::new(Vec::new()),
            frames: AtomicU64::new(0),
        }
    }

    /// Fires every callback requested before this call and returns how many ran.
    /// Callbacks requested while ticking wait for the next frame.
    pub fn tick(&self, timestamp_ms: f64) -> usize {
        let due = std::mem::take(&mut *self.pending.lock());
        self.frames.fetch_add(1, Ordering::Relaxed);

        let count = due.len();
        for (_, callback) in due {
            callback(timestamp_ms);
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of ticks so far.
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Ticks the loop at `refresh_hz` on `handle` until the loop is dropped or the
    /// task is aborted. A non-finite or non-positive rate never ticks.
    pub fn drive(self: &Arc<Self>, handle: &Handle, refresh_hz: f64, clock: Arc<dyn Clock>) -> JoinHandle<()> {
        if !refresh_hz.is_finite() || refresh_hz <= 0.0 {
            tracing::warn!("Refusing to drive frame loop at {}Hz", refresh_hz);
            return handle.spawn(async {});
        }

        let frames = Arc::downgrade(self);
        let period = Duration::from_secs_f64(1.0 / refresh_hz);

        handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::debug!("Frame loop driven at {:.1}Hz (period={:?})", refresh_hz, period);

            loop {
                interval.tick().await;
                let Some(frame_loop) = frames.upgrade() else {
                    break;
                };
                frame_loop.tick(clock.now_ms());
            }
        })
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler for FrameLoop {
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId {
        let id = FrameRequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.pending.lock().push((id, callback));
        id
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        self.pending.lock().retain(|(pending, _)| *pending != id);
    }
}
