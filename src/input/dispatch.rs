//! Event source port and the in-process dispatcher.
//!
//! [`EventSource`] is what the interceptor attaches to: the top-level stream of raw
//! input events with capture-phase subscription and per-event propagation control.
//! [`EventDispatcher`] is the reference implementation for hosts that own their
//! event loop (games, native windows, tests). A windowing layer feeds each raw
//! event through [`EventDispatcher::dispatch`]; the application's own handlers
//! subscribe in the bubble phase and never see events the pipeline suppressed.

use crate::input::types::{EventCategory, RawEvent};
use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Dispatch phase a listener is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Runs before any bubble-phase listener.
    Capture,
    Bubble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Per-dispatch propagation flags handed to every listener.
#[derive(Debug, Default)]
pub struct Propagation {
    stopped: bool,
    immediate: bool,
}

impl Propagation {
    /// Skip the remaining phase; listeners of the current phase still run.
    pub fn stop_propagation(&mut self) {
        self.stopped = true;
    }

    /// Skip every listener that has not run yet.
    pub fn stop_immediate_propagation(&mut self) {
        self.stopped = true;
        self.immediate = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

pub type EventHandler = Arc<dyn Fn(&RawEvent, &mut Propagation) + Send + Sync>;

/// Subscription side of the top-level raw event stream.
pub trait EventSource: Send + Sync {
    fn add_listener(&self, category: EventCategory, phase: Phase, handler: EventHandler) -> ListenerId;

    /// Returns `false` if the listener was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

struct ListenerEntry {
    id: ListenerId,
    category: EventCategory,
    phase: Phase,
    handler: EventHandler,
}

/// Result of dispatching one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Number of listeners that were invoked.
    pub delivered: usize,
    pub propagation_stopped: bool,
}

pub struct EventDispatcher {
    next_id: AtomicU64,
    listeners: ParkingMutex<Vec<ListenerEntry>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            listeners: ParkingMutex::new(Vec::new()),
        }
    }

    pub fn listener_count(&self, category: EventCategory) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|entry| entry.category == category)
            .count()
    }

    /// Runs capture listeners in registration order, then bubble listeners.
    ///
    /// Handlers are called without the registry lock held, so they may add or
    /// remove listeners; such changes apply from the next dispatch.
    pub fn dispatch(&self, event: &RawEvent) -> DispatchOutcome {
        let category = event.category();
        let (capture, bubble): (Vec<_>, Vec<_>) = {
            let listeners = self.listeners.lock();
            let matching = listeners.iter().filter(|entry| entry.category == category);
            let capture = matching
                .clone()
                .filter(|entry| entry.phase == Phase::Capture)
                .map(|entry| entry.handler.clone())
                .collect();
            let bubble = matching
                .filter(|entry| entry.phase == Phase::Bubble)
                .map(|entry| entry.handler.clone())
                .collect();
            (capture, bubble)
        };

        let mut propagation = Propagation::default();
        let mut delivered = 0;

        for handler in &capture {
            handler(event, &mut propagation);
            delivered += 1;
            if propagation.immediate {
                break;
            }
        }

        if !propagation.stopped {
            for handler in &bubble {
                handler(event, &mut propagation);
                delivered += 1;
                if propagation.immediate {
                    break;
                }
            }
        }

        DispatchOutcome {
            delivered,
            propagation_stopped: propagation.stopped,
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for EventDispatcher {
    fn add_listener(&self, category: EventCategory, phase: Phase, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push(ListenerEntry {
            id,
            category,
            phase,
            handler,
        });
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }
}
