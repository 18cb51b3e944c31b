//! Capture-phase interceptor that suppresses and forwards raw events.

use crate::input::dispatch::{EventHandler, EventSource, ListenerId, Phase, Propagation};
use crate::input::types::{EventCategory, RawEvent};
use std::collections::HashMap;
use std::sync::Arc;

/// Decides whether an event is suppressed. May have side effects (counting, detection).
pub type InterceptPredicate = Arc<dyn Fn(&RawEvent) -> bool + Send + Sync>;

/// Receives every raw event the interceptor observes.
pub type ForwardFn = Arc<dyn Fn(RawEvent) + Send + Sync>;

/// Capture-phase hook on the top-level event source.
///
/// Owns its listener registrations: [`attach`](Self::attach) acquires them and
/// [`detach`](Self::detach) releases them. Attaching two interceptors for the same
/// category on one source is the caller's responsibility to avoid.
pub struct EventInterceptor {
    source: Arc<dyn EventSource>,
    should_intercept: InterceptPredicate,
    forward: ForwardFn,
    registrations: HashMap<EventCategory, ListenerId>,
}

impl EventInterceptor {
    pub fn new(
        source: Arc<dyn EventSource>,
        should_intercept: InterceptPredicate,
        forward: ForwardFn,
    ) -> Self {
        Self {
            source,
            should_intercept,
            forward,
            registrations: HashMap::new(),
        }
    }

    /// Installs one capture-phase listener per category. Categories already
    /// attached are left alone.
    pub fn attach(&mut self, categories: &[EventCategory]) {
        for &category in categories {
            if self.registrations.contains_key(&category) {
                continue;
            }

            let should_intercept = self.should_intercept.clone();
            let forward = self.forward.clone();
            let handler: EventHandler = Arc::new(move |event: &RawEvent, propagation: &mut Propagation| {
                if should_intercept(event) {
                    propagation.stop_immediate_propagation();
                }
                forward(event.clone());
            });

            let id = self.source.add_listener(category, Phase::Capture, handler);
            self.registrations.insert(category, id);
            tracing::debug!("Interceptor attached to {}", category);
        }
    }

    /// Removes every installed listener. Safe to call repeatedly.
    pub fn detach(&mut self) {
        for (category, id) in self.registrations.drain() {
            self.source.remove_listener(id);
            tracing::debug!("Interceptor detached from {}", category);
        }
    }

    /// Detach, then attach with the new set. Events arriving in between are not intercepted.
    pub fn update_categories(&mut self, categories: &[EventCategory]) {
        self.detach();
        self.attach(categories);
    }

    pub fn is_attached(&self) -> bool {
        !self.registrations.is_empty()
    }

    pub fn categories(&self) -> Vec<EventCategory> {
        EventCategory::ALL
            .into_iter()
            .filter(|category| self.registrations.contains_key(category))
            .collect()
    }
}

impl Drop for EventInterceptor {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::dispatch::EventDispatcher;
    use parking_lot::Mutex as ParkingMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        dispatcher: Arc<EventDispatcher>,
        forwarded: Arc<ParkingMutex<Vec<RawEvent>>>,
        app_seen: Arc<AtomicUsize>,
    }

    fn harness(intercept: bool) -> (Harness, EventInterceptor) {
        let dispatcher = Arc::new(EventDispatcher::new());
        let forwarded = Arc::new(ParkingMutex::new(Vec::new()));
        let app_seen = Arc::new(AtomicUsize::new(0));

        for category in EventCategory::ALL {
            let app_seen = app_seen.clone();
            dispatcher.add_listener(
                category,
                Phase::Bubble,
                Arc::new(move |_event: &RawEvent, _propagation: &mut Propagation| {
                    app_seen.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        let sink = forwarded.clone();
        let interceptor = EventInterceptor::new(
            dispatcher.clone(),
            Arc::new(move |_event: &RawEvent| intercept),
            Arc::new(move |event: RawEvent| sink.lock().push(event)),
        );

        (
            Harness {
                dispatcher,
                forwarded,
                app_seen,
            },
            interceptor,
        )
    }

    #[test]
    fn test_intercepted_events_are_forwarded_but_hidden_from_app() {
        let (h, mut interceptor) = harness(true);
        interceptor.attach(&[EventCategory::PointerMove]);

        let outcome = h.dispatcher.dispatch(&RawEvent::pointer_move(1.0, 10.0, 20.0));

        assert!(outcome.propagation_stopped);
        assert_eq!(h.app_seen.load(Ordering::SeqCst), 0);
        assert_eq!(h.forwarded.lock().len(), 1);
    }

    #[test]
    fn test_forwards_even_when_not_intercepting() {
        let (h, mut interceptor) = harness(false);
        interceptor.attach(&[EventCategory::Wheel]);

        h.dispatcher.dispatch(&RawEvent::wheel(1.0, 0.0, 3.0, 0.0));

        assert_eq!(h.app_seen.load(Ordering::SeqCst), 1);
        assert_eq!(h.forwarded.lock().len(), 1);
    }

    #[test]
    fn test_unconfigured_categories_pass_through() {
        let (h, mut interceptor) = harness(true);
        interceptor.attach(&[EventCategory::Wheel]);

        h.dispatcher.dispatch(&RawEvent::pointer_move(1.0, 0.0, 0.0));

        assert_eq!(h.app_seen.load(Ordering::SeqCst), 1);
        assert!(h.forwarded.lock().is_empty());
    }

    #[test]
    fn test_attach_twice_does_not_duplicate() {
        let (h, mut interceptor) = harness(true);
        interceptor.attach(&[EventCategory::Scroll]);
        interceptor.attach(&[EventCategory::Scroll]);

        // one app listener plus one capture listener
        assert_eq!(h.dispatcher.listener_count(EventCategory::Scroll), 2);
    }

    #[test]
    fn test_detach_is_idempotent() {
        let (h, mut interceptor) = harness(true);
        interceptor.attach(&EventCategory::ALL);
        assert!(interceptor.is_attached());

        interceptor.detach();
        interceptor.detach();

        assert!(!interceptor.is_attached());
        h.dispatcher.dispatch(&RawEvent::touch_move(1.0, vec![]));
        assert_eq!(h.app_seen.load(Ordering::SeqCst), 1);
        assert!(h.forwarded.lock().is_empty());
    }

    #[test]
    fn test_update_categories_swaps_listeners() {
        let (h, mut interceptor) = harness(true);
        interceptor.attach(&[EventCategory::PointerMove]);
        interceptor.update_categories(&[EventCategory::Wheel, EventCategory::Scroll]);

        assert_eq!(
            interceptor.categories(),
            vec![EventCategory::Wheel, EventCategory::Scroll]
        );

        h.dispatcher.dispatch(&RawEvent::pointer_move(1.0, 0.0, 0.0));
        assert_eq!(h.app_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_listeners() {
        let (h, mut interceptor) = harness(true);
        interceptor.attach(&[EventCategory::Wheel]);
        drop(interceptor);

        assert_eq!(h.dispatcher.listener_count(EventCategory::Wheel), 1);
    }
}
