//! Throttle orchestrator
//!
//! Wires the interceptor, detector, sampling buffer, yield scheduler and metrics
//! into one pipeline:
//!
//! raw event -> interceptor (count, detect, suppress) -> buffer (coalesce)
//! -> frame -> yield -> consumer -> metrics
//!
//! Building a [`Throttle`] attaches it immediately; [`Throttle::teardown`] (or
//! dropping it) detaches and guarantees the consumer is not called again.

use crate::input::dispatch::EventSource;
use crate::input::interceptor::{EventInterceptor, ForwardFn, InterceptPredicate};
use crate::input::types::{AccumulatedDeltas, EventCategory, RawEvent};
use crate::pipeline::config::{SampleRate, ThrottleConfig};
use crate::pipeline::reporter::{spawn_reporter, MetricsCallback};
use crate::processing::detector::{PollingClassification, PollingRateDetector};
use crate::processing::metrics::{MetricsCollector, MetricsSnapshot};
use crate::processing::sampling::{DeliverFn, SamplingBuffer};
use crate::runtime::clock::{Clock, MonotonicClock};
use crate::runtime::frame::{FrameLoop, FrameScheduler};
use crate::runtime::yielding::{NativeYield, Priority, YieldScheduler};
use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type Flush = (RawEvent, Option<AccumulatedDeltas>);

pub struct ThrottleBuilder {
    source: Arc<dyn EventSource>,
    frames: Arc<dyn FrameScheduler>,
    config: ThrottleConfig,
    clock: Option<Arc<dyn Clock>>,
    yield_scheduler: Option<YieldScheduler>,
    runtime: Option<Handle>,
    on_metrics: Option<MetricsCallback>,
}

impl ThrottleBuilder {
    pub fn config(mut self, config: ThrottleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn yield_scheduler(mut self, scheduler: YieldScheduler) -> Self {
        self.yield_scheduler = Some(scheduler);
        self
    }

    /// Runtime used for deliveries, the metrics timer and fixed-rate sampling.
    /// Defaults to the runtime the builder runs in, if any.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Called with a fresh snapshot every [`REPORT_INTERVAL`](crate::pipeline::REPORT_INTERVAL).
    pub fn on_metrics(mut self, callback: impl Fn(MetricsSnapshot) + Send + Sync + 'static) -> Self {
        self.on_metrics = Some(Arc::new(callback));
        self
    }

    pub fn build(self, consumer: impl Fn(RawEvent, Option<AccumulatedDeltas>) + Send + Sync + 'static) -> Throttle {
        let config = self.config;
        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());

        let active = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(ParkingMutex::new(MetricsCollector::new(clock.clone())));
        let detector = Arc::new(ParkingMutex::new(PollingRateDetector::new()));

        let (frames, frame_driver) = match (config.sample_rate, &runtime) {
            (SampleRate::Hz(hz), _) if !config.sample_rate.is_valid() => {
                tracing::warn!(
                    "Invalid sampleRate {}Hz; flushing on host refresh instead",
                    hz
                );
                (self.frames, None)
            }
            (SampleRate::Hz(hz), Some(handle)) => {
                let frame_loop = Arc::new(FrameLoop::new());
                let driver = frame_loop.drive(handle, hz, clock.clone());
                (frame_loop as Arc<dyn FrameScheduler>, Some(driver))
            }
            (SampleRate::Hz(hz), None) => {
                tracing::warn!(
                    "sampleRate {}Hz needs a tokio runtime; flushing on host refresh instead",
                    hz
                );
                (self.frames, None)
            }
            (SampleRate::Auto, _) => (self.frames, None),
        };

        let sink = Arc::new(DeliverySink {
            active: active.clone(),
            metrics: metrics.clone(),
            clock,
            consumer: Arc::new(consumer),
        });
        let (delivery, delivery_worker) = match &runtime {
            Some(handle) => {
                // The worker always runs inside `handle`, so the native yield is available.
                let scheduler = self
                    .yield_scheduler
                    .unwrap_or_else(|| YieldScheduler::new(Some(Arc::new(NativeYield))));
                let (queue, worker) = spawn_delivery_worker(handle, sink.clone(), scheduler, config.priority);
                (Delivery { sink, queue: Some(queue) }, Some(worker))
            }
            None => (Delivery { sink, queue: None }, None),
        };
        let buffer = SamplingBuffer::new(
            frames,
            config.accumulate_deltas,
            Arc::new(move |event: RawEvent, deltas: Option<AccumulatedDeltas>| {
                delivery.dispatch(event, deltas)
            }),
        );

        let should_intercept = intercept_predicate(
            active.clone(),
            metrics.clone(),
            detector.clone(),
            config.debug,
        );
        let forward: ForwardFn = {
            let buffer = buffer.clone();
            Arc::new(move |event: RawEvent| buffer.submit(event))
        };
        let mut interceptor = EventInterceptor::new(self.source, should_intercept, forward);
        interceptor.attach(&config.event_types);

        let reporter = match (&runtime, self.on_metrics.is_some() || config.debug) {
            (Some(handle), true) => Some(spawn_reporter(
                handle,
                metrics.clone(),
                self.on_metrics,
                config.debug,
                active.clone(),
            )),
            (None, true) => {
                tracing::warn!("Metrics reporting needs a tokio runtime; no reports will be sent");
                None
            }
            (_, false) => None,
        };

        tracing::info!(
            "Throttle attached (event_types={:?}, sample_rate={:?}, priority={:?}, accumulate_deltas={})",
            config.event_types,
            config.sample_rate,
            config.priority,
            config.accumulate_deltas
        );

        Throttle {
            config,
            active,
            detector,
            metrics,
            buffer,
            interceptor: ParkingMutex::new(interceptor),
            tasks: ParkingMutex::new(BackgroundTasks {
                reporter,
                frame_driver,
                delivery_worker,
            }),
        }
    }
}

/// Counts every raw event, feeds pointer timestamps to the detector, and
/// intercepts everything while the pipeline is active.
fn intercept_predicate(
    active: Arc<AtomicBool>,
    metrics: Arc<ParkingMutex<MetricsCollector>>,
    detector: Arc<ParkingMutex<PollingRateDetector>>,
    debug: bool,
) -> InterceptPredicate {
    Arc::new(move |event: &RawEvent| {
        if !active.load(Ordering::Acquire) {
            return false;
        }

        metrics.lock().record_raw();

        if event.category() == EventCategory::PointerMove {
            let (was_resolved, classification) = {
                let mut detector = detector.lock();
                let was_resolved = detector.is_resolved();
                (was_resolved, detector.classify(event.timestamp_ms))
            };

            if !was_resolved && classification.is_resolved() {
                metrics.lock().set_classification(classification);
                if debug {
                    tracing::debug!(
                        "Polling rate classified: {:?} (~{}Hz)",
                        classification.rate,
                        classification.estimated_hz
                    );
                }
            }
        }

        true
    })
}

/// Runs every flush through one task, so deliveries never overlap and keep
/// frame order even on a multi-thread runtime.
fn spawn_delivery_worker(
    handle: &Handle,
    sink: Arc<DeliverySink>,
    scheduler: YieldScheduler,
    priority: Priority,
) -> (mpsc::UnboundedSender<Flush>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Flush>();

    let worker = handle.spawn(async move {
        while let Some((event, deltas)) = rx.recv().await {
            scheduler
                .run_yielding(|| sink.deliver(event, deltas), priority)
                .await;
        }
        tracing::debug!("Delivery worker stopped");
    });

    (tx, worker)
}

/// Flush entry point handed to the sampling buffer.
struct Delivery {
    sink: Arc<DeliverySink>,
    queue: Option<mpsc::UnboundedSender<Flush>>,
}

impl Delivery {
    fn dispatch(&self, event: RawEvent, deltas: Option<AccumulatedDeltas>) {
        if !self.sink.is_active() {
            return;
        }

        match &self.queue {
            Some(queue) => {
                if queue.send((event, deltas)).is_err() {
                    tracing::debug!("Delivery worker gone; dropping flush");
                }
            }
            // Nothing to yield to without an executor.
            None => self.sink.deliver(event, deltas),
        }
    }
}

struct DeliverySink {
    active: Arc<AtomicBool>,
    metrics: Arc<ParkingMutex<MetricsCollector>>,
    clock: Arc<dyn Clock>,
    consumer: DeliverFn,
}

impl DeliverySink {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn deliver(&self, event: RawEvent, deltas: Option<AccumulatedDeltas>) {
        // May have been torn down while yielding.
        if !self.is_active() {
            return;
        }

        let started = self.clock.now_ms();
        (self.consumer)(event, deltas);
        let elapsed = self.clock.now_ms() - started;

        let mut metrics = self.metrics.lock();
        metrics.record_flushed();
        metrics.record_frame();
        metrics.record_processing_time(elapsed);
    }
}

#[derive(Default)]
struct BackgroundTasks {
    reporter: Option<JoinHandle<()>>,
    frame_driver: Option<JoinHandle<()>>,
    delivery_worker: Option<JoinHandle<()>>,
}

impl BackgroundTasks {
    fn abort_all(&mut self) {
        for task in [
            self.reporter.take(),
            self.frame_driver.take(),
            self.delivery_worker.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }
}

pub struct Throttle {
    config: ThrottleConfig,
    active: Arc<AtomicBool>,
    detector: Arc<ParkingMutex<PollingRateDetector>>,
    metrics: Arc<ParkingMutex<MetricsCollector>>,
    buffer: SamplingBuffer,
    interceptor: ParkingMutex<EventInterceptor>,
    tasks: ParkingMutex<BackgroundTasks>,
}

impl Throttle {
    /// Starts building a throttle on `source`, flushing on `frames`.
    pub fn builder(source: Arc<dyn EventSource>, frames: Arc<dyn FrameScheduler>) -> ThrottleBuilder {
        ThrottleBuilder {
            source,
            frames,
            config: ThrottleConfig::default(),
            clock: None,
            yield_scheduler: None,
            runtime: None,
            on_metrics: None,
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.lock().snapshot()
    }

    pub fn classification(&self) -> PollingClassification {
        self.detector.lock().classification()
    }

    /// Forces re-detection, e.g. after the user swapped devices.
    pub fn reset_detector(&self) {
        self.detector.lock().reset();
        self.metrics
            .lock()
            .set_classification(PollingClassification::default());
        if self.config.debug {
            tracing::debug!("Polling rate detector reset");
        }
    }

    pub fn reset_metrics(&self) {
        self.metrics.lock().reset();
    }

    pub fn event_types(&self) -> Vec<EventCategory> {
        self.interceptor.lock().categories()
    }

    /// Re-attaches the interceptor with a new category set. No-op once torn down.
    pub fn set_event_types(&self, categories: &[EventCategory]) {
        if !self.is_active() {
            return;
        }
        self.interceptor.lock().update_categories(categories);
    }

    /// Detaches from the event source and stops all pending work. Idempotent.
    pub fn teardown(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }

        self.interceptor.lock().detach();
        self.buffer.teardown();
        self.tasks.lock().abort_all();

        let snapshot = self.snapshot();
        tracing::info!(
            "Throttle torn down (raw={}, flushed={}, reduction={}%)",
            snapshot.raw_count,
            snapshot.flushed_count,
            snapshot.reduction_percentage
        );
    }
}

impl Drop for Throttle {
    fn drop(&mut self) {
        self.teardown();
    }
}
