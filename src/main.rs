//! Simulates a high-polling device against a fixed refresh rate and prints the
//! resulting metrics.
//!
//! Usage: frame-throttle [polling_hz] [refresh_hz] [seconds]

use anyhow::{bail, Context, Result};
use frame_throttle::input::{EventDispatcher, EventSource, Phase, Propagation};
use frame_throttle::{init_tracing, EventCategory, FrameLoop, ManualClock, RawEvent, Throttle, ThrottleConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const DEFAULT_POLLING_HZ: f64 = 8000.0;
const DEFAULT_REFRESH_HZ: f64 = 144.0;
const DEFAULT_SECONDS: f64 = 1.0;

struct Args {
    polling_hz: f64,
    refresh_hz: f64,
    seconds: f64,
}

fn parse_arg(value: Option<String>, name: &str, default: f64) -> Result<f64> {
    let Some(value) = value else {
        return Ok(default);
    };
    let parsed: f64 = value
        .parse()
        .with_context(|| format!("{} must be a number, got \"{}\"", name, value))?;
    if !parsed.is_finite() || parsed <= 0.0 {
        bail!("{} must be positive, got {}", name, parsed);
    }
    Ok(parsed)
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    Ok(Args {
        polling_hz: parse_arg(args.next(), "polling_hz", DEFAULT_POLLING_HZ)?,
        refresh_hz: parse_arg(args.next(), "refresh_hz", DEFAULT_REFRESH_HZ)?,
        seconds: parse_arg(args.next(), "seconds", DEFAULT_SECONDS)?,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = parse_args()?;
    init_tracing(false);

    tracing::info!(
        "Simulating {}Hz input at {}Hz refresh for {}s",
        args.polling_hz,
        args.refresh_hz,
        args.seconds
    );

    let dispatcher = Arc::new(EventDispatcher::new());
    let frames = Arc::new(FrameLoop::new());
    let clock = Arc::new(ManualClock::new(0.0));

    // Stands in for the application's own handlers.
    let leaked = Arc::new(AtomicU64::new(0));
    for category in [EventCategory::PointerMove, EventCategory::Wheel] {
        let leaked = leaked.clone();
        dispatcher.add_listener(
            category,
            Phase::Bubble,
            Arc::new(move |_event: &RawEvent, _propagation: &mut Propagation| {
                leaked.fetch_add(1, Ordering::Relaxed);
            }),
        );
    }

    let delivered = Arc::new(AtomicU64::new(0));
    let throttle = {
        let delivered = delivered.clone();
        Throttle::builder(dispatcher.clone(), frames.clone())
            .config(ThrottleConfig::default())
            .clock(clock.clone())
            .build(move |_event, _deltas| {
                delivered.fetch_add(1, Ordering::Relaxed);
            })
    };

    let event_interval = 1000.0 / args.polling_hz;
    let frame_interval = 1000.0 / args.refresh_hz;
    let duration_ms = args.seconds * 1000.0;

    let mut next_frame = frame_interval;
    let mut step: u64 = 0;
    loop {
        let now = step as f64 * event_interval;
        if now >= duration_ms {
            break;
        }

        while next_frame <= now {
            clock.set(next_frame);
            frames.tick(next_frame);
            next_frame += frame_interval;
            // Let the spawned deliveries run before the next frame.
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
        }

        clock.set(now);
        dispatcher.dispatch(&RawEvent::pointer_move(now, (step % 1920) as f64, 540.0));
        step += 1;
    }

    // Final frame for whatever is still pending.
    clock.set(next_frame);
    frames.tick(next_frame);
    for _ in 0..3 {
        tokio::task::yield_now().await;
    }

    let snapshot = throttle.snapshot();
    throttle.teardown();

    tracing::info!(
        "Delivered {} of {} events, {} leaked to the application",
        delivered.load(Ordering::Relaxed),
        snapshot.raw_count,
        leaked.load(Ordering::Relaxed)
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
