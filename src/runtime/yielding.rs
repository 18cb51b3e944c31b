//! Cooperative yield before delivery
//!
//! Delivery of a coalesced event is deferred by one cooperative yield so the host
//! can run pending higher-priority work first. Two interchangeable strategies sit
//! behind [`YieldStrategy`]:
//!
//! - [`NativeYield`] uses the tokio scheduler and honours the priority hint.
//! - [`DeferredYield`] is a runtime-agnostic future that suspends exactly once.
//!
//! [`YieldScheduler`] picks the native strategy when it is available and falls back
//! to the deferred one whenever the native strategy is missing or fails. Errors are
//! never surfaced to callers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::runtime::Handle;

/// Priority hint passed to the yield primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    #[default]
    UserVisible,
    Background,
}

#[derive(Error, Debug)]
pub enum YieldError {
    #[error("No async runtime available")]
    RuntimeUnavailable,

    #[error("Yield primitive failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait YieldStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Suspends the caller at least once.
    async fn yield_once(&self, priority: Priority) -> Result<(), YieldError>;
}

/// Yields through the tokio scheduler.
///
/// Background work yields an extra round so user-visible continuations queued in
/// the same cycle resume first.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeYield;

impl NativeYield {
    pub fn is_available() -> bool {
        Handle::try_current().is_ok()
    }
}

#[async_trait]
impl YieldStrategy for NativeYield {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn yield_once(&self, priority: Priority) -> Result<(), YieldError> {
        if !Self::is_available() {
            return Err(YieldError::RuntimeUnavailable);
        }

        let rounds = match priority {
            Priority::UserVisible => 1,
            Priority::Background => 2,
        };
        for _ in 0..rounds {
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

/// Zero-delay resumption: wakes itself and returns `Pending` exactly once.
///
/// Tokio treats a wake issued during the task's own poll as a yield and queues
/// the task behind work that is already runnable, on both scheduler flavors.
/// Other executors may resume it sooner; only the single suspension is
/// guaranteed there.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredYield;

#[async_trait]
impl YieldStrategy for DeferredYield {
    fn name(&self) -> &'static str {
        "deferred"
    }

    async fn yield_once(&self, _priority: Priority) -> Result<(), YieldError> {
        YieldOnce { yielded: false }.await;
        Ok(())
    }
}

struct YieldOnce {
    yielded: bool,
}

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

pub struct YieldScheduler {
    native: Option<Arc<dyn YieldStrategy>>,
    fallback: Arc<dyn YieldStrategy>,
}

impl YieldScheduler {
    pub fn new(native: Option<Arc<dyn YieldStrategy>>) -> Self {
        Self {
            native,
            fallback: Arc::new(DeferredYield),
        }
    }

    /// Uses [`NativeYield`] when called inside a tokio runtime.
    pub fn detect() -> Self {
        if NativeYield::is_available() {
            Self::new(Some(Arc::new(NativeYield)))
        } else {
            tracing::debug!("No native yield primitive, using deferred fallback");
            Self::new(None)
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn YieldStrategy>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn has_native(&self) -> bool {
        self.native.is_some()
    }

    /// Yields once, then runs `work` synchronously and returns its result.
    pub async fn run_yielding<F, R>(&self, work: F, priority: Priority) -> R
    where
        F: FnOnce() -> R,
    {
        self.yield_point(priority).await;
        work()
    }

    async fn yield_point(&self, priority: Priority) {
        if let Some(native) = &self.native {
            match native.yield_once(priority).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::debug!("{} yield failed, falling back: {}", native.name(), e);
                }
            }
        }

        if let Err(e) = self.fallback.yield_once(priority).await {
            // The fallback still suspended or failed outright; either way work proceeds.
            tracing::debug!("{} yield failed: {}", self.fallback.name(), e);
        }
    }
}

impl Default for YieldScheduler {
    fn default() -> Self {
        Self::detect()
    }
}
