//! Background idle polling.
//!
//! Owns an [`IdleTimeHandle`] inside a tokio task, caches the idle state for
//! cheap reads, and reports transitions over a channel.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::error::IdleError;
use crate::idle::IdleRegistry;
use crate::idle::IdleTimeHandle;
use crate::tracker::IdleTracker;
use crate::tracker::IdleTransition;

/// Consecutive read failures tolerated before giving up on idle gating.
const MAX_CONSECUTIVE_READ_FAILURES: u32 = 3;

const TRANSITION_CHANNEL_CAPACITY: usize = 16;

/// Idle monitor that polls the idle-time registry.
pub struct IdleMonitor {
    /// Cached idle state.
    idle: AtomicBool,

    /// Last idle reading in milliseconds.
    idle_millis: AtomicU64,

    /// Whether idle monitoring is available/enabled.
    enabled: AtomicBool,

    threshold: Duration,
}

impl IdleMonitor {
    /// Create a new idle monitor with the given idle threshold.
    pub fn new(threshold: Duration) -> Self {
        Self {
            idle: AtomicBool::new(false),
            idle_millis: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
            threshold,
        }
    }

    /// Check if the user is currently idle.
    ///
    /// Returns false if idle monitoring is disabled.
    pub fn is_idle(&self) -> bool {
        if !self.is_enabled() {
            return false; // Unknown idle time means the user counts as active
        }
        self.idle.load(Ordering::Relaxed)
    }

    /// Last idle reading, or `None` when monitoring is disabled.
    pub fn idle_duration(&self) -> Option<Duration> {
        self.is_enabled()
            .then(|| Duration::from_millis(self.idle_millis.load(Ordering::Relaxed)))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Disable idle monitoring (fallback mode).
    pub fn disable(&self) {
        warn!("Disabling idle monitoring");
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Take one reading from `handle` and update the cached state.
    pub fn poll_idle_state<R: IdleRegistry>(
        &self,
        handle: &IdleTimeHandle<R>,
        tracker: &mut IdleTracker,
    ) -> Result<Vec<IdleTransition>, IdleError> {
        let idle = handle.query_idle()?;
        let millis = u64::try_from(idle.as_millis()).unwrap_or(u64::MAX);
        self.idle_millis.store(millis, Ordering::Relaxed);

        let transitions = tracker.observe(idle);
        let now_idle = tracker.state().is_idle();
        let prev = self.idle.swap(now_idle, Ordering::Relaxed);

        if now_idle == prev {
            trace!("Idle for {:?} (idle={})", idle, now_idle);
        } else {
            debug!("Idle state changed: {} -> {}", prev, now_idle);
        }

        Ok(transitions)
    }

    /// Start background polling task.
    ///
    /// `open` runs inside the task. The returned channel closes, and the
    /// monitor is disabled, in two cases:
    /// - `open` fails, before any transition is sent
    /// - reads fail several times in a row, with no final `Resumed` even if
    ///   the last transition was `WentIdle`
    ///
    /// Either way the user must be treated as active from then on.
    /// Dropping the receiver stops polling and releases the handle.
    pub fn start_polling<R, F>(
        self: Arc<Self>,
        interval: Duration,
        open: F,
    ) -> mpsc::Receiver<IdleTransition>
    where
        R: IdleRegistry + Send + 'static,
        F: FnOnce() -> Result<IdleTimeHandle<R>, IdleError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(TRANSITION_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let handle = match open() {
                Ok(handle) => handle,
                Err(e) => {
                    error!("Failed to acquire idle time: {}. Disabling idle gating.", e);
                    self.disable();
                    return;
                }
            };

            info!(
                "Idle monitor started, polling every {:?} (threshold {:?})",
                interval, self.threshold
            );

            self.run(handle, interval, tx).await;
        });

        rx
    }

    /// Poll until the receiver goes away or reads keep failing, then
    /// release the handle.
    async fn run<R: IdleRegistry>(
        &self,
        handle: IdleTimeHandle<R>,
        interval: Duration,
        tx: mpsc::Sender<IdleTransition>,
    ) {
        let mut tracker = IdleTracker::new(self.threshold);
        let mut failures = 0;

        loop {
            let polled = self.poll_idle_state(&handle, &mut tracker);
            match polled {
                Ok(transitions) => {
                    failures = 0;
                    for transition in transitions {
                        if tx.send(transition).await.is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        "Failed to poll idle time ({}/{}): {}",
                        failures, MAX_CONSECUTIVE_READ_FAILURES, e
                    );
                    if failures >= MAX_CONSECUTIVE_READ_FAILURES {
                        error!("Idle time unreadable. Disabling idle gating.");
                        self.disable();
                        break;
                    }
                }
            }

            if tx.is_closed() {
                debug!("Transition receiver dropped, stopping idle monitor");
                break;
            }

            tokio::time::sleep(interval).await;
        }

        handle.release();
    }
}
