//! The single polling loop behind every bounded wait

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::timeout::Deadline;

/// What the poll loop does between two probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollStrategy {
    /// Re-probe immediately (lowest latency, burns a core)
    #[default]
    Spin,
    /// Give the rest of the time slice back to the scheduler
    Yield,
    /// Sleep for a fixed interval
    Sleep(Duration),
}

/// Shared flag that stops a wait from another thread
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Re-arm after a cancellation
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Drives a probe until it yields a value, the deadline expires, or the
/// cancel token fires.
#[derive(Debug, Clone, Default)]
pub struct Poller {
    strategy: PollStrategy,
    cancel: Option<CancelToken>,
}

impl Poller {
    pub fn new(strategy: PollStrategy) -> Self {
        Self {
            strategy,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Run `probe` until it returns `Some`.
    ///
    /// The probe always runs at least once, so an immediate deadline still
    /// gets one look. Errors from the probe end the loop straight away.
    pub fn poll<T, F>(&self, deadline: &Deadline, mut probe: F) -> Result<T>
    where
        F: FnMut() -> Result<Option<T>>,
    {
        loop {
            if let Some(value) = probe()? {
                return Ok(value);
            }

            if self.is_cancelled() {
                tracing::debug!("poll cancelled after {:?}", deadline.elapsed());
                return Err(TransportError::Cancelled);
            }

            if deadline.expired() {
                let waited = deadline.elapsed();
                tracing::debug!("poll timed out after {:?}", waited);
                return Err(TransportError::TimedOut { waited });
            }

            self.pause(deadline);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn pause(&self, deadline: &Deadline) {
        match self.strategy {
            PollStrategy::Spin => std::hint::spin_loop(),
            PollStrategy::Yield => std::thread::yield_now(),
            PollStrategy::Sleep(interval) => {
                // Never oversleep the deadline by more than one interval
                let nap = deadline
                    .remaining()
                    .map_or(interval, |left| left.min(interval));
                std::thread::sleep(nap);
            }
        }
    }
}
