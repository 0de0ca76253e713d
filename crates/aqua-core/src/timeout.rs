//! Timeout and deadline model shared by every bounded wait

use std::time::{Duration, Instant};

/// How long a bounded operation may wait.
///
/// The numeric convention follows [`Timeout::from_secs_f64`]: zero means
/// wait forever, a negative value means poll once and give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// No deadline. A stalled line blocks the caller indefinitely.
    #[default]
    Forever,
    /// Check exactly once, never wait
    Immediate,
    /// Give up once this much time has elapsed
    After(Duration),
}

impl Timeout {
    /// Map a seconds value onto a timeout.
    ///
    /// `0.0` is [`Timeout::Forever`], negative or NaN is
    /// [`Timeout::Immediate`], anything else is [`Timeout::After`]. Values
    /// too large for a `Duration` (infinity included) saturate to
    /// [`Timeout::Forever`].
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs == 0.0 {
            Timeout::Forever
        } else if secs.is_nan() || secs < 0.0 {
            Timeout::Immediate
        } else {
            match Duration::try_from_secs_f64(secs) {
                Ok(duration) => Timeout::After(duration),
                Err(_) => Timeout::Forever,
            }
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Timeout::After(Duration::from_millis(millis))
    }

    /// Start the clock
    pub fn start(self) -> Deadline {
        Deadline {
            started: Instant::now(),
            timeout: self,
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::After(duration)
    }
}

/// A timeout anchored at the instant it was armed.
///
/// Uses the monotonic clock, so wall-clock adjustments never stretch or cut a
/// wait short.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    timeout: Timeout,
}

impl Deadline {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn expired(&self) -> bool {
        match self.timeout {
            Timeout::Forever => false,
            Timeout::Immediate => true,
            Timeout::After(limit) => self.elapsed() >= limit,
        }
    }

    /// Time left before expiry; `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        match self.timeout {
            Timeout::Forever => None,
            Timeout::Immediate => Some(Duration::ZERO),
            Timeout::After(limit) => Some(limit.saturating_sub(self.elapsed())),
        }
    }
}
