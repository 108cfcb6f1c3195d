//! Bounded retry with a fixed backoff
//!
//! Each logical operation gets `max_attempts` tries in total. The loop is an
//! explicit [`RetryState`] machine whose transition is a pure function, and
//! waiting between attempts goes through an injected [`Sleeper`].

use std::time::Duration;

use super::diagnostics::Diagnostics;
use super::error::AdapterError;

/// Value returned by a set operation that the core acknowledged
pub const OK: &str = "ok";

/// Value returned by a get operation that found nothing to read
pub const UNKNOWN: &str = "unknown";

/// Default number of attempts, the first one included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between attempts
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Something that can wait.
pub trait Sleeper: Send {
    /// Block for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Where a retried operation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to make attempt `n` (1-based)
    Attempting(u32),
    /// The last attempt succeeded
    Succeeded,
    /// The last permitted attempt failed
    Exhausted,
}

impl RetryState {
    /// Initial state
    pub const fn start() -> Self {
        RetryState::Attempting(1)
    }

    /// State after the current attempt finished.
    pub fn advance(self, succeeded: bool, max_attempts: u32) -> Self {
        match self {
            RetryState::Attempting(_) if succeeded => RetryState::Succeeded,
            RetryState::Attempting(n) if n >= max_attempts => RetryState::Exhausted,
            RetryState::Attempting(n) => RetryState::Attempting(n + 1),
            done => done,
        }
    }

    /// Whether no more attempts will be made
    pub fn is_terminal(self) -> bool {
        !matches!(self, RetryState::Attempting(_))
    }
}

/// What counts as a successful attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Success {
    /// The value is [`OK`] (set operations)
    Acknowledged,
    /// The value is anything but [`UNKNOWN`] (get operations)
    Known,
}

impl Success {
    /// Whether an attempt returning `value` without error succeeded.
    pub fn accepts(self, value: &str) -> bool {
        match self {
            Success::Acknowledged => value == OK,
            Success::Known => value != UNKNOWN,
        }
    }
}

/// Final value of a retried operation
#[derive(Debug)]
pub struct Settled {
    /// Value of the last attempt; on error, the error's description
    pub value: String,
    /// Error of the last attempt, or [`AdapterError::RetriesExhausted`]
    pub error: Option<AdapterError>,
    /// Attempts made
    pub attempts: u32,
}

/// Retry limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Run `attempt` until it succeeds or the attempts run out.
    ///
    /// Every failed attempt is recorded in `diagnostics`. An exhausted
    /// operation additionally records a "max retries reached" entry and still
    /// hands back the last value it saw.
    pub fn run<F>(
        &self,
        operation: &str,
        success: Success,
        sleeper: &mut dyn Sleeper,
        diagnostics: &mut Diagnostics,
        mut attempt: F,
    ) -> Settled
    where
        F: FnMut(&mut Diagnostics) -> Result<String, AdapterError>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut state = RetryState::start();
        let mut attempts = 0;
        let mut value = String::new();
        let mut error = None;

        while let RetryState::Attempting(n) = state {
            attempts = n;
            let succeeded = match attempt(diagnostics) {
                Ok(returned) => {
                    let accepted = success.accepts(&returned);
                    value = returned;
                    error = None;
                    accepted
                }
                Err(err) => {
                    diagnostics.record(format!("{operation} - {err}"));
                    value = err.to_string();
                    error = Some(err);
                    false
                }
            };

            state = state.advance(succeeded, max_attempts);
            if let RetryState::Attempting(next) = state {
                tracing::info!(operation, attempt = n, next, "retrying operation");
                sleeper.sleep(self.backoff);
            }
        }

        if state == RetryState::Exhausted {
            diagnostics.record(format!("{operation} - max retries reached"));
            if error.is_none() {
                error = Some(AdapterError::RetriesExhausted {
                    operation: operation.to_owned(),
                    attempts,
                });
            }
        }

        Settled {
            value,
            error,
            attempts,
        }
    }
}
