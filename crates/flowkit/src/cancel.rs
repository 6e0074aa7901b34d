//! Cooperative cancellation shared by the retry wait and the in-flight request.
//!
//! A [`CancelToken`] combines an explicit signal with an optional deadline.
//! The retry combinator sleeps on the token so a cancel wakes it immediately.
//! The HTTP transport runs each exchange through [`CancelToken::run`], which
//! waits on the same signal, so one cancel bounds both suspension points.

use crate::error::{Error, Result};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Signal {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Cancellation signal for one logical operation.
///
/// Clones share the same signal. Cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    signal: Arc<Signal>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is only cancelled explicitly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also cancels once `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            signal: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Derive a token sharing this signal with a (possibly tighter) deadline.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            signal: Arc::clone(&self.signal),
            deadline: Some(deadline),
        }
    }

    /// Signal cancellation and wake any waiter.
    pub fn cancel(&self) {
        let mut cancelled = self
            .signal
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.signal.wake.notify_all();
    }

    /// Whether the signal fired or the deadline passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        let flagged = *self
            .signal
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        flagged || self.deadline_passed()
    }

    /// Time left before the deadline, if one is set.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Clamp a timeout to the remaining deadline.
    #[must_use]
    pub fn bound(&self, timeout: Duration) -> Duration {
        self.remaining().map_or(timeout, |left| left.min(timeout))
    }

    /// Return `Err(Cancelled)` if the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(self.cancelled_error());
        }
        Ok(())
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Cancellation wins ties: a token that fires exactly as the wait ends
    /// still yields `Err(Cancelled)`.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let wake_at = Instant::now() + duration;
        let mut cancelled = self
            .signal
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        loop {
            if *cancelled || self.deadline_passed() {
                return Err(self.cancelled_error());
            }
            let now = Instant::now();
            if now >= wake_at {
                return Ok(());
            }
            let mut wait = wake_at - now;
            if let Some(left) = self.remaining() {
                wait = wait.min(left);
            }
            let (guard, _) = self
                .signal
                .wake
                .wait_timeout(cancelled, wait)
                .unwrap_or_else(PoisonError::into_inner);
            cancelled = guard;
        }
    }

    /// Run `work` on a worker thread, returning early if the token fires.
    ///
    /// A cancelled worker is abandoned and its result dropped when it ends.
    /// Cancellation wins ties with completion.
    pub fn run<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.check()?;

        let slot = Arc::new(Mutex::new(None));
        let worker = {
            let slot = Arc::clone(&slot);
            let signal = Arc::clone(&self.signal);
            move || {
                let value = work();
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
                let _held = signal
                    .cancelled
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                signal.wake.notify_all();
            }
        };
        thread::Builder::new()
            .name("flowkit-exchange".into())
            .spawn(worker)
            .map_err(|err| Error::Network {
                attempts: 1,
                message: format!("could not start request worker: {err}"),
            })?;

        let mut cancelled = self
            .signal
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if *cancelled || self.deadline_passed() {
                return Err(self.cancelled_error());
            }
            if let Some(value) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
                return Ok(value);
            }
            cancelled = match self.remaining() {
                Some(left) => {
                    self.signal
                        .wake
                        .wait_timeout(cancelled, left)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .signal
                    .wake
                    .wait(cancelled)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    fn deadline_passed(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub(crate) fn cancelled_error(&self) -> Error {
        if self.deadline_passed() {
            Error::cancelled("deadline exceeded")
        } else {
            Error::cancelled("cancelled by caller")
        }
    }
}
