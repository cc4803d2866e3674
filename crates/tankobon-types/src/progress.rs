//! Progress tracking and cooperative cancellation for a single task.
//!
//! A [`ProgressToken`] moves through
//! `Standby -> Running -> Complete | Cancelled`. Terminal states never regress.
//!
//! Cancellation is cooperative: [`ProgressToken::request_cancel`] only raises a
//! flag. The executing task polls it at its checkpoints (before every network
//! request and before every archive write) through
//! [`ProgressToken::checkpoint`], and on observing it aborts and calls
//! [`ProgressToken::cancel`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Notify;

/// Lifecycle state of a [`ProgressToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenState {
    /// Queued, not started.
    #[default]
    Standby,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Complete,
    /// Aborted, either on request or because the task failed.
    Cancelled,
}

impl TokenState {
    /// Returns true for `Standby` and `Running`.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Standby | Self::Running)
    }

    /// Returns true if the state is terminal.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }

    /// Returns the state as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standby => "standby",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Standby,
            1 => Self::Running,
            2 => Self::Complete,
            _ => Self::Cancelled,
        }
    }
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned by [`ProgressToken::checkpoint`] once cancellation was requested.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cancellation requested")]
pub struct Cancelled;

/// Point-in-time copy of a token, suitable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Lifecycle state.
    pub state: TokenState,
    /// Fractional progress in `0.0..=1.0`.
    pub progress: f64,
    /// Whether cancellation has been requested.
    pub cancellation_requested: bool,
}

/// Cancellable state machine reporting a task's lifecycle and progress.
///
/// All methods take `&self`; the token is shared as `Arc<ProgressToken>`
/// between the task that owns it and any number of observers.
#[derive(Debug, Default)]
pub struct ProgressToken {
    state: AtomicU8,
    cancellation_requested: AtomicBool,
    /// `f64` bit pattern.
    progress: AtomicU64,
    steps_total: AtomicU64,
    steps_done: AtomicU64,
    finished: Notify,
}

impl ProgressToken {
    /// Creates a token in `Standby`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TokenState {
        TokenState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns the current progress in `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        f64::from_bits(self.progress.load(Ordering::Acquire))
    }

    /// Returns true once [`request_cancel`](Self::request_cancel) succeeded.
    #[must_use]
    pub fn is_cancellation_requested(&self) -> bool {
        self.cancellation_requested.load(Ordering::Acquire)
    }

    /// Returns a consistent-enough copy for listings.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            state: self.state(),
            progress: self.progress(),
            cancellation_requested: self.is_cancellation_requested(),
        }
    }

    /// Requests cancellation. Has no effect once the token is terminal.
    ///
    /// Returns true if the request was recorded.
    pub fn request_cancel(&self) -> bool {
        if self.state().is_finished() {
            return false;
        }
        self.cancellation_requested.store(true, Ordering::Release);
        true
    }

    /// Cancellation checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation has been requested.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancellation_requested() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// `Standby -> Running`. Returns false if the token was not in `Standby`.
    pub fn start(&self) -> bool {
        self.transition(|s| s == TokenState::Standby, TokenState::Running)
    }

    /// `Standby | Running -> Complete`. Returns false if already terminal.
    pub fn complete(&self) -> bool {
        let moved = self.transition(|s| s.is_active(), TokenState::Complete);
        if moved {
            self.store_progress(1.0);
            self.finished.notify_waiters();
        }
        moved
    }

    /// `Standby | Running -> Cancelled`. Returns false if already terminal.
    pub fn cancel(&self) -> bool {
        let moved = self.transition(|s| s.is_active(), TokenState::Cancelled);
        if moved {
            self.finished.notify_waiters();
        }
        moved
    }

    /// `Standby -> Cancelled`. Returns false if the token already started or finished.
    ///
    /// Used when a queued task is dropped before it ever runs, since no
    /// checkpoint would observe the request.
    pub fn cancel_pending(&self) -> bool {
        let moved = self.transition(|s| s == TokenState::Standby, TokenState::Cancelled);
        if moved {
            self.finished.notify_waiters();
        }
        moved
    }

    /// Sets the progress directly, clamped to `0.0..=1.0`.
    pub fn set_progress(&self, progress: f64) {
        if self.state().is_finished() {
            return;
        }
        self.store_progress(progress.clamp(0.0, 1.0));
    }

    /// Declares how many equal steps the task consists of and resets progress.
    pub fn set_steps(&self, total: u64) {
        self.steps_total.store(total, Ordering::Release);
        self.steps_done.store(0, Ordering::Release);
        self.set_progress(0.0);
    }

    /// Marks one step done and updates progress to `done / total`.
    pub fn increment(&self) {
        let total = self.steps_total.load(Ordering::Acquire);
        let done = self.steps_done.fetch_add(1, Ordering::AcqRel) + 1;
        if total > 0 {
            self.set_progress(done as f64 / total as f64);
        }
    }

    /// Waits until the token reaches a terminal state and returns it.
    pub async fn finished(&self) -> TokenState {
        loop {
            let notified = self.finished.notified();
            let mut notified = std::pin::pin!(notified);
            // Register before checking so a concurrent transition cannot be missed.
            notified.as_mut().enable();

            let state = self.state();
            if state.is_finished() {
                return state;
            }
            notified.await;
        }
    }

    fn store_progress(&self, progress: f64) {
        self.progress.store(progress.to_bits(), Ordering::Release);
    }

    fn transition(&self, allowed: impl Fn(TokenState) -> bool, to: TokenState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if !allowed(TokenState::from_u8(current)) {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}
