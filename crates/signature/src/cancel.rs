//! Run-scoped cancellation shared by the producer and every worker.
//!
//! The token is monotonic: once cancelled it stays cancelled for the rest of
//! the run. Only the caller that flips the flag may record a cause, so the
//! first failure wins and later ones are dropped.
//!
//! Cancelling also closes a private channel. Every thread blocked in
//! [`CancelToken::recv`] selects on that channel, so it wakes at once.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select};

/// Upper bound between re-checks of the token while blocked.
///
/// Cancellation also wakes every waiter through its closed channel, so this
/// only matters if that wakeup is missed.
pub const WAKE_INTERVAL: Duration = Duration::from_millis(100);

/// Boxed cause recorded by a failing worker.
pub type WorkerCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pipeline stage that observed a failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// The orchestrator thread reading the input and queueing jobs.
    Producer,
    /// A hasher worker.
    Hasher,
    /// The single result writer worker.
    ResultWriter,
}

impl Stage {
    /// Returns a short lowercase label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Hasher => "hasher",
            Self::ResultWriter => "result writer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First failure recorded during a run.
#[derive(Debug)]
pub struct Failure {
    stage: Stage,
    cause: WorkerCause,
}

impl Failure {
    pub(crate) fn new(stage: Stage, cause: WorkerCause) -> Self {
        Self { stage, cause }
    }

    /// Stage that recorded the failure.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Borrows the recorded cause.
    #[must_use]
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// Consumes the failure and returns its cause.
    #[must_use]
    pub fn into_cause(self) -> WorkerCause {
        self.cause
    }
}

/// Cooperative cancellation flag with a one-shot failure slot.
#[derive(Debug)]
pub struct CancelToken {
    cancelled: AtomicBool,
    first_failure: OnceLock<Failure>,
    // Never sends; dropped on cancellation to disconnect `closed`.
    trigger: Mutex<Option<Sender<()>>>,
    closed: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        let (trigger, closed) = crossbeam_channel::bounded(0);
        Self {
            cancelled: AtomicBool::new(false),
            first_failure: OnceLock::new(),
            trigger: Mutex::new(Some(trigger)),
            closed,
        }
    }
}

impl CancelToken {
    /// Creates a token in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether the run has been cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancels the run without recording a cause.
    ///
    /// Returns `true` when this call performed the transition.
    pub fn cancel(&self) -> bool {
        let won = self
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            drop(
                self.trigger
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take(),
            );
        }
        won
    }

    /// Receives from `source`, blocking until a message arrives.
    ///
    /// Returns `None` once the token is cancelled or when `source` is
    /// disconnected and drained.
    pub fn recv<T>(&self, source: &Receiver<T>) -> Option<T> {
        loop {
            if self.is_cancelled() {
                return None;
            }
            select! {
                recv(source) -> message => return message.ok(),
                recv(self.closed) -> _ => return None,
                default(WAKE_INTERVAL) => {}
            }
        }
    }

    /// Cancels the run and records `cause` if no earlier caller did.
    ///
    /// Returns `true` when the cause was recorded.
    pub fn fail(&self, stage: Stage, cause: impl Into<WorkerCause>) -> bool {
        if !self.cancel() {
            return false;
        }
        self.first_failure
            .set(Failure::new(stage, cause.into()))
            .is_ok()
    }

    /// Borrows the recorded failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        self.first_failure.get()
    }

    /// Removes and returns the recorded failure.
    pub fn take_failure(&mut self) -> Option<Failure> {
        self.first_failure.take()
    }
}
