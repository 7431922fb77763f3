//! Task lifecycle and cooperative cancellation.

use crate::error::{AeroResult, SolveFailure};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of a task: `Pending → Running → {Cancelled, Finished}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Cancelled,
    Finished,
}

impl TaskStatus {
    fn to_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Cancelled => 2,
            Self::Finished => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Cancelled,
            _ => Self::Finished,
        }
    }

    /// Whether no further transition can happen.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Finished)
    }
}

/// Status shared between a task and its controllers.
#[derive(Debug, Clone)]
pub struct SharedStatus(Arc<AtomicU8>);

impl SharedStatus {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(TaskStatus::Pending.to_u8())))
    }

    #[must_use]
    pub fn get(&self) -> TaskStatus {
        TaskStatus::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Moves from `from` to `to`; returns whether the transition happened.
    pub fn transition(&self, from: TaskStatus, to: TaskStatus) -> bool {
        self.0
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Moves to `to` unless the status is already terminal.
    pub fn finish(&self, to: TaskStatus) -> TaskStatus {
        let mut current = self.get();
        while !current.is_terminal() {
            if self.transition(current, to) {
                return to;
            }
            current = self.get();
        }
        current
    }
}

impl Default for SharedStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation flag, polled at loop boundaries.
///
/// Setting it is idempotent and never interrupts parallel work in flight.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Polling point: the cancellation marker once the flag is set.
    ///
    /// # Errors
    ///
    /// [`SolveFailure::Cancelled`] after [`Self::cancel`].
    pub fn check(&self) -> AeroResult<()> {
        if self.is_cancelled() {
            Err(SolveFailure::Cancelled.into())
        } else {
            Ok(())
        }
    }
}
