//! Task lifecycle as seen by the two workers.

use serde::{Deserialize, Serialize};

/// Task state.
///
/// State transitions:
/// - EnqueuedPrimary -> ProcessingPrimary -> Completed
/// - EnqueuedPrimary -> ProcessingPrimary -> RoutedRecovery -> ProcessingRecovery -> Recorded
/// - ... -> ProcessingRecovery -> Abandoned (retry limit reached)
/// - ... -> ProcessingRecovery -> RoutedRecovery (requeue mode only)
///
/// Transitions are driven by worker pops only. A popped task is owned by the
/// worker until its handling branch finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    EnqueuedPrimary,
    ProcessingPrimary,
    Completed,
    RoutedRecovery,
    ProcessingRecovery,
    Recorded,
    Abandoned,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Recorded | TaskState::Abandoned
        )
    }

    /// Is the task sitting in a queue waiting for a pop?
    pub fn is_queued(self) -> bool {
        matches!(self, TaskState::EnqueuedPrimary | TaskState::RoutedRecovery)
    }
}
