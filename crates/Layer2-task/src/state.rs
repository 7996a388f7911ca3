//! Task state machine

use crate::invocation::{ErrorKind, InvocationError};
use serde::{Deserialize, Serialize};

/// Possible states of a task
///
/// `Running` → `Completed` | `Failed`. 종료 상태에서는 더 이상 전이하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Task is currently running
    Running,

    /// Task completed successfully
    Completed(String),

    /// Task failed with an error
    Failed { kind: ErrorKind, message: String },
}

impl TaskState {
    /// Failed state from an invocation error
    pub fn failed(err: &InvocationError) -> Self {
        TaskState::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        !self.is_running()
    }

    /// Check if task is currently running
    pub fn is_running(&self) -> bool {
        matches!(self, TaskState::Running)
    }

    /// Check if task completed successfully
    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Completed(_))
    }

    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskState::Running => "running",
            TaskState::Completed(_) => "completed",
            TaskState::Failed { .. } => "failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
