//! Task definition and types

use crate::invocation::ErrorKind;
use crate::state::TaskState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the textual form returned to callers
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse status reported to pollers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

/// A tracked unit of work
#[derive(Debug, Clone)]
pub struct TaskRecord {
    /// Unique task identifier
    pub id: TaskId,

    /// Short description for logs (e.g. target name)
    pub label: String,

    /// Current state
    pub state: TaskState,

    /// When the task was submitted
    pub created_at: DateTime<Utc>,

    /// When the task reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Create a running task record
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            label: label.into(),
            state: TaskState::Running,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Snapshot for callers
    pub fn view(&self) -> TaskView {
        let (status, result, error, error_kind) = match &self.state {
            TaskState::Running => (TaskStatus::Running, None, None, None),
            TaskState::Completed(output) => {
                (TaskStatus::Completed, Some(output.clone()), None, None)
            }
            TaskState::Failed { kind, message } => {
                (TaskStatus::Failed, None, Some(message.clone()), Some(*kind))
            }
        };

        TaskView {
            task_id: self.id,
            status,
            result,
            error,
            error_kind,
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}

/// Read-only snapshot of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskView {
    pub fn is_terminal(&self) -> bool {
        self.status != TaskStatus::Running
    }
}
