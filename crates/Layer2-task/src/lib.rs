//! # relay-task
//!
//! Invocation and task execution for relay.
//! Runs target CLIs through the file-based protocol, in the foreground or as tracked
//! background tasks, and fans one prompt out to many targets.
//!
//! ## Features
//!
//! - File-based invocation (temp input/output files, allow-listed args, session flags)
//! - Background task engine with bounded workers and pollable status
//! - Cooperative cancellation on stop / cancel, separate from timeouts
//! - Concurrent multi-target fan-out with per-target outcomes
//! - Installation / version probing

pub mod fanout;
pub mod invocation;
pub mod manager;
pub mod probe;
pub mod state;
pub mod store;
pub mod task;

// Invocation
pub use invocation::{
    build_launch_args, render_input, session_args, validate_args, ErrorKind, FileInvoker,
    InvocationError, InvocationRequest, InvocationResult, Invoker, SessionDirective, TempPair,
    SKIP_GIT_REPO_CHECK_FLAG,
};

// Task engine
pub use manager::{EngineError, TaskEngine, TaskEngineConfig};
pub use state::TaskState;
pub use store::{StoreStats, TaskStore};
pub use task::{TaskId, TaskRecord, TaskStatus, TaskView};

// Fan-out
pub use fanout::{fan_out, FanOutRequest, FanOutResult, TargetOutcome};

// Probe
pub use probe::{get_version, is_installed, probe_targets, TargetInfo};

pub use tokio_util::sync::CancellationToken;
