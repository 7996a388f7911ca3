//! Task Engine - runs invocations in the background and tracks their status
//!
//! Features:
//! - Explicit start/stop lifecycle (stop cancels in-flight work)
//! - Bounded worker concurrency via a semaphore
//! - Non-blocking submit and status polling
//! - Deadline-bounded waiting without busy polling
//! - Panics inside work are captured as task failures

use crate::invocation::{InvocationError, InvocationRequest, InvocationResult, Invoker};
use crate::state::TaskState;
use crate::store::{StoreStats, TaskStore};
use crate::task::{TaskId, TaskRecord, TaskView};
use futures::FutureExt;
use parking_lot::Mutex;
use relay_foundation::EngineSettings;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Configuration for the task engine
#[derive(Debug, Clone)]
pub struct TaskEngineConfig {
    /// Maximum tasks executing at once
    pub max_workers: usize,

    /// Maximum records kept in the task store
    pub store_capacity: usize,

    /// How long finished tasks stay queryable
    pub retention: Duration,
}

impl Default for TaskEngineConfig {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for TaskEngineConfig {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            max_workers: settings.max_workers.max(1),
            store_capacity: settings.store_capacity,
            retention: Duration::from_secs(settings.retention_secs),
        }
    }
}

/// Engine-level failures (distinct from task failures)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Task engine is not running")]
    NotRunning,

    #[error("Task engine needs a tokio runtime to start")]
    NoRuntime,

    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Timed out waiting for task {0}")]
    DeadlineExceeded(TaskId),
}

struct Lifecycle {
    running: bool,
    shutdown: CancellationToken,
    handle: Option<Handle>,
}

struct Inner {
    config: TaskEngineConfig,
    store: Mutex<TaskStore>,
    tokens: Mutex<HashMap<TaskId, CancellationToken>>,
    lifecycle: Mutex<Lifecycle>,
    permits: Arc<Semaphore>,
    settled: Notify,
}

impl Inner {
    /// Apply a terminal state once; later attempts are refused
    fn settle(&self, id: TaskId, next: TaskState) -> bool {
        let label = next.display_name();
        let applied = self.store.lock().transition(&id, next);
        self.tokens.lock().remove(&id);

        if applied {
            info!("Task {} {}", id, label);
        } else {
            debug!("Task {} already settled, dropping late {} result", id, label);
        }
        self.settled.notify_waiters();
        applied
    }
}

/// Task Engine - background execution with pollable status
#[derive(Clone)]
pub struct TaskEngine {
    inner: Arc<Inner>,
}

impl TaskEngine {
    /// Create a stopped engine
    pub fn new(config: TaskEngineConfig) -> Self {
        let store = TaskStore::new(config.store_capacity, config.retention);
        let permits = Arc::new(Semaphore::new(config.max_workers.max(1)));

        Self {
            inner: Arc::new(Inner {
                config,
                store: Mutex::new(store),
                tokens: Mutex::new(HashMap::new()),
                lifecycle: Mutex::new(Lifecycle {
                    running: false,
                    shutdown: CancellationToken::new(),
                    handle: None,
                }),
                permits,
                settled: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &TaskEngineConfig {
        &self.inner.config
    }

    /// Worker slots shared by engine tasks and fan-out branches
    pub fn worker_permits(&self) -> Arc<Semaphore> {
        Arc::clone(&self.inner.permits)
    }

    /// Start accepting work on the current tokio runtime
    pub fn start(&self) -> Result<(), EngineError> {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.running {
            return Ok(());
        }

        let handle = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        lifecycle.handle = Some(handle);
        lifecycle.shutdown = CancellationToken::new();
        lifecycle.running = true;

        info!(
            "Task engine started (max_workers: {})",
            self.inner.config.max_workers
        );
        Ok(())
    }

    /// Stop accepting work and cancel everything in flight
    pub fn stop(&self) {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if !lifecycle.running {
                return;
            }
            lifecycle.running = false;
            lifecycle.shutdown.cancel();
            lifecycle.handle = None;
        }

        let running = self.inner.store.lock().running_ids();
        for id in &running {
            self.inner.settle(
                *id,
                TaskState::failed(&InvocationError::Cancelled(
                    "Task engine stopped".to_string(),
                )),
            );
        }

        info!("Task engine stopped ({} task(s) cancelled)", running.len());
    }

    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.lock().running
    }

    /// Submit async work
    pub fn submit<F>(&self, label: impl Into<String>, work: F) -> Result<TaskId, EngineError>
    where
        F: Future<Output = InvocationResult> + Send + 'static,
    {
        self.spawn_tracked(label.into(), move |_| work)
    }

    /// Submit a blocking closure, run on the blocking pool
    pub fn submit_blocking<F>(
        &self,
        label: impl Into<String>,
        work: F,
    ) -> Result<TaskId, EngineError>
    where
        F: FnOnce() -> InvocationResult + Send + 'static,
    {
        self.spawn_tracked(label.into(), move |_| async move {
            match tokio::task::spawn_blocking(work).await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(InvocationError::from_panic(e.into_panic())),
                Err(_) => Err(InvocationError::Cancelled(
                    "Blocking work was cancelled".to_string(),
                )),
            }
        })
    }

    /// Submit one invocation; the task's cancellation token is passed to the invoker
    pub fn submit_invocation(
        &self,
        invoker: Arc<dyn Invoker>,
        request: InvocationRequest,
    ) -> Result<TaskId, EngineError> {
        let label = request.target.clone();
        self.spawn_tracked(label, move |token| async move {
            invoker.invoke(&request, &token).await
        })
    }

    fn spawn_tracked<B, F>(&self, label: String, build: B) -> Result<TaskId, EngineError>
    where
        B: FnOnce(CancellationToken) -> F,
        F: Future<Output = InvocationResult> + Send + 'static,
    {
        let (handle, shutdown) = {
            let lifecycle = self.inner.lifecycle.lock();
            if !lifecycle.running {
                return Err(EngineError::NotRunning);
            }
            let handle = lifecycle.handle.clone().ok_or(EngineError::NoRuntime)?;
            (handle, lifecycle.shutdown.clone())
        };

        let record = TaskRecord::new(label.clone());
        let id = record.id;
        let token = shutdown.child_token();

        self.inner.store.lock().insert(record);
        self.inner.tokens.lock().insert(id, token.clone());
        debug!("Task {} submitted ({})", id, label);

        let work = build(token.clone());
        let inner = Arc::clone(&self.inner);

        handle.spawn(async move {
            let outcome = run_guarded(&inner.permits, &token, work).await;
            let next = match outcome {
                Ok(output) => TaskState::Completed(output),
                Err(e) => {
                    warn!("Task {} ({}) failed: {}", id, label, e);
                    TaskState::failed(&e)
                }
            };
            inner.settle(id, next);
        });

        Ok(id)
    }

    /// Current snapshot of a task
    pub fn status(&self, id: TaskId) -> Result<TaskView, EngineError> {
        self.inner
            .store
            .lock()
            .get(&id)
            .map(TaskRecord::view)
            .ok_or(EngineError::NotFound(id))
    }

    /// Wait until the task settles or `deadline` elapses
    pub async fn await_completion(
        &self,
        id: TaskId,
        deadline: Duration,
    ) -> Result<TaskView, EngineError> {
        let wait = async {
            loop {
                let notified = self.inner.settled.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                match self.status(id) {
                    Ok(view) if view.is_terminal() => return Ok(view),
                    Ok(_) => {}
                    Err(e) => return Err(e),
                }
                notified.await;
            }
        };

        tokio::time::timeout(deadline, wait)
            .await
            .map_err(|_| EngineError::DeadlineExceeded(id))?
    }

    /// Cancel one running task; `Ok(false)` when it had already finished
    pub fn cancel(&self, id: TaskId) -> Result<bool, EngineError> {
        let view = self.status(id)?;
        if view.is_terminal() {
            return Ok(false);
        }

        if let Some(token) = self.inner.tokens.lock().get(&id) {
            token.cancel();
        }
        Ok(self.inner.settle(
            id,
            TaskState::failed(&InvocationError::Cancelled(format!(
                "Task {} was cancelled",
                id
            ))),
        ))
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.store.lock().stats()
    }
}

impl Default for TaskEngine {
    fn default() -> Self {
        Self::new(TaskEngineConfig::default())
    }
}

/// Acquire a worker permit, then run `work` with panic capture and cancellation
async fn run_guarded<F>(
    permits: &Arc<Semaphore>,
    token: &CancellationToken,
    work: F,
) -> InvocationResult
where
    F: Future<Output = InvocationResult> + Send,
{
    let permit = tokio::select! {
        permit = Arc::clone(permits).acquire_owned() => permit.ok(),
        _ = token.cancelled() => None,
    };
    let Some(_permit) = permit else {
        return Err(InvocationError::Cancelled(
            "Task cancelled before it started".to_string(),
        ));
    };

    let guarded = AssertUnwindSafe(work).catch_unwind();
    tokio::select! {
        result = guarded => result.unwrap_or_else(|payload| Err(InvocationError::from_panic(payload))),
        _ = token.cancelled() => Err(InvocationError::Cancelled("Task cancelled".to_string())),
    }
}
