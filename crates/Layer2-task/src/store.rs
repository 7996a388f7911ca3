//! Bounded in-memory task store
//!
//! 종료된 작업은 보존 기간이 지나면 삭제되고, 용량을 넘으면 가장 오래 전에 끝난 작업부터
//! 제거됩니다. 실행 중인 작업은 제거되지 않습니다.

use crate::state::TaskState;
use crate::task::{TaskId, TaskRecord};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Store counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Task records keyed by id
#[derive(Debug)]
pub struct TaskStore {
    tasks: HashMap<TaskId, TaskRecord>,
    capacity: usize,
    retention: Duration,
}

impl TaskStore {
    pub fn new(capacity: usize, retention: Duration) -> Self {
        Self {
            tasks: HashMap::new(),
            capacity: capacity.max(1),
            retention,
        }
    }

    /// Insert a new record, evicting finished tasks first
    pub fn insert(&mut self, record: TaskRecord) {
        self.purge_expired();

        while self.tasks.len() >= self.capacity {
            if !self.evict_oldest_finished() {
                warn!(
                    "Task store over capacity ({}), all tasks still running",
                    self.capacity
                );
                break;
            }
        }

        self.tasks.insert(record.id, record);
    }

    pub fn get(&self, id: &TaskId) -> Option<&TaskRecord> {
        self.tasks.get(id)
    }

    /// Move a running task to `next`; refused (false) for unknown or finished tasks
    pub fn transition(&mut self, id: &TaskId, next: TaskState) -> bool {
        let Some(record) = self.tasks.get_mut(id) else {
            debug!("Transition for unknown task {} ignored", id);
            return false;
        };

        if record.state.is_terminal() {
            debug!(
                "Task {} already {}, refusing transition to {}",
                id, record.state, next
            );
            return false;
        }

        if next.is_terminal() {
            record.finished_at = Some(Utc::now());
        }
        record.state = next;
        true
    }

    /// Ids of tasks still running
    pub fn running_ids(&self) -> Vec<TaskId> {
        self.tasks
            .values()
            .filter(|r| r.is_running())
            .map(|r| r.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total: self.tasks.len(),
            ..Default::default()
        };
        for record in self.tasks.values() {
            match record.state {
                TaskState::Running => stats.running += 1,
                TaskState::Completed(_) => stats.completed += 1,
                TaskState::Failed { .. } => stats.failed += 1,
            }
        }
        stats
    }

    fn purge_expired(&mut self) {
        let Ok(retention) = chrono::Duration::from_std(self.retention) else {
            return;
        };
        let cutoff = Utc::now() - retention;

        let before = self.tasks.len();
        self.tasks.retain(|_, record| match record.finished_at {
            Some(finished) => finished > cutoff,
            None => true,
        });

        let purged = before - self.tasks.len();
        if purged > 0 {
            debug!("Purged {} expired task(s)", purged);
        }
    }

    fn evict_oldest_finished(&mut self) -> bool {
        let oldest = self
            .tasks
            .values()
            .filter_map(|r| r.finished_at.map(|at| (at, r.id)))
            .min_by_key(|(at, _)| *at)
            .map(|(_, id)| id);

        match oldest {
            Some(id) => {
                self.tasks.remove(&id);
                debug!("Evicted finished task {}", id);
                true
            }
            None => false,
        }
    }
}
