//! InMemoryTaskStore - development task store.
//!
//! Tasks are kept in insertion order; `claim_tasks` hands out the oldest
//! claimable ones first. A single mutex makes claim atomic, which is the
//! exclusivity guarantee real stores provide with a conditional update.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use parking_lot::Mutex;
use tracing::info;

use crate::domain::{Task, TaskId, TaskPatch, TaskStatus, WorkerId};
use crate::error::StoreError;
use crate::observability::TaskCounts;
use crate::ports::{Clock, SystemClock, TaskStore};

pub struct InMemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store whose claim timestamps come from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            clock,
        }
    }

    pub fn insert(&self, task: Task) {
        self.tasks.lock().push(task);
    }

    /// Snapshot of every record, oldest first.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    pub fn counts(&self) -> TaskCounts {
        TaskCounts::from_tasks(self.tasks.lock().iter())
    }

    /// Release the leases of tasks claimed more than `older_than` ago.
    ///
    /// A worker that crashed mid-task leaves its tasks pending with
    /// `workerId` set; nobody else will claim them until they are released.
    /// `retryCount` is left alone. Returns how many tasks were released.
    pub fn reap_stale_claims(&self, older_than: TimeDelta) -> usize {
        let cutoff = self.clock.now() - older_than;
        let mut tasks = self.tasks.lock();
        let mut reaped = 0;
        for task in tasks.iter_mut() {
            let stale = task.status == TaskStatus::Pending
                && task.claimed_at.is_some_and(|claimed_at| claimed_at < cutoff);
            if stale {
                info!(task_id = %task.id, worker_id = ?task.worker_id, "releasing stale claim");
                task.apply(&TaskPatch::requeue(task.retry_count));
                reaped += 1;
            }
        }
        reaped
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn claim_tasks(&self, worker_id: WorkerId, max_count: usize) -> Result<Vec<Task>, StoreError> {
        let patch = TaskPatch::claim(worker_id, self.clock.now());
        let mut tasks = self.tasks.lock();
        let claimed = tasks
            .iter_mut()
            .filter(|task| task.is_claimable())
            .take(max_count)
            .map(|task| {
                task.apply(&patch);
                task.clone()
            })
            .collect();
        Ok(claimed)
    }

    async fn update_task(&self, task_id: TaskId, patch: TaskPatch) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or(StoreError::NotFound(task_id))?;
        task.apply(&patch);
        Ok(())
    }

    async fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.lock().iter().find(|task| task.id == task_id).cloned())
    }
}
