//! TaskStore port - the durable queue that owns task records.
//!
//! Claim exclusivity across worker instances is the store's responsibility;
//! the worker only ever asks for as many tasks as it has free slots.

use async_trait::async_trait;

use crate::domain::{Task, TaskId, TaskPatch, WorkerId};
use crate::error::StoreError;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Atomically lease up to `max_count` pending, unclaimed tasks to
    /// `worker_id` (sets `workerId` and `claimedAt`) and return them.
    async fn claim_tasks(&self, worker_id: WorkerId, max_count: usize) -> Result<Vec<Task>, StoreError>;

    /// Merge `patch` into the task record.
    async fn update_task(&self, task_id: TaskId, patch: TaskPatch) -> Result<(), StoreError>;

    async fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, StoreError>;
}
