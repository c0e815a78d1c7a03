//! Task record and the partial updates the worker writes back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{ShapeId, TaskId, WorkerId};
use super::result::TaskResult;
use super::task_kind::TaskKind;

/// Retry budget given to tasks created without an explicit one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Task lifecycle state.
///
/// Transitions:
/// - pending -> completed
/// - pending -> failed (retry budget exhausted, or task can never run)
/// - pending -> pending (requeue; a claim is only visible via `workerId`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A unit of generative work as held by the task store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub task_type: String,
    #[serde(default)]
    pub body: Value,
    pub user_id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_id: Option<ShapeId>,
    pub status: TaskStatus,
    pub worker_id: Option<WorkerId>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub result: Option<TaskResult>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// New pending, unclaimed task.
    pub fn new(
        id: TaskId,
        kind: &TaskKind,
        user_id: impl Into<String>,
        project_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            task_type: kind.task_type().to_string(),
            body: kind.to_body(),
            user_id: user_id.into(),
            project_id: project_id.into(),
            shape_id: None,
            status: TaskStatus::Pending,
            worker_id: None,
            claimed_at: None,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            result: None,
            completed_at: None,
            created_at,
        }
    }

    pub fn with_shape(mut self, shape_id: ShapeId) -> Self {
        self.shape_id = Some(shape_id);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn is_claimed(&self) -> bool {
        self.worker_id.is_some()
    }

    /// Pending and not leased by any worker.
    pub fn is_claimable(&self) -> bool {
        self.status == TaskStatus::Pending && !self.is_claimed()
    }

    /// Merge a patch into this record.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(result) = &patch.result {
            self.result = Some(result.clone());
        }
        if let Some(worker_id) = patch.worker_id {
            self.worker_id = worker_id;
        }
        if let Some(claimed_at) = patch.claimed_at {
            self.claimed_at = claimed_at;
        }
        if let Some(retry_count) = patch.retry_count {
            self.retry_count = retry_count;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = Some(completed_at);
        }
    }
}

/// Partial update of a task record.
///
/// `None` leaves a field untouched; for nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub result: Option<TaskResult>,
    pub worker_id: Option<Option<WorkerId>>,
    pub claimed_at: Option<Option<DateTime<Utc>>>,
    pub retry_count: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    /// Lease the task to `worker_id`.
    pub fn claim(worker_id: WorkerId, now: DateTime<Utc>) -> Self {
        Self {
            worker_id: Some(Some(worker_id)),
            claimed_at: Some(Some(now)),
            ..Self::default()
        }
    }

    /// Back to pending with the lease cleared.
    pub fn requeue(retry_count: u32) -> Self {
        Self {
            status: Some(TaskStatus::Pending),
            worker_id: Some(None),
            claimed_at: Some(None),
            retry_count: Some(retry_count),
            ..Self::default()
        }
    }

    pub fn completed(result: TaskResult, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(TaskStatus::Completed),
            result: Some(result),
            completed_at: Some(now),
            ..Self::default()
        }
    }

    pub fn failed(result: TaskResult, retry_count: u32, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(TaskStatus::Failed),
            result: Some(result),
            retry_count: Some(retry_count),
            completed_at: Some(now),
            ..Self::default()
        }
    }
}
