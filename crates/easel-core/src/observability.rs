//! Logging setup and task-state views.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::domain::{Task, TaskStatus};

/// Install a fmt subscriber filtered by `RUST_LOG`, or by `default_filter`
/// when `RUST_LOG` is unset or unparsable.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("global tracing subscriber already set");
    }
}

/// Number of tasks per state. `claimed` tasks are pending with a lease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskCounts {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            match task.status {
                TaskStatus::Pending if task.is_claimed() => counts.claimed += 1,
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.pending + self.claimed + self.completed + self.failed
    }

    /// Nothing left to do: no pending or claimed tasks.
    pub fn is_settled(&self) -> bool {
        self.pending == 0 && self.claimed == 0
    }
}
