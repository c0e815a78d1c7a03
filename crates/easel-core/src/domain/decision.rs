//! Decision model: what happens to a task after one processing attempt.
//!
//! The decider is a pure function of the task record and the attempt's
//! outcome. Executing the decision (writing the patch, projecting onto the
//! canvas) is the worker loop's job.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::outcome::ProcessOutcome;
use super::result::{CompletedResult, FailedResult, TaskResult};
use super::task::{Task, TaskPatch};

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Mark completed with this result.
    Complete(CompletedResult),

    /// Return to pending for another claim.
    ///
    /// `charged` is false for rate-limit requeues, which leave
    /// `retry_count` unchanged.
    Requeue {
        retry_count: u32,
        charged: bool,
        reason: String,
    },

    /// Mark failed with a structured diagnostic.
    Fail(FailedResult),
}

impl Decision {
    pub fn into_patch(self, now: DateTime<Utc>) -> TaskPatch {
        match self {
            Decision::Complete(result) => TaskPatch::completed(TaskResult::Completed(result), now),
            Decision::Requeue { retry_count, .. } => TaskPatch::requeue(retry_count),
            Decision::Fail(result) => {
                let retry_count = result.error_details.attempts.saturating_sub(1);
                TaskPatch::failed(TaskResult::Failed(result), retry_count, now)
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Complete(_) => "complete",
            Decision::Requeue { charged: true, .. } => "retry",
            Decision::Requeue { charged: false, .. } => "requeue_free",
            Decision::Fail(_) => "fail",
        }
    }
}

/// Decides the next state of a task from the outcome of an attempt.
pub trait Decider: Send + Sync {
    /// * `task` - the record as claimed (pre-attempt `retry_count`)
    /// * `outcome` - classified attempt result
    /// * `elapsed` - wall-clock time from dispatch to settle
    fn decide(&self, task: &Task, outcome: ProcessOutcome, elapsed: Duration) -> Decision;
}

/// Retry-budget policy.
///
/// - success: complete, recording processing time
/// - rate limited: requeue, `retry_count` unchanged
/// - retryable with budget left (`retry_count < max_retries`): requeue, `retry_count + 1`
/// - retryable with no budget left, or fatal: fail with `attempts = retry_count + 1`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDecider;

impl Decider for DefaultDecider {
    fn decide(&self, task: &Task, outcome: ProcessOutcome, elapsed: Duration) -> Decision {
        match outcome {
            ProcessOutcome::Success(asset) => Decision::Complete(CompletedResult {
                asset,
                processing_time: elapsed.as_secs_f64(),
            }),
            ProcessOutcome::RateLimited(err) => Decision::Requeue {
                retry_count: task.retry_count,
                charged: false,
                reason: err.to_string(),
            },
            ProcessOutcome::Retryable(err) if task.retry_count < task.max_retries => {
                Decision::Requeue {
                    retry_count: task.retry_count + 1,
                    charged: true,
                    reason: err.to_string(),
                }
            }
            ProcessOutcome::Retryable(err) | ProcessOutcome::Fatal(err) => {
                Decision::Fail(FailedResult::from_error(&err, task.retry_count + 1))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{ErrorKind, ProcessError};
    use crate::domain::ids::{AssetId, TaskId, WorkerId};
    use crate::domain::result::ResultDescriptor;
    use crate::domain::task::TaskStatus;
    use crate::domain::task_kind::{GenerateImageBody, TaskKind};
    use chrono::TimeZone;
    use rstest::rstest;
    use ulid::Ulid;

    fn claimed_task(retry_count: u32, max_retries: u32) -> Task {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut task = Task::new(
            TaskId::from_ulid(Ulid::new()),
            &TaskKind::GenerateImage(GenerateImageBody::default()),
            "user-1",
            "project-1",
            now,
        )
        .with_max_retries(max_retries);
        task.retry_count = retry_count;
        task.apply(&TaskPatch::claim(WorkerId::from_ulid(Ulid::new()), now));
        task
    }

    fn provider_error() -> ProcessError {
        ProcessError::new(ErrorKind::Provider, "model crashed")
    }

    fn apply(task: &Task, decision: Decision) -> Task {
        let mut next = task.clone();
        next.apply(&decision.into_patch(Utc::now()));
        next
    }

    #[rstest]
    #[case(0, 3)]
    #[case(1, 3)]
    #[case(2, 3)]
    #[case(0, 1)]
    fn retryable_failure_with_budget_increments_retry_count(#[case] retry_count: u32, #[case] max: u32) {
        let task = claimed_task(retry_count, max);
        let decision = DefaultDecider.decide(&task, ProcessOutcome::Retryable(provider_error()), Duration::ZERO);
        let next = apply(&task, decision);

        assert_eq!(next.status, TaskStatus::Pending);
        assert_eq!(next.retry_count, retry_count + 1);
        assert_eq!(next.worker_id, None);
        assert_eq!(next.claimed_at, None);
        assert!(next.result.is_none());
    }

    #[rstest]
    #[case(0, 3)]
    #[case(3, 3)]
    #[case(7, 10)]
    fn rate_limited_failure_is_free(#[case] retry_count: u32, #[case] max: u32) {
        let task = claimed_task(retry_count, max);
        let err = ProcessError::new(ErrorKind::Provider, "slow down").with_status(429);
        let decision = DefaultDecider.decide(&task, ProcessOutcome::RateLimited(err), Duration::ZERO);
        assert_eq!(decision.label(), "requeue_free");

        let next = apply(&task, decision);
        assert_eq!(next.status, TaskStatus::Pending);
        assert_eq!(next.retry_count, retry_count);
        assert_eq!(next.worker_id, None);
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    fn exhausted_budget_fails_with_attempt_count(#[case] max: u32) {
        let task = claimed_task(max, max);
        let decision = DefaultDecider.decide(&task, ProcessOutcome::Retryable(provider_error()), Duration::ZERO);
        let next = apply(&task, decision);

        assert_eq!(next.status, TaskStatus::Failed);
        assert!(next.completed_at.is_some());
        let failed = next.result.as_ref().and_then(TaskResult::as_failed).unwrap();
        assert_eq!(failed.error_details.attempts, max + 1);
        assert_eq!(failed.error_details.last_error, "model crashed");
        assert_eq!(failed.error_code, "PROVIDER_ERROR");
        // retry_count never passes max_retries
        assert_eq!(next.retry_count, max);
    }

    #[test]
    fn fatal_fails_immediately_even_with_budget_left() {
        let task = claimed_task(0, 3);
        let err = ProcessError::unsupported_task_type("generate_video");
        let next = apply(&task, DefaultDecider.decide(&task, ProcessOutcome::Fatal(err), Duration::ZERO));

        assert_eq!(next.status, TaskStatus::Failed);
        let failed = next.result.as_ref().and_then(TaskResult::as_failed).unwrap();
        assert_eq!(failed.error_details.attempts, 1);
        assert_eq!(failed.error_code, "UNSUPPORTED_TASK");
    }

    #[test]
    fn success_records_processing_time() {
        let task = claimed_task(1, 3);
        let descriptor = ResultDescriptor {
            asset_id: AssetId::new("asset:1"),
            asset_url: "memory://canvas/asset:1".to_string(),
            content_type: "image/png".to_string(),
            width: Some(1024),
            height: Some(1024),
            file_size: 10,
            title: None,
        };
        let decision = DefaultDecider.decide(
            &task,
            ProcessOutcome::Success(descriptor.clone()),
            Duration::from_millis(2500),
        );
        let next = apply(&task, decision);

        assert_eq!(next.status, TaskStatus::Completed);
        assert!(next.completed_at.is_some());
        let completed = next.result.as_ref().and_then(TaskResult::as_completed).unwrap();
        assert_eq!(completed.asset, descriptor);
        assert_eq!(completed.processing_time, 2.5);
    }
}
