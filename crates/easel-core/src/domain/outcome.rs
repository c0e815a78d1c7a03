//! Outcome of one processing attempt.
//!
//! This is the only thing that crosses from the processor layer to the
//! worker's policy step. Exceptions never do.

use super::errors::{ErrorKind, ProcessError};
use super::result::ResultDescriptor;

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Work done; asset stored.
    Success(ResultDescriptor),
    /// Failed in a way another attempt may fix. Costs one retry.
    Retryable(ProcessError),
    /// Upstream asked us to back off. Free requeue.
    RateLimited(ProcessError),
    /// Can never succeed on this worker. Fails the task immediately.
    Fatal(ProcessError),
}

impl ProcessOutcome {
    /// Classify a processor result.
    pub fn from_result(result: Result<ResultDescriptor, ProcessError>) -> Self {
        match result {
            Ok(descriptor) => ProcessOutcome::Success(descriptor),
            Err(err) if err.is_rate_limited() => ProcessOutcome::RateLimited(err),
            Err(err) if err.kind() == ErrorKind::Unsupported => ProcessOutcome::Fatal(err),
            Err(err) => ProcessOutcome::Retryable(err),
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            ProcessOutcome::Success(_) => "success",
            ProcessOutcome::Retryable(_) => "retryable",
            ProcessOutcome::RateLimited(_) => "rate_limited",
            ProcessOutcome::Fatal(_) => "fatal",
        }
    }
}
