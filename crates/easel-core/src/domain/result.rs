//! Result payloads written to a task when it reaches a terminal state.

use serde::{Deserialize, Serialize};

use super::errors::ProcessError;
use super::ids::AssetId;

/// What a processor produced: the stored asset and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDescriptor {
    pub asset_id: AssetId,
    pub asset_url: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Result of a completed task: the descriptor plus wall-clock seconds
/// from dispatch to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedResult {
    #[serde(flatten)]
    pub asset: ResultDescriptor,
    pub processing_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Total attempts made, including the one that just failed.
    pub attempts: u32,
    pub last_error: String,
}

/// Result of a task that exhausted its retry budget (or can never run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedResult {
    pub error: String,
    pub error_code: String,
    pub error_details: ErrorDetails,
}

impl FailedResult {
    pub fn from_error(err: &ProcessError, attempts: u32) -> Self {
        Self {
            error: err.message().to_string(),
            error_code: err.error_code(),
            error_details: ErrorDetails {
                attempts,
                last_error: err.to_string(),
            },
        }
    }
}

/// Terminal task result as stored on the task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskResult {
    Completed(CompletedResult),
    Failed(FailedResult),
}

impl TaskResult {
    pub fn as_completed(&self) -> Option<&CompletedResult> {
        match self {
            TaskResult::Completed(result) => Some(result),
            TaskResult::Failed(_) => None,
        }
    }

    pub fn as_failed(&self) -> Option<&FailedResult> {
        match self {
            TaskResult::Failed(result) => Some(result),
            TaskResult::Completed(_) => None,
        }
    }
}
