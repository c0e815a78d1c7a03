//! Processing errors and their classification.
//!
//! Processors fail with a `ProcessError`. They never decide what the failure
//! means for the task; `ProcessOutcome::from_result` classifies it and the
//! decider turns the classification into a state transition.

use thiserror::Error;

use crate::error::AssetError;

/// Code recorded when neither the error nor its kind supplies a better one.
pub const DEFAULT_ERROR_CODE: &str = "PROCESSING_ERROR";

/// Substrings that mark an upstream rate-limit response.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate-limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
];

/// Operational classification of a processing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required body field is missing or malformed.
    Validation,
    /// A source asset could not be loaded.
    AssetNotFound,
    /// The external provider rejected or failed the call.
    Provider,
    /// Reading or writing asset storage failed.
    Storage,
    /// The task type is not handled by this worker.
    Unsupported,
    /// Anything else, including a processor that panicked.
    Unexpected,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::AssetNotFound => "ASSET_NOT_FOUND",
            ErrorKind::Provider => "PROVIDER_ERROR",
            ErrorKind::Storage => "STORAGE_ERROR",
            ErrorKind::Unsupported => "UNSUPPORTED_TASK",
            ErrorKind::Unexpected => DEFAULT_ERROR_CODE,
        }
    }
}

/// Failure raised by a task processor.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ProcessError {
    kind: ErrorKind,
    message: String,
    code: Option<String>,
    status: Option<u16>,
}

impl ProcessError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            status: None,
        }
    }

    pub fn missing_field(task_type: &str, field: &str) -> Self {
        Self::new(
            ErrorKind::Validation,
            format!("{task_type} task is missing required field `{field}`"),
        )
    }

    pub fn invalid_body(task_type: &str, err: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorKind::Validation,
            format!("{task_type} task has a malformed body: {err}"),
        )
    }

    pub fn asset_not_found(asset_id: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorKind::AssetNotFound,
            format!("source asset {asset_id} not found"),
        )
    }

    pub fn unsupported_task_type(task_type: &str) -> Self {
        Self::new(
            ErrorKind::Unsupported,
            format!("unsupported task type `{task_type}`"),
        )
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The explicit code if the error carries one, else the kind's code.
    pub fn error_code(&self) -> String {
        self.code
            .clone()
            .unwrap_or_else(|| self.kind.code().to_string())
    }

    /// Whether the failure is an upstream rate-limit signal.
    ///
    /// HTTP 429 on any kind. For provider errors only, also a message/code
    /// naming a rate limit or carrying a standalone `429` token; other kinds
    /// quote user input (asset ids, body values) in their messages.
    pub fn is_rate_limited(&self) -> bool {
        if self.status == Some(429) {
            return true;
        }
        if self.kind != ErrorKind::Provider {
            return false;
        }
        let mentions_limit = |text: &str| {
            let text = text.to_ascii_lowercase();
            RATE_LIMIT_MARKERS.iter().any(|m| text.contains(m))
                || text
                    .split(|c: char| !c.is_ascii_alphanumeric())
                    .any(|token| token == "429")
        };
        mentions_limit(&self.message) || self.code.as_deref().is_some_and(mentions_limit)
    }
}

impl From<AssetError> for ProcessError {
    fn from(err: AssetError) -> Self {
        ProcessError::new(ErrorKind::Storage, err.to_string())
    }
}
