use thiserror::Error;

use crate::domain::TaskId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task store unavailable: {0}")]
    Unavailable(String),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset storage failed: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("canvas room unavailable: {0}")]
    RoomUnavailable(String),

    #[error("canvas update rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
#[error("title generation failed: {0}")]
pub struct TitleError(pub String);
