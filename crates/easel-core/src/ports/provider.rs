//! ImageProvider port - the external generative model API.
//!
//! Every call through this trait counts against the provider's rate budget,
//! so processors acquire the shared `RateLimiter` right before calling it.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{ErrorKind, ProcessError};

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleRequest {
    pub model: Option<String>,
    pub image: Vec<u8>,
    pub content_type: String,
    pub factor: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveBackgroundRequest {
    pub model: Option<String>,
    pub image: Vec<u8>,
    pub content_type: String,
}

/// Raw provider output. Dimensions are reported when the provider knows them.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOutput {
    pub data: Vec<u8>,
    pub content_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Provider failure; `status` carries the upstream HTTP status when there is one.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            ..Self::new(message)
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl From<ProviderError> for ProcessError {
    fn from(err: ProviderError) -> Self {
        let mut converted = ProcessError::new(ErrorKind::Provider, err.message);
        if let Some(status) = err.status {
            converted = converted.with_status(status);
        }
        if let Some(code) = err.code {
            converted = converted.with_code(code);
        }
        converted
    }
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate_image(&self, request: GenerateRequest) -> Result<ImageOutput, ProviderError>;

    async fn upscale(&self, request: UpscaleRequest) -> Result<ImageOutput, ProviderError>;

    async fn remove_background(&self, request: RemoveBackgroundRequest) -> Result<ImageOutput, ProviderError>;
}
