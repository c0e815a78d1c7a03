//! TitleGenerator port - best-effort short titles for generated images.

use async_trait::async_trait;

use crate::error::TitleError;

#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn generate_title(&self, prompt: &str, user_id: &str) -> Result<String, TitleError>;
}
