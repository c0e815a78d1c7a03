//! Task processors: one per task kind, plus the plumbing they share.
//!
//! Processors know how to do the work and nothing about claims or retries.
//! They return `Result<ResultDescriptor, ProcessError>`; `Processors::process`
//! classifies that into a `ProcessOutcome` for the worker's policy step.
//!
//! # Flow (every kind)
//! 1. pull required fields out of the body (`require`)
//! 2. load the source asset, owner-checked (`load_source`), if the kind has one
//! 3. `RateLimiter::acquire`, immediately before the provider call
//! 4. store the output and describe it (`store_output`)

mod generate_image;
mod remove_background;
mod upscale;

use std::sync::Arc;

use tracing::debug;

use crate::app::RateLimiter;
use crate::domain::{
    AssetId, Dimensions, ProcessError, ProcessOutcome, ResultDescriptor, Task, TaskKind,
};
use crate::ports::{AssetStore, IdGenerator, ImageOutput, ImageProvider, StoredAsset, TitleGenerator};

/// Knobs the processors read from `WorkerConfig`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorSettings {
    /// Bucket that source and result assets live in.
    pub asset_bucket: String,
    /// Long edge for ratio-derived generation sizes.
    pub base_dimension: u32,
    /// Length of the prompt-derived fallback title.
    pub title_max_chars: usize,
}

/// Collaborators shared by every processor.
pub struct ProcessorContext {
    pub assets: Arc<dyn AssetStore>,
    pub provider: Arc<dyn ImageProvider>,
    pub titles: Option<Arc<dyn TitleGenerator>>,
    pub limiter: Arc<RateLimiter>,
    pub ids: Arc<dyn IdGenerator>,
    pub settings: ProcessorSettings,
}

/// Dispatches a claimed task to the processor for its kind.
pub struct Processors {
    ctx: ProcessorContext,
}

impl Processors {
    pub fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ProcessorContext {
        &self.ctx
    }

    /// Run one attempt and classify the result.
    pub async fn process(&self, task: &Task) -> ProcessOutcome {
        ProcessOutcome::from_result(self.run(task).await)
    }

    async fn run(&self, task: &Task) -> Result<ResultDescriptor, ProcessError> {
        let kind = TaskKind::decode(&task.task_type, &task.body)?;
        debug!(task_id = %task.id, task_type = kind.task_type(), "running processor");
        match kind {
            TaskKind::GenerateImage(body) => generate_image::process(&self.ctx, task, body).await,
            TaskKind::Upscale(body) => upscale::process(&self.ctx, task, body).await,
            TaskKind::RemoveBackground(body) => remove_background::process(&self.ctx, task, body).await,
        }
    }
}

/// Unwrap a required body field.
fn require<T>(value: Option<T>, task_type: &str, field: &str) -> Result<T, ProcessError> {
    value.ok_or_else(|| ProcessError::missing_field(task_type, field))
}

/// Load a source asset; a missing asset is a processing failure.
async fn load_source(ctx: &ProcessorContext, task: &Task, asset_id: &AssetId) -> Result<StoredAsset, ProcessError> {
    ctx.assets
        .load_asset(&ctx.settings.asset_bucket, asset_id, &task.user_id)
        .await?
        .ok_or_else(|| ProcessError::asset_not_found(asset_id))
}

/// Persist provider output under `asset_id` and describe it.
///
/// Dimensions reported by the provider win over `fallback`.
async fn store_output(
    ctx: &ProcessorContext,
    task: &Task,
    asset_id: AssetId,
    output: ImageOutput,
    fallback: Option<Dimensions>,
    title: Option<String>,
) -> Result<ResultDescriptor, ProcessError> {
    let dims = Dimensions::known(output.width, output.height).or(fallback);
    let file_size = output.data.len() as u64;
    let bucket = &ctx.settings.asset_bucket;

    ctx.assets
        .store_asset(bucket, &asset_id, &task.user_id, output.data, &output.content_type)
        .await?;

    Ok(ResultDescriptor {
        asset_url: ctx.assets.asset_url(bucket, &asset_id),
        asset_id,
        content_type: output.content_type,
        width: dims.map(|d| d.width),
        height: dims.map(|d| d.height),
        file_size,
        title,
    })
}
