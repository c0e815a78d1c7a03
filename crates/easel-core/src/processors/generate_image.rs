use tracing::warn;

use super::{ProcessorContext, require, store_output};
use crate::domain::task_kind::GENERATE_IMAGE;
use crate::domain::{Dimensions, GenerateImageBody, ProcessError, ResultDescriptor, Task};
use crate::ports::GenerateRequest;

pub(super) async fn process(
    ctx: &ProcessorContext,
    task: &Task,
    body: GenerateImageBody,
) -> Result<ResultDescriptor, ProcessError> {
    let model = require(body.model, GENERATE_IMAGE, "model")?;
    let prompt = require(body.prompt, GENERATE_IMAGE, "prompt")?;
    let dims = Dimensions::resolve(
        body.width,
        body.height,
        body.aspect_ratio.as_deref(),
        ctx.settings.base_dimension,
    );
    let asset_id = body.asset_id.unwrap_or_else(|| ctx.ids.generate_asset_id());
    let title = title_for(ctx, task, &prompt).await;

    ctx.limiter.acquire().await;
    let output = ctx
        .provider
        .generate_image(GenerateRequest {
            model,
            prompt,
            width: dims.width,
            height: dims.height,
            params: body.params,
        })
        .await?;

    store_output(ctx, task, asset_id, output, Some(dims), Some(title)).await
}

/// Generated title, or the truncated prompt if the generator is missing or fails.
async fn title_for(ctx: &ProcessorContext, task: &Task, prompt: &str) -> String {
    let fallback = || fallback_title(prompt, ctx.settings.title_max_chars);
    let Some(titles) = &ctx.titles else {
        return fallback();
    };
    match titles.generate_title(prompt, &task.user_id).await {
        Ok(title) if !title.trim().is_empty() => title.trim().to_string(),
        Ok(_) => fallback(),
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "title generation failed; using prompt");
            fallback()
        }
    }
}

pub(crate) fn fallback_title(prompt: &str, max_chars: usize) -> String {
    let prompt = prompt.trim();
    if prompt.chars().count() <= max_chars {
        return prompt.to_string();
    }
    let cut: String = prompt.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
