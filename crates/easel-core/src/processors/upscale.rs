use tracing::debug;

use super::{ProcessorContext, load_source, require, store_output};
use crate::domain::dimensions::DEFAULT_UPSCALE_FACTOR;
use crate::domain::task_kind::IMAGE_UPSCALE;
use crate::domain::{Dimensions, ProcessError, ResultDescriptor, Task, UpscaleBody, coerce_upscale_factor};
use crate::ports::UpscaleRequest;

pub(super) async fn process(
    ctx: &ProcessorContext,
    task: &Task,
    body: UpscaleBody,
) -> Result<ResultDescriptor, ProcessError> {
    let source_id = require(body.source_asset_id, IMAGE_UPSCALE, "sourceAssetId")?;
    let requested = body.factor.unwrap_or(DEFAULT_UPSCALE_FACTOR);
    let factor = coerce_upscale_factor(requested);
    if factor != requested {
        debug!(task_id = %task.id, requested, factor, "upscale factor snapped to supported value");
    }

    let source = load_source(ctx, task, &source_id).await?;
    let asset_id = body.asset_id.unwrap_or_else(|| ctx.ids.generate_asset_id());

    ctx.limiter.acquire().await;
    let output = ctx
        .provider
        .upscale(UpscaleRequest {
            model: body.model,
            image: source.data,
            content_type: source.content_type,
            factor,
        })
        .await?;

    let fallback = Dimensions::known(body.width, body.height).map(|d| d.scaled(factor));
    store_output(ctx, task, asset_id, output, fallback, None).await
}
