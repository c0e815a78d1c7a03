use super::{ProcessorContext, load_source, require, store_output};
use crate::domain::task_kind::IMAGE_REMOVE_BACKGROUND;
use crate::domain::{Dimensions, ProcessError, RemoveBackgroundBody, ResultDescriptor, Task};
use crate::ports::RemoveBackgroundRequest;

pub(super) async fn process(
    ctx: &ProcessorContext,
    task: &Task,
    body: RemoveBackgroundBody,
) -> Result<ResultDescriptor, ProcessError> {
    let source_id = require(body.source_asset_id, IMAGE_REMOVE_BACKGROUND, "sourceAssetId")?;
    let source = load_source(ctx, task, &source_id).await?;
    let asset_id = body.asset_id.unwrap_or_else(|| ctx.ids.generate_asset_id());

    ctx.limiter.acquire().await;
    let output = ctx
        .provider
        .remove_background(RemoveBackgroundRequest {
            model: body.model,
            image: source.data,
            content_type: source.content_type,
        })
        .await?;

    // cutouts keep the source size
    let fallback = Dimensions::known(body.width, body.height);
    store_output(ctx, task, asset_id, output, fallback, None).await
}
