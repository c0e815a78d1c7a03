//! Demo collaborators: a fake provider, a fake title model and a seeded
//! in-memory world for the worker to chew through.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use easel_core::domain::{
    AssetId, CanvasId, GenerateImageBody, RemoveBackgroundBody, ShapeId, Task, TaskKind, UpscaleBody,
};
use easel_core::error::TitleError;
use easel_core::impls::{InMemoryAssetStore, InMemoryCanvas, InMemoryTaskStore};
use easel_core::ports::{
    CanvasRecord, Clock, GenerateRequest, IdGenerator, ImageOutput, ImageProvider, ProviderError,
    RemoveBackgroundRequest, SystemClock, TitleGenerator, UlidGenerator, UpscaleRequest,
};
use tracing::debug;

const USER_ID: &str = "demo-user";
const PROJECT_ID: &str = "demo-project";
const SOURCE_ASSET: &str = "asset:demo-source";
const SOURCE_SIZE: (u32, u32) = (512, 384);

const PROMPTS: [&str; 4] = [
    "a lighthouse on a cliff at dusk, oil painting",
    "isometric pixel art of a tiny coffee shop",
    "macro photo of dew on a spider web",
    "a fox sleeping in fresh snow",
];

const RATIOS: [&str; 4] = ["16:9", "1:1", "3:4", "21:9"];

/// Provider that answers every fourth call with HTTP 429.
#[derive(Default)]
pub struct DemoProvider {
    calls: AtomicUsize,
}

impl DemoProvider {
    async fn call(&self) -> Result<(), ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(50)).await;
        if n % 4 == 0 {
            debug!(call = n, "demo provider throttling");
            return Err(ProviderError::http(429, "Too Many Requests"));
        }
        Ok(())
    }

    fn image(seed: &[u8], width: Option<u32>, height: Option<u32>) -> ImageOutput {
        let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
        data.extend_from_slice(seed);
        ImageOutput {
            data,
            content_type: "image/png".to_string(),
            width,
            height,
        }
    }
}

#[async_trait]
impl ImageProvider for DemoProvider {
    async fn generate_image(&self, request: GenerateRequest) -> Result<ImageOutput, ProviderError> {
        self.call().await?;
        Ok(Self::image(
            request.prompt.as_bytes(),
            Some(request.width),
            Some(request.height),
        ))
    }

    async fn upscale(&self, request: UpscaleRequest) -> Result<ImageOutput, ProviderError> {
        self.call().await?;
        let scaled = request.image.repeat(request.factor as usize);
        Ok(Self::image(&scaled, None, None))
    }

    async fn remove_background(&self, request: RemoveBackgroundRequest) -> Result<ImageOutput, ProviderError> {
        self.call().await?;
        Ok(Self::image(&request.image, None, None))
    }
}

/// Title model stand-in: the first few words of the prompt, capitalised.
pub struct DemoTitles;

#[async_trait]
impl TitleGenerator for DemoTitles {
    async fn generate_title(&self, prompt: &str, _user_id: &str) -> Result<String, TitleError> {
        let title = prompt
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|w| !w.is_empty())
            .take(4)
            .map(capitalise)
            .collect::<Vec<_>>()
            .join(" ");
        if title.is_empty() {
            return Err(TitleError("empty prompt".to_string()));
        }
        Ok(title)
    }
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct DemoWorld {
    pub store: Arc<InMemoryTaskStore>,
    pub assets: Arc<InMemoryAssetStore>,
    pub canvas: Arc<InMemoryCanvas>,
}

/// Seed `count` tasks cycling through the three kinds, plus one generation
/// task without a prompt that can only fail.
pub fn seed(count: usize, bucket: &str) -> DemoWorld {
    let clock = SystemClock;
    let ids = UlidGenerator::new(SystemClock);
    let store = Arc::new(InMemoryTaskStore::new());
    let assets = Arc::new(InMemoryAssetStore::new());
    let canvas = Arc::new(InMemoryCanvas::new());

    let canvas_id = CanvasId::new("demo-canvas");
    canvas.link_project(PROJECT_ID, canvas_id.clone());
    let room = canvas.room(&canvas_id);
    assets.insert(
        bucket,
        AssetId::new(SOURCE_ASSET),
        USER_ID,
        b"demo source image".to_vec(),
        "image/png",
    );

    let (src_w, src_h) = SOURCE_SIZE;
    for i in 0..count {
        let kind = match i % 3 {
            0 => TaskKind::GenerateImage(GenerateImageBody {
                model: Some("flux-schnell".to_string()),
                prompt: Some(PROMPTS[i % PROMPTS.len()].to_string()),
                aspect_ratio: Some(RATIOS[i % RATIOS.len()].to_string()),
                ..Default::default()
            }),
            1 => TaskKind::Upscale(UpscaleBody {
                source_asset_id: Some(AssetId::new(SOURCE_ASSET)),
                factor: Some(3),
                width: Some(src_w),
                height: Some(src_h),
                ..Default::default()
            }),
            _ => TaskKind::RemoveBackground(RemoveBackgroundBody {
                source_asset_id: Some(AssetId::new(SOURCE_ASSET)),
                width: Some(src_w),
                height: Some(src_h),
                ..Default::default()
            }),
        };

        let shape_id = ShapeId::new(format!("shape:demo-{i}"));
        room.insert(CanvasRecord::shape(shape_id.as_str(), "ai-image").with_prop("isProcessing", true));
        let task = Task::new(ids.generate_task_id(), &kind, USER_ID, PROJECT_ID, clock.now()).with_shape(shape_id);
        store.insert(task);
    }

    let broken = TaskKind::GenerateImage(GenerateImageBody {
        model: Some("flux-schnell".to_string()),
        ..Default::default()
    });
    store.insert(Task::new(ids.generate_task_id(), &broken, USER_ID, PROJECT_ID, clock.now()).with_max_retries(1));

    DemoWorld { store, assets, canvas }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn every_fourth_call_is_throttled() {
        let provider = DemoProvider::default();
        let mut throttled = Vec::new();
        for _ in 0..8 {
            let result = provider
                .remove_background(RemoveBackgroundRequest {
                    model: None,
                    image: vec![1, 2, 3],
                    content_type: "image/png".to_string(),
                })
                .await;
            throttled.push(matches!(result, Err(ProviderError { status: Some(429), .. })));
        }
        assert_eq!(throttled, [false, false, false, true, false, false, false, true]);
    }

    #[tokio::test]
    async fn titles_use_leading_words() {
        let title = DemoTitles
            .generate_title("a lighthouse on a cliff, at dusk", "u")
            .await
            .unwrap();
        assert_eq!(title, "A Lighthouse On A");
        assert!(DemoTitles.generate_title("  ", "u").await.is_err());
    }

    #[test]
    fn seed_adds_one_unfixable_task() {
        let world = seed(6, "canvas");
        let counts = world.store.counts();
        assert_eq!(counts.pending, 7);
        assert!(world.assets.get("canvas", &AssetId::new(SOURCE_ASSET)).is_some());
        assert_eq!(world.canvas.room(&CanvasId::new("demo-canvas")).len(), 6);
    }
}
