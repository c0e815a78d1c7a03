//! Test fakes and fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Semaphore;
use ulid::Ulid;

use crate::app::RateLimiter;
use crate::domain::task_kind::{GENERATE_IMAGE, IMAGE_REMOVE_BACKGROUND, IMAGE_UPSCALE};
use crate::domain::{AssetId, CanvasId, Task, TaskId, TaskKind, TaskPatch, WorkerId};
use crate::error::{CanvasError, StoreError, TitleError};
use crate::impls::{InMemoryAssetStore, InMemoryTaskStore};
use crate::ports::{
    AssetStore, CanvasDirectory, CanvasRoom, FixedClock, GenerateRequest, ImageOutput, ImageProvider,
    ProviderError, RemoveBackgroundRequest, StoreMutator, StoredAsset, TaskStore, TitleGenerator,
    UlidGenerator, UpscaleRequest,
};
use crate::processors::{ProcessorContext, ProcessorSettings, Processors};

pub const USER_ID: &str = "user-1";
pub const PROJECT_ID: &str = "project-1";
pub const BUCKET: &str = "canvas";

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// Pending task with a raw type and body, owned by `USER_ID` in `PROJECT_ID`.
pub fn test_task(task_type: &str, body: Value) -> Task {
    let mut task = Task::new(
        TaskId::from_ulid(Ulid::new()),
        &TaskKind::GenerateImage(Default::default()),
        USER_ID,
        PROJECT_ID,
        fixed_now(),
    );
    task.task_type = task_type.to_string();
    task.body = body;
    task
}

/// Poll `check` until it holds. Panics after a generous number of rounds.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

enum Scripted {
    Fail(ProviderError),
    Panic,
}

/// Provider that succeeds unless told otherwise.
///
/// Outputs are `OUTPUT_LEN` zero bytes of `image/png`; generation reports
/// the requested size, the image-to-image calls report none. A gated
/// provider parks every call until `release` hands out a pass.
#[derive(Default)]
pub struct ScriptedProvider {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Scripted>>,
    gate: Option<Arc<Semaphore>>,
    generate: Mutex<Option<GenerateRequest>>,
    upscale: Mutex<Option<UpscaleRequest>>,
    remove_background: Mutex<Option<RemoveBackgroundRequest>>,
}

impl ScriptedProvider {
    pub const OUTPUT_LEN: usize = 64;

    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// Let `n` parked or future calls through.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn fail_next(&self, err: ProviderError) {
        self.script.lock().push_back(Scripted::Fail(err));
    }

    pub fn panic_next(&self) {
        self.script.lock().push_back(Scripted::Panic);
    }

    /// Calls that reached the provider, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_generate(&self) -> Option<GenerateRequest> {
        self.generate.lock().clone()
    }

    pub fn last_upscale(&self) -> Option<UpscaleRequest> {
        self.upscale.lock().clone()
    }

    pub fn last_remove_background(&self) -> Option<RemoveBackgroundRequest> {
        self.remove_background.lock().clone()
    }

    async fn enter(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Panic) => panic!("scripted provider panic"),
            None => Ok(()),
        }
    }

    fn output(width: Option<u32>, height: Option<u32>) -> ImageOutput {
        ImageOutput {
            data: vec![0; Self::OUTPUT_LEN],
            content_type: "image/png".to_string(),
            width,
            height,
        }
    }
}

#[async_trait]
impl ImageProvider for ScriptedProvider {
    async fn generate_image(&self, request: GenerateRequest) -> Result<ImageOutput, ProviderError> {
        let (width, height) = (request.width, request.height);
        *self.generate.lock() = Some(request);
        self.enter().await?;
        Ok(Self::output(Some(width), Some(height)))
    }

    async fn upscale(&self, request: UpscaleRequest) -> Result<ImageOutput, ProviderError> {
        *self.upscale.lock() = Some(request);
        self.enter().await?;
        Ok(Self::output(None, None))
    }

    async fn remove_background(&self, request: RemoveBackgroundRequest) -> Result<ImageOutput, ProviderError> {
        *self.remove_background.lock() = Some(request);
        self.enter().await?;
        Ok(Self::output(None, None))
    }
}

pub struct FixedTitles(pub &'static str);

#[async_trait]
impl TitleGenerator for FixedTitles {
    async fn generate_title(&self, _prompt: &str, _user_id: &str) -> Result<String, TitleError> {
        Ok(self.0.to_string())
    }
}

pub struct FailingTitles;

#[async_trait]
impl TitleGenerator for FailingTitles {
    async fn generate_title(&self, _prompt: &str, _user_id: &str) -> Result<String, TitleError> {
        Err(TitleError("title model unavailable".to_string()))
    }
}

/// Task store whose claims always fail.
#[derive(Default)]
pub struct FailingTaskStore {
    claims: AtomicUsize,
}

impl FailingTaskStore {
    pub fn claim_attempts(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskStore for FailingTaskStore {
    async fn claim_tasks(&self, _worker_id: WorkerId, _max_count: usize) -> Result<Vec<Task>, StoreError> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn update_task(&self, task_id: TaskId, _patch: TaskPatch) -> Result<(), StoreError> {
        Err(StoreError::NotFound(task_id))
    }

    async fn get_task(&self, _task_id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(None)
    }
}

/// Wraps an in-memory store but ignores `max_count` when claiming.
pub struct GreedyTaskStore(pub Arc<InMemoryTaskStore>);

#[async_trait]
impl TaskStore for GreedyTaskStore {
    async fn claim_tasks(&self, worker_id: WorkerId, _max_count: usize) -> Result<Vec<Task>, StoreError> {
        self.0.claim_tasks(worker_id, usize::MAX).await
    }

    async fn update_task(&self, task_id: TaskId, patch: TaskPatch) -> Result<(), StoreError> {
        self.0.update_task(task_id, patch).await
    }

    async fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, StoreError> {
        self.0.get_task(task_id).await
    }
}

/// Canvas whose every project resolves but whose rooms reject all updates.
pub struct RejectingCanvas;

struct RejectingRoom;

#[async_trait]
impl CanvasRoom for RejectingRoom {
    async fn update_store(&self, _mutator: StoreMutator) -> Result<(), CanvasError> {
        Err(CanvasError::Rejected("room is read-only".to_string()))
    }
}

#[async_trait]
impl CanvasDirectory for RejectingCanvas {
    async fn canvas_id_for_project(&self, _project_id: &str) -> Result<Option<CanvasId>, CanvasError> {
        Ok(Some(CanvasId::new("canvas-readonly")))
    }

    async fn open_room(&self, _canvas_id: &CanvasId) -> Result<Arc<dyn CanvasRoom>, CanvasError> {
        Ok(Arc::new(RejectingRoom))
    }
}

/// Canvas whose room lookup panics.
pub struct PanickingCanvas;

#[async_trait]
impl CanvasDirectory for PanickingCanvas {
    async fn canvas_id_for_project(&self, _project_id: &str) -> Result<Option<CanvasId>, CanvasError> {
        Ok(Some(CanvasId::new("canvas-broken")))
    }

    async fn open_room(&self, canvas_id: &CanvasId) -> Result<Arc<dyn CanvasRoom>, CanvasError> {
        panic!("room {canvas_id} exploded")
    }
}

/// Processor fixture: in-memory assets, a scripted provider and a fast limiter.
pub struct Harness {
    pub provider: Arc<ScriptedProvider>,
    pub assets: Arc<InMemoryAssetStore>,
    titles: Option<Arc<dyn TitleGenerator>>,
}

impl Harness {
    pub fn new(provider: ScriptedProvider) -> Self {
        Self {
            provider: Arc::new(provider),
            assets: Arc::new(InMemoryAssetStore::new()),
            titles: None,
        }
    }

    pub fn with_titles(mut self, titles: impl TitleGenerator + 'static) -> Self {
        self.titles = Some(Arc::new(titles));
        self
    }

    pub fn processors(&self) -> Processors {
        Processors::new(ProcessorContext {
            assets: self.assets.clone(),
            provider: self.provider.clone(),
            titles: self.titles.clone(),
            limiter: Arc::new(RateLimiter::new(1000.0)),
            ids: Arc::new(UlidGenerator::new(FixedClock::new(fixed_now()))),
            settings: ProcessorSettings {
                asset_bucket: BUCKET.to_string(),
                base_dimension: 1024,
                title_max_chars: 50,
            },
        })
    }

    pub fn generate_task(&self, body: Value) -> Task {
        test_task(GENERATE_IMAGE, body)
    }

    pub fn upscale_task(&self, body: Value) -> Task {
        test_task(IMAGE_UPSCALE, body)
    }

    pub fn remove_background_task(&self, body: Value) -> Task {
        test_task(IMAGE_REMOVE_BACKGROUND, body)
    }

    pub async fn seed_asset(&self, asset_id: &str, data: &[u8]) {
        self.seed_asset_for(USER_ID, asset_id, data).await;
    }

    pub async fn seed_asset_for(&self, user_id: &str, asset_id: &str, data: &[u8]) {
        self.assets
            .store_asset(BUCKET, &AssetId::new(asset_id), user_id, data.to_vec(), "image/png")
            .await
            .unwrap();
    }

    pub async fn stored_asset(&self, asset_id: &str) -> Option<StoredAsset> {
        self.assets
            .load_asset(BUCKET, &AssetId::new(asset_id), USER_ID)
            .await
            .unwrap()
    }
}
