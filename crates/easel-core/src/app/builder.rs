//! WorkerBuilder - wiring and start-up validation.
//!
//! Fails fast: a worker without a task store, an asset store or a provider
//! is a wiring bug, and `build()` says which one is missing instead of the
//! first poll failing later.

use std::sync::Arc;

use super::projection::CanvasProjector;
use super::rate_limiter::RateLimiter;
use super::worker_loop::{Worker, WorkerParts};
use crate::config::{ConfigError, WorkerConfig};
use crate::domain::{Decider, DefaultDecider, WorkerId};
use crate::ports::{
    AssetStore, CanvasDirectory, Clock, IdGenerator, ImageProvider, SystemClock, TaskStore, TitleGenerator,
    UlidGenerator,
};
use crate::processors::{ProcessorContext, Processors};

/// Builds a `Worker`.
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(WorkerConfig::load(None)?)
///     .task_store(store)
///     .asset_store(assets)
///     .provider(provider)
///     .canvas(canvas)
///     .build()?;
/// worker.start();
/// ```
///
/// Clock, id generator and decider have defaults; the title generator and
/// canvas are optional.
pub struct WorkerBuilder {
    config: WorkerConfig,
    store: Option<Arc<dyn TaskStore>>,
    assets: Option<Arc<dyn AssetStore>>,
    provider: Option<Arc<dyn ImageProvider>>,
    titles: Option<Arc<dyn TitleGenerator>>,
    canvas: Option<Arc<dyn CanvasDirectory>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    decider: Option<Arc<dyn Decider>>,
    worker_id: Option<WorkerId>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing collaborator `{0}`; set it on the builder before build()")]
    MissingCollaborator(&'static str),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl WorkerBuilder {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            store: None,
            assets: None,
            provider: None,
            titles: None,
            canvas: None,
            clock: None,
            ids: None,
            decider: None,
            worker_id: None,
        }
    }

    pub fn task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn asset_store(mut self, assets: Arc<dyn AssetStore>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn title_generator(mut self, titles: Arc<dyn TitleGenerator>) -> Self {
        self.titles = Some(titles);
        self
    }

    pub fn canvas(mut self, canvas: Arc<dyn CanvasDirectory>) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn decider(mut self, decider: Arc<dyn Decider>) -> Self {
        self.decider = Some(decider);
        self
    }

    /// Use a fixed identity instead of minting one.
    pub fn worker_id(mut self, worker_id: WorkerId) -> Self {
        self.worker_id = Some(worker_id);
        self
    }

    pub fn build(self) -> Result<Worker, BuildError> {
        self.config.validate()?;
        let store = self.store.ok_or(BuildError::MissingCollaborator("task_store"))?;
        let assets = self.assets.ok_or(BuildError::MissingCollaborator("asset_store"))?;
        let provider = self.provider.ok_or(BuildError::MissingCollaborator("provider"))?;

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(SystemClock)),
        };
        let decider: Arc<dyn Decider> = match self.decider {
            Some(decider) => decider,
            None => Arc::new(DefaultDecider),
        };
        let id = self.worker_id.unwrap_or_else(|| ids.generate_worker_id());

        let limiter = Arc::new(RateLimiter::new(self.config.rate_limit_per_second));
        let processors = Processors::new(ProcessorContext {
            assets,
            provider,
            titles: self.titles,
            limiter: Arc::clone(&limiter),
            ids,
            settings: self.config.processor_settings(),
        });
        let projector = self
            .canvas
            .map(|canvas| CanvasProjector::new(canvas, Arc::clone(&clock)));

        Ok(Worker::new(WorkerParts {
            id,
            store,
            processors,
            decider,
            projector,
            clock,
            limiter,
            concurrency: self.config.concurrency,
            poll_interval: self.config.poll_interval(),
        }))
    }
}
