//! Ports - traits for everything the worker talks to but does not own.
//!
//! Each trait is a seam to an external system (task database, blob storage,
//! model provider, collaborative canvas). `impls` provides in-memory
//! versions for tests and the demo binary.

pub mod asset_store;
pub mod canvas;
pub mod clock;
pub mod id_generator;
pub mod provider;
pub mod task_store;
pub mod title;

pub use self::asset_store::{AssetStore, StoredAsset};
pub use self::canvas::{CanvasDirectory, CanvasRecord, CanvasRoom, CanvasTransaction, StoreMutator};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::provider::{
    GenerateRequest, ImageOutput, ImageProvider, ProviderError, RemoveBackgroundRequest, UpscaleRequest,
};
pub use self::task_store::TaskStore;
pub use self::title::TitleGenerator;
