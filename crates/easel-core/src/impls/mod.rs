//! Impls - in-memory implementations of the ports.
//!
//! Used by the tests and by the demo binary. Production stores (database,
//! object storage, live canvas rooms) live outside this crate.

pub mod inmem_asset_store;
pub mod inmem_canvas;
pub mod inmem_task_store;

pub use self::inmem_asset_store::InMemoryAssetStore;
pub use self::inmem_canvas::{InMemoryCanvas, InMemoryRoom};
pub use self::inmem_task_store::InMemoryTaskStore;
