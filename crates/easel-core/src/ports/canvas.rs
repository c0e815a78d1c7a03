//! Canvas ports - the collaborative document results are projected onto.
//!
//! The canvas is an opaque external collaborator. All this crate assumes is:
//! one mutator callback per update, reads and writes of single records inside
//! it, and an atomic commit when the callback returns `Ok`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::CanvasId;
use crate::error::CanvasError;

/// Record type name of shapes.
pub const SHAPE_RECORD: &str = "shape";

/// Record type name of assets.
pub const ASSET_RECORD: &str = "asset";

/// One record of the canvas store (a shape, an asset, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasRecord {
    pub id: String,
    pub type_name: String,
    /// Shape or asset kind, e.g. `image`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub props: Map<String, Value>,
}

impl CanvasRecord {
    pub fn new(id: impl Into<String>, type_name: &str, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.to_string(),
            kind: Some(kind.into()),
            props: Map::new(),
        }
    }

    pub fn shape(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(id, SHAPE_RECORD, kind)
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }
}

/// Read/write view handed to a mutator for the duration of one update.
pub trait CanvasTransaction: Send {
    fn get(&self, id: &str) -> Option<CanvasRecord>;

    fn put(&mut self, record: CanvasRecord);
}

/// Mutator run inside `CanvasRoom::update_store`. Returning `Err` aborts the
/// update; nothing it wrote is committed.
pub type StoreMutator =
    Box<dyn FnOnce(&mut dyn CanvasTransaction) -> Result<(), CanvasError> + Send>;

/// A live canvas document.
#[async_trait]
pub trait CanvasRoom: Send + Sync {
    async fn update_store(&self, mutator: StoreMutator) -> Result<(), CanvasError>;
}

/// Resolves projects to canvases and opens their rooms.
#[async_trait]
pub trait CanvasDirectory: Send + Sync {
    async fn canvas_id_for_project(&self, project_id: &str) -> Result<Option<CanvasId>, CanvasError>;

    /// Open the room for a canvas, loading it if nobody has it open yet.
    async fn open_room(&self, canvas_id: &CanvasId) -> Result<Arc<dyn CanvasRoom>, CanvasError>;
}
