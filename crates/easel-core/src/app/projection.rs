//! Canvas projection: writing a finished result onto the shape that asked for it.
//!
//! Projection is best effort. The caller logs whatever comes back and never
//! lets it change the task's own outcome.
//!
//! # Flow
//! 1. `CanvasDirectory::canvas_id_for_project`; no canvas -> `NoCanvas`
//! 2. `CanvasDirectory::open_room`
//! 3. one `CanvasRoom::update_store` transaction: put the asset record, then
//!    patch the shape (`assetId`, size, `isProcessing = false`, title)
//! 4. the shape's presence and kind decide the reported `ProjectionOutcome`

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::domain::{ResultDescriptor, ShapeId, Task};
use crate::error::CanvasError;
use crate::ports::canvas::{ASSET_RECORD, SHAPE_RECORD};
use crate::ports::{CanvasDirectory, CanvasRecord, CanvasTransaction, Clock};

/// Shape kinds that display an image asset.
pub const PROJECTABLE_SHAPES: [&str; 2] = ["image", "ai-image"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionOutcome {
    Applied,
    /// The task's project has no canvas.
    NoCanvas,
    ShapeMissing,
    /// The shape exists but is not an image shape.
    UnsupportedShape(String),
}

/// Record writes for one finished result, applied inside a canvas transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeUpdate {
    pub shape_id: ShapeId,
    pub result: ResultDescriptor,
    /// Epoch milliseconds stamped on the shape.
    pub updated_at: i64,
}

impl ShapeUpdate {
    pub fn apply(&self, txn: &mut dyn CanvasTransaction) -> ProjectionOutcome {
        let Some(mut shape) = txn.get(self.shape_id.as_str()) else {
            return ProjectionOutcome::ShapeMissing;
        };
        let kind = shape.kind.clone().unwrap_or_default();
        if shape.type_name != SHAPE_RECORD || !PROJECTABLE_SHAPES.contains(&kind.as_str()) {
            return ProjectionOutcome::UnsupportedShape(kind);
        }

        let result = &self.result;
        let name = result
            .title
            .clone()
            .unwrap_or_else(|| result.asset_id.to_string());
        txn.put(
            CanvasRecord::new(result.asset_id.as_str(), ASSET_RECORD, "image")
                .with_prop("src", result.asset_url.as_str())
                .with_prop("w", result.width)
                .with_prop("h", result.height)
                .with_prop("mimeType", result.content_type.as_str())
                .with_prop("name", name),
        );

        let props = &mut shape.props;
        props.insert("assetId".to_string(), Value::from(result.asset_id.as_str()));
        if let Some(w) = result.width {
            props.insert("w".to_string(), Value::from(w));
        }
        if let Some(h) = result.height {
            props.insert("h".to_string(), Value::from(h));
        }
        props.insert("isProcessing".to_string(), Value::Bool(false));
        props.insert("updatedAt".to_string(), Value::from(self.updated_at));
        if let Some(title) = &result.title {
            props.insert("title".to_string(), Value::from(title.as_str()));
        }
        txn.put(shape);
        ProjectionOutcome::Applied
    }
}

pub struct CanvasProjector {
    directory: Arc<dyn CanvasDirectory>,
    clock: Arc<dyn Clock>,
}

impl CanvasProjector {
    pub fn new(directory: Arc<dyn CanvasDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self { directory, clock }
    }

    /// Project `result` onto the task's target shape in one canvas update.
    ///
    /// Tasks without a target shape are the caller's concern; this expects
    /// `shape_id` to be set and reports `ShapeMissing` otherwise.
    pub async fn project(&self, task: &Task, result: &ResultDescriptor) -> Result<ProjectionOutcome, CanvasError> {
        let Some(shape_id) = task.shape_id.clone() else {
            return Ok(ProjectionOutcome::ShapeMissing);
        };
        let Some(canvas_id) = self.directory.canvas_id_for_project(&task.project_id).await? else {
            return Ok(ProjectionOutcome::NoCanvas);
        };
        let room = self.directory.open_room(&canvas_id).await?;
        debug!(task_id = %task.id, %canvas_id, %shape_id, "projecting result onto canvas");

        let update = ShapeUpdate {
            shape_id,
            result: result.clone(),
            updated_at: self.clock.now().timestamp_millis(),
        };
        let outcome = Arc::new(Mutex::new(ProjectionOutcome::ShapeMissing));
        let slot = Arc::clone(&outcome);
        room.update_store(Box::new(move |txn: &mut dyn CanvasTransaction| {
            *slot.lock() = update.apply(txn);
            Ok(())
        }))
        .await?;

        let outcome = outcome.lock().clone();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetId, CanvasId};
    use crate::impls::InMemoryCanvas;
    use crate::ports::FixedClock;
    use crate::testing::{RejectingCanvas, fixed_now, test_task};
    use serde_json::json;

    fn result(title: Option<&str>) -> ResultDescriptor {
        ResultDescriptor {
            asset_id: AssetId::new("asset:new"),
            asset_url: "memory://assets/canvas/asset:new".to_string(),
            content_type: "image/png".to_string(),
            width: Some(1024),
            height: Some(576),
            file_size: 64,
            title: title.map(str::to_string),
        }
    }

    fn projector(directory: Arc<dyn CanvasDirectory>) -> CanvasProjector {
        CanvasProjector::new(directory, Arc::new(FixedClock::new(fixed_now())))
    }

    fn linked_canvas(shape: CanvasRecord) -> (Arc<InMemoryCanvas>, CanvasId) {
        let canvas = Arc::new(InMemoryCanvas::new());
        let canvas_id = CanvasId::new("canvas-1");
        canvas.link_project(crate::testing::PROJECT_ID, canvas_id.clone());
        canvas.room(&canvas_id).insert(shape);
        (canvas, canvas_id)
    }

    #[tokio::test]
    async fn image_shape_gets_asset_and_metadata() {
        let (canvas, canvas_id) = linked_canvas(
            CanvasRecord::shape("shape:1", "ai-image")
                .with_prop("isProcessing", true)
                .with_prop("w", 100),
        );
        let task = test_task("generate_image", json!({})).with_shape(ShapeId::new("shape:1"));

        let outcome = projector(canvas.clone())
            .project(&task, &result(Some("Fox")))
            .await
            .unwrap();
        assert_eq!(outcome, ProjectionOutcome::Applied);

        let room = canvas.room(&canvas_id);
        let shape = room.record("shape:1").unwrap();
        assert_eq!(shape.props["assetId"], "asset:new");
        assert_eq!(shape.props["w"], 1024);
        assert_eq!(shape.props["h"], 576);
        assert_eq!(shape.props["isProcessing"], false);
        assert_eq!(shape.props["title"], "Fox");
        assert_eq!(shape.props["updatedAt"], fixed_now().timestamp_millis());

        let asset = room.record("asset:new").unwrap();
        assert_eq!(asset.type_name, ASSET_RECORD);
        assert_eq!(asset.props["src"], "memory://assets/canvas/asset:new");
        assert_eq!(asset.props["mimeType"], "image/png");
        assert_eq!(asset.props["name"], "Fox");
    }

    #[tokio::test]
    async fn unknown_shape_kind_is_left_alone() {
        let (canvas, canvas_id) = linked_canvas(CanvasRecord::shape("shape:1", "geo").with_prop("w", 100));
        let task = test_task("generate_image", json!({})).with_shape(ShapeId::new("shape:1"));

        let outcome = projector(canvas.clone()).project(&task, &result(None)).await.unwrap();

        assert_eq!(outcome, ProjectionOutcome::UnsupportedShape("geo".to_string()));
        let room = canvas.room(&canvas_id);
        assert_eq!(room.record("shape:1").unwrap().props["w"], 100);
        assert!(room.record("asset:new").is_none());
    }

    #[tokio::test]
    async fn missing_shape_and_missing_canvas_are_reported() {
        let (canvas, _) = linked_canvas(CanvasRecord::shape("shape:1", "image"));
        let task = test_task("generate_image", json!({})).with_shape(ShapeId::new("shape:gone"));
        let outcome = projector(canvas.clone()).project(&task, &result(None)).await.unwrap();
        assert_eq!(outcome, ProjectionOutcome::ShapeMissing);

        let mut elsewhere = task.clone();
        elsewhere.project_id = "project-without-canvas".to_string();
        let outcome = projector(canvas).project(&elsewhere, &result(None)).await.unwrap();
        assert_eq!(outcome, ProjectionOutcome::NoCanvas);
    }

    #[tokio::test]
    async fn rejected_update_is_an_error() {
        let task = test_task("generate_image", json!({})).with_shape(ShapeId::new("shape:1"));
        let err = projector(Arc::new(RejectingCanvas))
            .project(&task, &result(None))
            .await
            .unwrap_err();
        assert!(matches!(err, CanvasError::Rejected(_)));
    }
}
