//! Closed set of task kinds and their typed bodies.
//!
//! Task records keep `taskType` and `body` raw; `TaskKind::decode` is the only
//! place that turns them into a typed body. Adding a kind means adding a
//! variant here, and every `match` on `TaskKind` stops compiling until the
//! new kind is handled.
//!
//! Body fields are all optional on purpose: a missing required field is a
//! processing failure (charged to the retry budget), not a decode failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::ProcessError;
use super::ids::AssetId;

pub const GENERATE_IMAGE: &str = "generate_image";
pub const IMAGE_UPSCALE: &str = "image_upscale";
pub const IMAGE_REMOVE_BACKGROUND: &str = "image_remove_background";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateImageBody {
    pub model: Option<String>,
    pub prompt: Option<String>,
    /// `W:H`, e.g. `16:9`. Ignored when both `width` and `height` are set.
    pub aspect_ratio: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Target asset; minted by the processor when absent.
    pub asset_id: Option<AssetId>,
    /// Extra model parameters, passed to the provider untouched.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpscaleBody {
    pub model: Option<String>,
    pub source_asset_id: Option<AssetId>,
    pub asset_id: Option<AssetId>,
    pub factor: Option<u32>,
    /// Source dimensions, when the caller knows them.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoveBackgroundBody {
    pub model: Option<String>,
    pub source_asset_id: Option<AssetId>,
    pub asset_id: Option<AssetId>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    GenerateImage(GenerateImageBody),
    Upscale(UpscaleBody),
    RemoveBackground(RemoveBackgroundBody),
}

impl TaskKind {
    /// Decode a raw `(taskType, body)` pair.
    ///
    /// Unknown task types fail with `ErrorKind::Unsupported`.
    pub fn decode(task_type: &str, body: &Value) -> Result<Self, ProcessError> {
        match task_type {
            GENERATE_IMAGE => Ok(TaskKind::GenerateImage(parse_body(task_type, body)?)),
            IMAGE_UPSCALE => Ok(TaskKind::Upscale(parse_body(task_type, body)?)),
            IMAGE_REMOVE_BACKGROUND => Ok(TaskKind::RemoveBackground(parse_body(task_type, body)?)),
            other => Err(ProcessError::unsupported_task_type(other)),
        }
    }

    pub fn task_type(&self) -> &'static str {
        match self {
            TaskKind::GenerateImage(_) => GENERATE_IMAGE,
            TaskKind::Upscale(_) => IMAGE_UPSCALE,
            TaskKind::RemoveBackground(_) => IMAGE_REMOVE_BACKGROUND,
        }
    }

    pub fn to_body(&self) -> Value {
        let encoded = match self {
            TaskKind::GenerateImage(body) => serde_json::to_value(body),
            TaskKind::Upscale(body) => serde_json::to_value(body),
            TaskKind::RemoveBackground(body) => serde_json::to_value(body),
        };
        // plain structs of options and strings always encode
        encoded.unwrap_or(Value::Null)
    }
}

fn parse_body<T: serde::de::DeserializeOwned + Default>(
    task_type: &str,
    body: &Value,
) -> Result<T, ProcessError> {
    if body.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(body.clone()).map_err(|e| ProcessError::invalid_body(task_type, e))
}
