//! Domain identifiers (strongly-typed IDs).
//!
//! Worker-minted identities (`TaskId`, `WorkerId`) are ULIDs wrapped in a
//! phantom-typed `Id<T>`, so a task id can never be passed where a worker id
//! is expected. Keys owned by other systems (assets, shapes, canvases) are
//! opaque strings and get thin newtypes instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for each id flavour.
///
/// Supplies the prefix used by `Display` ("task-", "worker-").
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic ULID-backed id.
///
/// Serialized as the bare ULID string; the prefix only shows up in logs.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Task marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Worker instance marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Worker {}

impl IdMarker for Worker {
    fn prefix() -> &'static str {
        "worker-"
    }
}

/// Identifier of a task record in the task store.
pub type TaskId = Id<Task>;

/// Identity a worker instance stamps on the tasks it claims.
pub type WorkerId = Id<Worker>;

macro_rules! string_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

string_key! {
    /// Key of a stored binary asset (e.g. `asset:01J...`).
    AssetId
}

string_key! {
    /// Key of a shape record on a collaborative canvas.
    ShapeId
}

string_key! {
    /// Key of a collaborative canvas document.
    CanvasId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_prefix() {
        let ulid = Ulid::new();
        let task = TaskId::from_ulid(ulid);
        let worker = WorkerId::from_ulid(ulid);

        assert_eq!(task.as_ulid(), ulid);
        assert!(task.to_string().starts_with("task-"));
        assert!(worker.to_string().starts_with("worker-"));
    }

    #[test]
    fn ids_serialize_as_bare_ulid() {
        let ulid = Ulid::new();
        let task = TaskId::from_ulid(ulid);

        let json = serde_json::to_string(&task).unwrap();
        assert_eq!(json, format!("\"{ulid}\""));

        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn string_keys_are_transparent() {
        let asset = AssetId::new("asset:abc");
        assert_eq!(serde_json::to_string(&asset).unwrap(), "\"asset:abc\"");
        assert_eq!(asset.to_string(), "asset:abc");
        assert_eq!(ShapeId::from("shape:1").as_str(), "shape:1");
    }
}
