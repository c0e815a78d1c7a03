//! InMemoryCanvas - development canvas directory and rooms.
//!
//! Each room holds its records in a map. `update_store` runs the mutator
//! against a staged view and commits the staged writes only when the
//! mutator returns `Ok`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::CanvasId;
use crate::error::CanvasError;
use crate::ports::{CanvasDirectory, CanvasRecord, CanvasRoom, CanvasTransaction, StoreMutator};

#[derive(Default)]
pub struct InMemoryRoom {
    records: Mutex<HashMap<String, CanvasRecord>>,
}

impl InMemoryRoom {
    pub fn insert(&self, record: CanvasRecord) {
        self.records.lock().insert(record.id.clone(), record);
    }

    pub fn record(&self, id: &str) -> Option<CanvasRecord> {
        self.records.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct StagedTransaction<'a> {
    committed: &'a HashMap<String, CanvasRecord>,
    writes: HashMap<String, CanvasRecord>,
}

impl CanvasTransaction for StagedTransaction<'_> {
    fn get(&self, id: &str) -> Option<CanvasRecord> {
        self.writes
            .get(id)
            .or_else(|| self.committed.get(id))
            .cloned()
    }

    fn put(&mut self, record: CanvasRecord) {
        self.writes.insert(record.id.clone(), record);
    }
}

#[async_trait]
impl CanvasRoom for InMemoryRoom {
    async fn update_store(&self, mutator: StoreMutator) -> Result<(), CanvasError> {
        let mut records = self.records.lock();
        let mut txn = StagedTransaction {
            committed: &records,
            writes: HashMap::new(),
        };
        mutator(&mut txn)?;
        let writes = txn.writes;
        records.extend(writes);
        Ok(())
    }
}

/// Project to canvas links plus the rooms opened so far.
#[derive(Default)]
pub struct InMemoryCanvas {
    projects: Mutex<HashMap<String, CanvasId>>,
    rooms: Mutex<HashMap<CanvasId, Arc<InMemoryRoom>>>,
}

impl InMemoryCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link_project(&self, project_id: &str, canvas_id: CanvasId) {
        self.projects.lock().insert(project_id.to_string(), canvas_id);
    }

    /// Room for `canvas_id`, created empty if nobody opened it yet.
    pub fn room(&self, canvas_id: &CanvasId) -> Arc<InMemoryRoom> {
        let mut rooms = self.rooms.lock();
        Arc::clone(rooms.entry(canvas_id.clone()).or_default())
    }
}

#[async_trait]
impl CanvasDirectory for InMemoryCanvas {
    async fn canvas_id_for_project(&self, project_id: &str) -> Result<Option<CanvasId>, CanvasError> {
        Ok(self.projects.lock().get(project_id).cloned())
    }

    async fn open_room(&self, canvas_id: &CanvasId) -> Result<Arc<dyn CanvasRoom>, CanvasError> {
        let room: Arc<dyn CanvasRoom> = self.room(canvas_id);
        Ok(room)
    }
}
