//! Status - snapshot of a running worker.

use serde::{Deserialize, Serialize};

use crate::domain::WorkerId;

/// What `Worker::status` reports.
///
/// ```ignore
/// let status = worker.status();
/// println!("{}", serde_json::to_string(&status)?);
/// // {"workerId":"01J...","running":true,"inFlight":2,"concurrency":3,"rateLimit":2.0}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    pub worker_id: WorkerId,
    pub running: bool,
    pub in_flight: usize,
    pub concurrency: usize,
    /// Provider calls per second currently allowed.
    pub rate_limit: f64,
}

impl WorkerStatus {
    /// Free slots at this instant.
    pub fn available_slots(&self) -> usize {
        self.concurrency.saturating_sub(self.in_flight)
    }
}
