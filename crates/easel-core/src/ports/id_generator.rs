//! IdGenerator port - ids minted by the worker.
//!
//! Worker identities and target asset keys are ULIDs, so they sort by
//! creation time and can be minted on any instance without coordination.

use crate::domain::ids::{AssetId, TaskId, WorkerId};
use crate::ports::Clock;
use ulid::Ulid;

pub trait IdGenerator: Send + Sync {
    fn generate_worker_id(&self) -> WorkerId;

    fn generate_task_id(&self) -> TaskId;

    /// Asset key in the canvas convention, `asset:<ulid>`.
    fn generate_asset_id(&self) -> AssetId;
}

/// ULID generator whose timestamp part comes from a `Clock`.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_worker_id(&self) -> WorkerId {
        WorkerId::from(self.next_ulid())
    }

    fn generate_task_id(&self) -> TaskId {
        TaskId::from(self.next_ulid())
    }

    fn generate_asset_id(&self) -> AssetId {
        AssetId::new(format!("asset:{}", self.next_ulid()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn generated_ids_are_unique() {
        let id_gen = UlidGenerator::new(SystemClock);

        assert_ne!(id_gen.generate_worker_id(), id_gen.generate_worker_id());
        assert_ne!(id_gen.generate_task_id(), id_gen.generate_task_id());
        assert_ne!(id_gen.generate_asset_id(), id_gen.generate_asset_id());
    }

    #[test]
    fn fixed_clock_pins_the_timestamp_part() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_task_id();
        let id2 = id_gen.generate_task_id();

        // random part differs, timestamp part does not
        assert_ne!(id1, id2);
        assert_eq!(id1.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
        assert_eq!(id2.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn asset_ids_use_canvas_prefix() {
        let id_gen = UlidGenerator::new(SystemClock);
        assert!(id_gen.generate_asset_id().as_str().starts_with("asset:"));
    }
}
