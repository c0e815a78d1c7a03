//! App - the application layer.
//!
//! Combines the ports into the running worker.
//!
//! # Components
//! - **WorkerBuilder**: wiring and start-up validation
//! - **Worker**: poll loop (claim -> process -> decide -> project -> update)
//! - **RateLimiter**: spacing of provider calls
//! - **CanvasProjector**: writes finished results onto canvas shapes
//! - **WorkerStatus**: status snapshot

pub mod builder;
pub mod projection;
pub mod rate_limiter;
pub mod status;
pub mod worker_loop;

pub use self::builder::{BuildError, WorkerBuilder};
pub use self::projection::{CanvasProjector, ProjectionOutcome, ShapeUpdate};
pub use self::rate_limiter::RateLimiter;
pub use self::status::WorkerStatus;
pub use self::worker_loop::Worker;
