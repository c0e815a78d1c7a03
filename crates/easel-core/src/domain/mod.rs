//! Domain model: tasks, task kinds, results, errors and the retry policy.

pub mod decision;
pub mod dimensions;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod result;
pub mod task;
pub mod task_kind;

pub use decision::{Decider, Decision, DefaultDecider};
pub use dimensions::{Dimensions, coerce_upscale_factor};
pub use errors::{ErrorKind, ProcessError};
pub use ids::{AssetId, CanvasId, ShapeId, TaskId, WorkerId};
pub use outcome::ProcessOutcome;
pub use result::{CompletedResult, ErrorDetails, FailedResult, ResultDescriptor, TaskResult};
pub use task::{Task, TaskPatch, TaskStatus};
pub use task_kind::{GenerateImageBody, RemoveBackgroundBody, TaskKind, UpscaleBody};
