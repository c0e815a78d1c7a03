//! easel-core
//!
//! Core of the Easel generative-task worker: claims image tasks from a task
//! store, runs them against a rate-limited model provider, writes results
//! back and projects them onto the collaborative canvas.
//!
//! # Modules
//! - **domain**: tasks, task kinds, results, errors, retry policy
//! - **ports**: traits for the task store, asset storage, provider, canvas, clock, ids
//! - **app**: worker loop, rate limiter, canvas projection, builder, status
//! - **processors**: one processor per task kind
//! - **impls**: in-memory ports for tests and local runs
//! - **config**: `WorkerConfig` (defaults, TOML file, env overrides)
//! - **observability**: tracing setup and task counts

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod processors;

#[cfg(test)]
mod testing;

pub use app::{BuildError, RateLimiter, Worker, WorkerBuilder, WorkerStatus};
pub use config::{ConfigError, WorkerConfig};
