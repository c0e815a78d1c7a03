//! Worker - the poll loop that turns pending tasks into terminal ones.
//!
//! # Flow
//! 1. free slots = concurrency - in flight
//! 2. `TaskStore::claim_tasks(worker_id, free slots)`
//! 3. each claimed task runs on its own tokio task holding one slot
//! 4. processor -> `ProcessOutcome` -> `Decider` -> `Decision`
//! 5. completed results are projected onto the canvas (best effort)
//! 6. `TaskStore::update_task` writes the decision
//!
//! The processor and the projection each run on a nested tokio task, so a
//! panic in either surfaces as a `JoinError` and step 6 still happens.
//!
//! Slots are semaphore permits. A permit is released when the task's tokio
//! task ends, whatever happened inside it, so a slot can never leak.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::projection::{CanvasProjector, ProjectionOutcome};
use super::rate_limiter::RateLimiter;
use super::status::WorkerStatus;
use crate::domain::{Decider, Decision, ProcessError, ProcessOutcome, ResultDescriptor, Task, TaskPatch, WorkerId};
use crate::error::StoreError;
use crate::ports::{Clock, TaskStore};
use crate::processors::Processors;

/// Everything a worker is made of. Assembled by `WorkerBuilder`.
pub(crate) struct WorkerParts {
    pub id: WorkerId,
    pub store: Arc<dyn TaskStore>,
    pub processors: Processors,
    pub decider: Arc<dyn Decider>,
    pub projector: Option<CanvasProjector>,
    pub clock: Arc<dyn Clock>,
    pub limiter: Arc<RateLimiter>,
    pub concurrency: usize,
    pub poll_interval: Duration,
}

struct WorkerInner {
    id: WorkerId,
    store: Arc<dyn TaskStore>,
    processors: Arc<Processors>,
    decider: Arc<dyn Decider>,
    projector: Option<Arc<CanvasProjector>>,
    clock: Arc<dyn Clock>,
    limiter: Arc<RateLimiter>,
    slots: Arc<Semaphore>,
    concurrency: usize,
    poll_interval: Duration,
    running: AtomicBool,
}

/// Handle of the running poll loop.
/// - sending `true` on `stop_tx` (or dropping it) ends the loop
/// - `handle` resolves once the loop has exited
struct LoopControl {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct Worker {
    inner: Arc<WorkerInner>,
    control: Mutex<Option<LoopControl>>,
}

impl Worker {
    pub(crate) fn new(parts: WorkerParts) -> Self {
        let inner = WorkerInner {
            id: parts.id,
            store: parts.store,
            processors: Arc::new(parts.processors),
            decider: parts.decider,
            projector: parts.projector.map(Arc::new),
            clock: parts.clock,
            limiter: parts.limiter,
            slots: Arc::new(Semaphore::new(parts.concurrency)),
            concurrency: parts.concurrency,
            poll_interval: parts.poll_interval,
            running: AtomicBool::new(false),
        };
        Self {
            inner: Arc::new(inner),
            control: Mutex::new(None),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.inner.id
    }

    /// Spawn the poll loop on the current tokio runtime. No-op if running.
    pub fn start(&self) {
        let mut control = self.control.lock();
        if self.inner.running.swap(true, Ordering::SeqCst) {
            info!(worker_id = %self.inner.id, "worker already running");
            return;
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(&self.inner).run(stop_rx));
        // a loop from an earlier start has already been told to stop
        *control = Some(LoopControl { stop_tx, handle });
        info!(
            worker_id = %self.inner.id,
            concurrency = self.inner.concurrency,
            rate_limit = self.inner.limiter.rate(),
            "worker started"
        );
    }

    /// Stop claiming new tasks. In-flight tasks are not cancelled.
    pub fn stop(&self) {
        let control = self.control.lock();
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            info!(worker_id = %self.inner.id, "worker not running");
            return;
        }
        if let Some(control) = control.as_ref() {
            // the loop may already be gone; nothing to tell it then
            let _ = control.stop_tx.send(true);
        }
        info!(worker_id = %self.inner.id, in_flight = self.in_flight(), "worker stopping");
    }

    /// Stop, wait for the loop to exit, then wait for every in-flight task.
    pub async fn shutdown(&self) {
        self.stop();
        let control = self.control.lock().take();
        if let Some(control) = control {
            if let Err(e) = control.handle.await {
                error!(worker_id = %self.inner.id, error = %e, "worker loop ended abnormally");
            }
        }
        let all = u32::try_from(self.inner.concurrency).unwrap_or(u32::MAX);
        // every slot back means nothing is in flight
        if let Ok(permits) = self.inner.slots.acquire_many(all).await {
            drop(permits);
        }
        info!(worker_id = %self.inner.id, "worker shut down");
    }

    /// One poll iteration: claim up to the free slots and dispatch.
    ///
    /// Returns how many tasks were dispatched. The loop calls this; tests
    /// and embedders can drive the worker with it directly.
    pub async fn poll_once(&self) -> Result<usize, StoreError> {
        self.inner.poll_once().await
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// The limiter every processor of this worker shares.
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.limiter
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            worker_id: self.inner.id,
            running: self.is_running(),
            in_flight: self.in_flight(),
            concurrency: self.inner.concurrency,
            rate_limit: self.inner.limiter.rate(),
        }
    }
}

impl WorkerInner {
    fn in_flight(&self) -> usize {
        self.concurrency.saturating_sub(self.slots.available_permits())
    }

    async fn run(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        debug!(worker_id = %self.id, "poll loop started");
        loop {
            if *stop_rx.borrow() {
                break;
            }

            let pause = match self.poll_once().await {
                Ok(_) => self.poll_interval,
                Err(e) => {
                    let backoff = self.poll_interval.saturating_mul(2);
                    error!(
                        worker_id = %self.id,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "poll failed; backing off"
                    );
                    backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = stop_rx.changed() => {
                    // sender dropped: the Worker is gone
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!(worker_id = %self.id, "worker loop stopped");
    }

    async fn poll_once(self: &Arc<Self>) -> Result<usize, StoreError> {
        let available = self.slots.available_permits();
        if available == 0 {
            debug!(worker_id = %self.id, "all slots busy; not claiming");
            return Ok(0);
        }

        let claimed = self.store.claim_tasks(self.id, available).await?;
        if claimed.is_empty() {
            debug!(worker_id = %self.id, available, "no pending tasks");
            return Ok(0);
        }
        info!(worker_id = %self.id, claimed = claimed.len(), available, "claimed tasks");

        let mut dispatched = 0;
        for task in claimed {
            match Arc::clone(&self.slots).try_acquire_owned() {
                Ok(permit) => {
                    self.dispatch(task, permit);
                    dispatched += 1;
                }
                Err(_) => self.release_overflow(task).await,
            }
        }
        Ok(dispatched)
    }

    fn dispatch(self: &Arc<Self>, task: Task, permit: OwnedSemaphorePermit) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let _slot = permit;
            inner.settle(task).await;
        });
    }

    /// Hand back a task the store gave us beyond our free slots.
    async fn release_overflow(&self, task: Task) {
        warn!(task_id = %task.id, worker_id = %self.id, "claimed more tasks than free slots; releasing");
        let patch = TaskPatch::requeue(task.retry_count);
        if let Err(e) = self.store.update_task(task.id, patch).await {
            error!(task_id = %task.id, error = %e, "failed to release overflow task");
        }
    }

    async fn settle(&self, task: Task) {
        let started = Instant::now();
        debug!(task_id = %task.id, task_type = %task.task_type, retry_count = task.retry_count, "processing task");

        let outcome = self.run_processor(&task).await;
        let decision = self.decider.decide(&task, outcome, started.elapsed());
        log_decision(&task, &decision);

        if let Decision::Complete(completed) = &decision {
            self.project(&task, &completed.asset).await;
        }

        let patch = decision.into_patch(self.clock.now());
        if let Err(e) = self.store.update_task(task.id, patch).await {
            error!(task_id = %task.id, error = %e, "failed to write task outcome");
        }
    }

    /// Run the processor on its own tokio task so a panic comes back as an
    /// ordinary retryable failure.
    async fn run_processor(&self, task: &Task) -> ProcessOutcome {
        let processors = Arc::clone(&self.processors);
        let attempt = task.clone();
        match tokio::spawn(async move { processors.process(&attempt).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("processor {}", join_failure(e));
                error!(task_id = %task.id, error = %message, "unexpected processor failure");
                ProcessOutcome::Retryable(ProcessError::unexpected(message))
            }
        }
    }

    /// Best effort. Nothing that happens here, a panic included, reaches the
    /// task's outcome.
    async fn project(&self, task: &Task, result: &ResultDescriptor) {
        let Some(shape_id) = &task.shape_id else {
            return;
        };
        let Some(projector) = self.projector.clone() else {
            debug!(task_id = %task.id, "no canvas configured; skipping projection");
            return;
        };
        let (target, descriptor) = (task.clone(), result.clone());
        let projected = tokio::spawn(async move { projector.project(&target, &descriptor).await }).await;
        let projected = match projected {
            Ok(projected) => projected,
            Err(e) => {
                error!(task_id = %task.id, %shape_id, error = %join_failure(e), "canvas projection crashed");
                return;
            }
        };
        match projected {
            Ok(ProjectionOutcome::Applied) => {
                debug!(task_id = %task.id, %shape_id, "result projected onto canvas");
            }
            Ok(ProjectionOutcome::NoCanvas) => {
                warn!(task_id = %task.id, project_id = %task.project_id, "project has no canvas; skipping projection");
            }
            Ok(ProjectionOutcome::ShapeMissing) => {
                warn!(task_id = %task.id, %shape_id, "target shape not found; skipping projection");
            }
            Ok(ProjectionOutcome::UnsupportedShape(kind)) => {
                warn!(task_id = %task.id, %shape_id, kind = %kind, "shape kind cannot show an image; skipping projection");
            }
            Err(e) => {
                warn!(task_id = %task.id, %shape_id, error = %e, "canvas projection failed");
            }
        }
    }
}

fn log_decision(task: &Task, decision: &Decision) {
    match decision {
        Decision::Complete(result) => info!(
            task_id = %task.id,
            asset_id = %result.asset.asset_id,
            processing_time = result.processing_time,
            "task completed"
        ),
        Decision::Requeue { charged: false, reason, .. } => warn!(
            task_id = %task.id,
            retry_count = task.retry_count,
            reason = %reason,
            "rate limited; requeued without charge"
        ),
        Decision::Requeue { retry_count, reason, .. } => warn!(
            task_id = %task.id,
            retry_count,
            max_retries = task.max_retries,
            reason = %reason,
            "task failed; requeued for retry"
        ),
        Decision::Fail(failed) => warn!(
            task_id = %task.id,
            attempts = failed.error_details.attempts,
            error_code = %failed.error_code,
            error = %failed.error,
            "task failed permanently"
        ),
    }
}

fn join_failure(e: JoinError) -> String {
    if e.is_panic() {
        format!("panicked: {}", panic_message(e.into_panic()))
    } else {
        "was cancelled".to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
