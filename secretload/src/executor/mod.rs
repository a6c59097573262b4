//! Executor — bounded dispatch of stress tasks and its cancellation protocol
//!
//! A stress run is driven by a [`Stressor`]. The built-in [`Dispatcher`] repeatedly
//! submits the same [`crate::task::SecretTask`] to a bounded [`Pool`] until the run's
//! cancellation token fires, then drains the pool and reports the aggregated outcome.
//!
//! # High-level flow
//! 1. A [`BoundedPool`] is built with room for `parallelism` tasks. Building it fails
//!    when the capacity cannot be represented or there is no Tokio runtime to spawn on.
//! 2. The submission loop runs. Each iteration makes one choice between two events:
//!    - the cancellation token fired: stop submitting,
//!    - the pool has a free slot: submit one more task into it.
//!
//!    The choice is `biased` towards cancellation, so when both are ready the loop
//!    stops. While the pool is full the loop waits for whichever happens first; a full
//!    pool never delays the reaction to cancellation.
//! 3. Draining: every task already submitted runs to completion. Tasks are never
//!    interrupted.
//! 4. The aggregator snapshot is read, turned into a report, handed to the reporter
//!    and returned.
//!
//! # Backpressure
//! Capacity is the only throttle. The pool does not queue: a slot must be reserved
//! before a task can be submitted, and the slot is released when the task finishes.
//! Total attempts are unbounded, concurrent attempts never exceed `parallelism`.
//!
//! # Errors
//! Only pool construction and submission can fail a run (see
//! [`crate::error::StressError`]). Failed remote operations are counted and otherwise
//! ignored. A submission error stops the loop, but in-flight tasks are still drained
//! before the error is returned.
pub mod dispatcher;
pub mod pool;

pub use dispatcher::{Dispatcher, RunState};
pub use pool::{BoundedPool, DrainStats};

use crate::{aggregate::AggregatedMetrics, config::StressConfig, error::StressError};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Runs one stress test until `cancel` fires.
///
/// `stress` consumes the stressor: an instance services exactly one run.
pub trait Stressor
where
    Self: Sized,
{
    fn stress(
        self,
        cancel: CancellationToken,
        config: &StressConfig,
    ) -> impl Future<Output = Result<AggregatedMetrics, StressError>>;
}

/// A worker pool with a fixed number of execution slots.
///
/// Submitting is a two-step protocol: [`reserve`](Pool::reserve) waits for a free slot,
/// [`submit`](Pool::submit) starts a task that holds the slot until it finishes.
/// Splitting the two lets the caller race the wait against cancellation without ever
/// dropping a task that was already handed over.
pub trait Pool
where
    Self: Send,
{
    /// Proof of a free slot. Dropping it gives the slot back.
    type Slot: Send + 'static;

    /// Wait until a slot is free.
    ///
    /// Must be cancel safe: dropping the future before it completes loses nothing.
    fn reserve(&mut self) -> impl Future<Output = Result<Self::Slot, StressError>> + Send;

    /// Start `task` in the reserved slot.
    fn submit<T>(&mut self, slot: Self::Slot, task: T) -> Result<(), StressError>
    where
        T: Future<Output = ()> + Send + 'static;

    /// Submitted tasks that are still running.
    fn in_flight(&self) -> usize;

    /// Wait for every submitted task to finish.
    fn drain(&mut self) -> impl Future<Output = DrainStats> + Send;
}
