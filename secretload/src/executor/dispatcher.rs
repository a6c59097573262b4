use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{BoundedPool, Pool, Stressor};
use crate::{
    accessor::SecretAccessor,
    aggregate::{AggregatedMetrics, OutcomeAggregator},
    config::StressConfig,
    error::StressError,
    report::{Reporter, StressReport},
    task::SecretTask,
};

/// Lifecycle of a [`Dispatcher`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    Idle,
    Running,
    Draining,
    Completed,
}

/// The built-in [`Stressor`]: feeds [`SecretTask`]s into a bounded pool until cancelled.
///
/// See the [module docs](super) for the submission and cancellation protocol. A run
/// consumes the dispatcher; take a [`subscribe`](Self::subscribe) receiver first to
/// follow its [`RunState`].
pub struct Dispatcher<S, R> {
    accessor: Arc<S>,
    reporter: R,
    state: watch::Sender<RunState>,
}

impl<S, R> Dispatcher<S, R>
where
    S: SecretAccessor,
    R: Reporter,
{
    pub fn new(accessor: S, reporter: R) -> Self {
        Self {
            accessor: Arc::new(accessor),
            reporter,
            state: watch::channel(RunState::Idle).0,
        }
    }

    /// Watch the lifecycle of the run this dispatcher will perform.
    ///
    /// The receiver keeps the last state after the run returned.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    fn advance(&self, next: RunState) {
        let prev = self.state.send_replace(next);
        debug_assert!(next > prev, "{prev:?} -> {next:?}");
        tracing::debug!(from = ?prev, to = ?next, "dispatcher state change");
    }

    /// Run against a caller-supplied pool instead of a [`BoundedPool`].
    ///
    /// The pool's capacity is the concurrency bound of the run; `config.parallelism()`
    /// is only used for logging here.
    pub async fn stress_with_pool<P: Pool>(
        self,
        mut pool: P,
        cancel: CancellationToken,
        config: &StressConfig,
    ) -> Result<AggregatedMetrics, StressError> {
        let aggregator = Arc::new(OutcomeAggregator::new());
        let task = SecretTask::new(
            Arc::clone(&self.accessor),
            config.target(),
            Arc::clone(&aggregator),
        );

        self.advance(RunState::Running);
        tracing::info!(
            parallelism = config.parallelism().get(),
            target = config.target(),
            "Starting stress test"
        );

        let mut submitted: u64 = 0;
        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Ok(()),
                slot = pool.reserve() => {
                    let submit = slot.and_then(|slot| pool.submit(slot, task.clone().run()));
                    match submit {
                        Ok(()) => submitted += 1,
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        self.advance(RunState::Draining);
        tracing::info!(
            submitted,
            in_flight = pool.in_flight(),
            "Waiting for all tasks to finish"
        );
        let drained = pool.drain().await;
        if drained.panicked > 0 {
            tracing::warn!(panicked = drained.panicked, "Some tasks panicked");
        }
        self.advance(RunState::Completed);

        if let Err(e) = outcome {
            tracing::error!(error = %e, submitted, "Stress test aborted");
            return Err(e);
        }

        let metrics = aggregator.snapshot();
        let report = StressReport::from(metrics);
        if let Err(e) = self.reporter.report(&report).await {
            tracing::warn!(error = %e, "Failed to report stress test results");
        }
        Ok(metrics)
    }
}

impl<S, R> Stressor for Dispatcher<S, R>
where
    S: SecretAccessor,
    R: Reporter,
{
    async fn stress(
        self,
        cancel: CancellationToken,
        config: &StressConfig,
    ) -> Result<AggregatedMetrics, StressError> {
        let pool = BoundedPool::new(config.parallelism())?;
        self.stress_with_pool(pool, cancel, config).await
    }
}
