use std::{sync::Arc, time::Instant};

use crate::{
    accessor::{SecretAccessor, SecretClient},
    aggregate::OutcomeAggregator,
};

/// The unit of work a stress run repeats: open a client, read the target secret once,
/// record the outcome.
///
/// A `SecretTask` is a cheap template; the dispatcher clones it once per submission.
/// Running it always records exactly one attempt, at most one failure and exactly one
/// duration, whatever happens in between.
pub struct SecretTask<S> {
    accessor: Arc<S>,
    target: Arc<str>,
    aggregator: Arc<OutcomeAggregator>,
}

impl<S> Clone for SecretTask<S> {
    fn clone(&self) -> Self {
        Self {
            accessor: Arc::clone(&self.accessor),
            target: Arc::clone(&self.target),
            aggregator: Arc::clone(&self.aggregator),
        }
    }
}

impl<S: SecretAccessor> SecretTask<S> {
    pub fn new(accessor: Arc<S>, target: &str, aggregator: Arc<OutcomeAggregator>) -> Self {
        Self {
            accessor,
            target: Arc::from(target),
            aggregator,
        }
    }

    pub async fn run(self) {
        // Declared before the client so the client is released inside the timed span.
        let mut attempt = Attempt::begin(&self.aggregator);

        let client = match self.accessor.connect().await {
            Ok(client) => client,
            Err(e) => {
                attempt.fail();
                tracing::debug!(error = %e, "failed to create secret manager client");
                return;
            }
        };

        if let Err(e) = client.access_secret_version(&self.target).await {
            attempt.fail();
            tracing::debug!(error = %e, target = %self.target, "failed to access secret");
        }
    }
}

/// Bookkeeping for one task: counts the attempt on creation and the elapsed time on drop.
///
/// A task that unwinds before recording a failure is counted as failed here, so a panic
/// can never leave an attempt without an outcome or record a second failure.
struct Attempt<'a> {
    start: Instant,
    aggregator: &'a OutcomeAggregator,
    failed: bool,
}

impl<'a> Attempt<'a> {
    fn begin(aggregator: &'a OutcomeAggregator) -> Self {
        aggregator.record_attempt();
        Self {
            start: Instant::now(),
            aggregator,
            failed: false,
        }
    }

    fn fail(&mut self) {
        if !self.failed {
            self.failed = true;
            self.aggregator.record_failure();
        }
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.fail();
        }
        self.aggregator.record_duration(self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{accessor::SecretPayload, error::AccessError};
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    #[derive(Default)]
    struct Fixed {
        refuse_connect: bool,
        deny_access: bool,
        panic_on_release: bool,
        released: Arc<AtomicUsize>,
    }

    struct FixedClient {
        deny_access: bool,
        panic_on_release: bool,
        released: Arc<AtomicUsize>,
    }

    impl Drop for FixedClient {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
            if self.panic_on_release {
                panic!("client release failed");
            }
        }
    }

    impl SecretAccessor for Fixed {
        type Client = FixedClient;

        async fn connect(&self) -> Result<FixedClient, AccessError> {
            if self.refuse_connect {
                return Err(AccessError::Connect("refused".into()));
            }
            Ok(FixedClient {
                deny_access: self.deny_access,
                panic_on_release: self.panic_on_release,
                released: Arc::clone(&self.released),
            })
        }
    }

    impl SecretClient for FixedClient {
        async fn access_secret_version(&self, name: &str) -> Result<SecretPayload, AccessError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if self.deny_access {
                return Err(AccessError::Status {
                    status: reqwest::StatusCode::FORBIDDEN,
                    body: "permission denied".into(),
                });
            }
            Ok(SecretPayload {
                name: name.to_owned(),
                data: String::new(),
            })
        }
    }

    #[derive(Debug, PartialEq)]
    struct Observed {
        attempted: u64,
        failed: u64,
        timed: bool,
        released: usize,
        panicked: bool,
    }

    /// Run one task on its own Tokio task so panics are caught like in a pool.
    async fn run_once(accessor: Fixed) -> Observed {
        let released = Arc::clone(&accessor.released);
        let agg = Arc::new(OutcomeAggregator::new());
        let task = SecretTask::new(
            Arc::new(accessor),
            "projects/p/secrets/s/versions/latest",
            Arc::clone(&agg),
        );
        let joined = tokio::spawn(task.run()).await;

        let snap = agg.snapshot();
        Observed {
            attempted: snap.attempted,
            failed: snap.failed,
            timed: !snap.total_duration.is_zero(),
            released: released.load(Ordering::SeqCst),
            panicked: joined.is_err_and(|e| e.is_panic()),
        }
    }

    #[tokio::test]
    async fn success_records_attempt_and_duration() {
        let view = run_once(Fixed::default()).await;
        assert_eq!(
            view,
            Observed {
                attempted: 1,
                failed: 0,
                timed: true,
                released: 1,
                panicked: false,
            }
        );
    }

    #[tokio::test]
    async fn failed_access_releases_client() {
        let view = run_once(Fixed {
            deny_access: true,
            ..Default::default()
        })
        .await;
        assert_eq!(
            view,
            Observed {
                attempted: 1,
                failed: 1,
                timed: true,
                released: 1,
                panicked: false,
            }
        );
    }

    #[tokio::test]
    async fn failed_connect_counts_once() {
        let view = run_once(Fixed {
            refuse_connect: true,
            ..Default::default()
        })
        .await;
        assert_eq!(view.attempted, 1);
        assert_eq!(view.failed, 1);
        assert_eq!(view.released, 0);
        assert!(!view.panicked);
    }

    #[tokio::test]
    async fn panic_during_release_counts_as_failure() {
        let view = run_once(Fixed {
            panic_on_release: true,
            ..Default::default()
        })
        .await;
        assert_eq!(
            view,
            Observed {
                attempted: 1,
                failed: 1,
                timed: true,
                released: 1,
                panicked: true,
            }
        );
    }

    #[tokio::test]
    async fn panic_after_failed_access_is_not_counted_twice() {
        let view = run_once(Fixed {
            deny_access: true,
            panic_on_release: true,
            ..Default::default()
        })
        .await;
        assert_eq!(view.attempted, 1);
        assert_eq!(view.failed, 1);
        assert!(view.timed);
        assert!(view.panicked);
    }
}
