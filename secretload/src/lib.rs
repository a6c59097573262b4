//! secretload — a concurrent stress harness for secret manager reads.
//!
//! secretload hammers a single remote operation, reading the latest version of one
//! secret, with a fixed number of concurrent tasks for as long as it is allowed to
//! run. When the run is cancelled it waits for in-flight reads, then reports how many
//! attempts were made, how many failed, and how long they took.
//!
//! # Architecture
//!
//! The main building blocks are:
//!
//! - [`StressConfig`]: validated inputs of a run, built from [`config::StressOptions`].
//! - [`Stressor`]: runs a stress test until cancelled. The built-in [`Dispatcher`]
//!   feeds tasks into a bounded pool and owns the cancellation protocol.
//! - [`SecretAccessor`]: the remote operation. Each task opens its own client, reads
//!   the secret once and drops the client. [`HttpSecretAccessor`] targets the Secret
//!   Manager REST API.
//! - [`OutcomeAggregator`]: lock-free counters shared by all tasks.
//! - [`StressReport`]: derived statistics (average duration, error ratio).
//! - [`Reporter`]: sends a report somewhere (tracing event, JSON on stdout).
//!
//! # Example
//!
//! ```rust,no_run
//! use secretload::{
//!     Dispatcher, HttpSecretAccessor, Stressor, config::StressOptions,
//!     report::TracingReporter,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StressOptions::builder()
//!         .parallelism(8)
//!         .project("my-project")
//!         .secret("api-key")
//!         .build()
//!         .into_config()?;
//!
//!     let cancel = CancellationToken::new();
//!     let trigger = cancel.clone();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!         trigger.cancel();
//!     });
//!
//!     let metrics = Dispatcher::new(HttpSecretAccessor::from_config(&config), TracingReporter)
//!         .stress(cancel, &config)
//!         .await?;
//!     println!("{} attempts, {} failed", metrics.attempted, metrics.failed);
//!     Ok(())
//! }
//! ```

/// The remote operation under test
pub mod accessor;
/// Lock-free outcome counters
pub mod aggregate;
/// Run configuration and validation
pub mod config;
/// Error types
pub mod error;
/// Bounded dispatch and cancellation
pub mod executor;
/// Reports and Reporters
pub mod report;
/// The unit of work of a stress run
pub mod task;

pub use accessor::{HttpSecretAccessor, SecretAccessor, SecretClient};
pub use aggregate::{AggregatedMetrics, OutcomeAggregator};
pub use config::StressConfig;
pub use error::{AccessError, ConfigError, StressError};
pub use executor::{Dispatcher, Stressor};
pub use report::{Reporter, StressReport};
