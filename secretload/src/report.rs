use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::aggregate::AggregatedMetrics;

/// Final statistics of a stress run, derived from an [`AggregatedMetrics`] snapshot.
///
/// Reports are pure data: building one performs no I/O, and all derived numbers
/// (average duration, error ratio) are computed here rather than in the aggregator.
/// Hand one to a [`Reporter`] to display or export it.
///
/// When no task was attempted there is nothing to average, so
/// `average_duration_ms` and `error_ratio` are `None` instead of a division by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressReport {
    pub attempted: u64,
    pub failed: u64,
    pub succeeded: u64,
    /// Sum of the durations of all tasks, in milliseconds.
    pub total_duration_ms: u64,
    /// Mean task duration in milliseconds, rounded to two decimals.
    pub average_duration_ms: Option<f64>,
    /// Failed attempts over all attempts, in `[0.0, 1.0]`.
    pub error_ratio: Option<f64>,
}

impl From<AggregatedMetrics> for StressReport {
    fn from(value: AggregatedMetrics) -> Self {
        let (average_duration_ms, error_ratio) = if value.attempted == 0 {
            (None, None)
        } else {
            let average = value.total_duration.as_secs_f64() * 1_000.0 / value.attempted as f64;
            (
                Some(round_to_hundredths(average)),
                Some(value.failed as f64 / value.attempted as f64),
            )
        };

        Self {
            attempted: value.attempted,
            failed: value.failed,
            succeeded: value.succeeded(),
            total_duration_ms: u64::try_from(value.total_duration.as_millis()).unwrap_or(u64::MAX),
            average_duration_ms,
            error_ratio,
        }
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A [`Reporter`] consumes a [`StressReport`] and performs side effects: logging it,
/// printing it, or sending it somewhere.
///
/// Reporters are the I/O boundary of a run. A failing reporter never turns a
/// completed run into a failed one; the dispatcher only logs the error.
///
/// # Example
/// ```rust
/// use secretload::report::{Reporter, StressReport};
///
/// struct Stdout;
///
/// impl Reporter for Stdout {
///     async fn report(
///         &self,
///         report: &StressReport,
///     ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///         println!("{report:?}");
///         Ok(())
///     }
/// }
/// ```
pub trait Reporter
where
    Self: Send + Sync,
{
    fn report(
        &self,
        report: &StressReport,
    ) -> impl Future<Output = Result<(), Box<dyn std::error::Error + Send + Sync>>> + Send;
}

/// Emits the report as one structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    async fn report(
        &self,
        report: &StressReport,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match report.average_duration_ms {
            Some(average) => tracing::info!(
                count = report.attempted,
                error_count = report.failed,
                duration_ms = report.total_duration_ms,
                average_duration_ms = average,
                "stress test completed"
            ),
            None => tracing::info!(
                count = report.attempted,
                error_count = report.failed,
                duration_ms = report.total_duration_ms,
                average_duration_ms = "no data",
                "stress test completed"
            ),
        }
        Ok(())
    }
}

/// Prints the report as pretty JSON on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReporter;

impl Reporter for JsonReporter {
    async fn report(
        &self,
        report: &StressReport,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let value = serde_json::to_string_pretty(report)?;
        println!("{value}");
        Ok(())
    }
}

/// Lets the binary pick a reporter at runtime.
#[derive(Debug, Clone, Copy)]
pub enum AnyReporter {
    Tracing(TracingReporter),
    Json(JsonReporter),
}

impl Reporter for AnyReporter {
    async fn report(
        &self,
        report: &StressReport,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match self {
            AnyReporter::Tracing(r) => r.report(report).await,
            AnyReporter::Json(r) => r.report(report).await,
        }
    }
}
