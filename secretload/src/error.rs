use thiserror::Error;

/// Invalid input detected while building a [`crate::config::StressConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("parallelism must be at least 1")]
    ZeroParallelism,

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} '{value}' must not contain '/'")]
    PathSeparator { field: &'static str, value: String },

    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Run-level failures of [`crate::executor::Stressor::stress`].
///
/// Failures of individual remote operations are never surfaced here; they are only
/// counted by the [`crate::aggregate::OutcomeAggregator`].
#[derive(Error, Debug)]
pub enum StressError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize worker pool: {0}")]
    PoolInit(String),

    #[error("failed to submit task to worker pool: {0}")]
    Submission(String),
}

/// Failure of one secret access, including client construction.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("failed to create secret manager client: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("secret manager returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}
