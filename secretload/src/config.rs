use std::{num::NonZeroUsize, time::Duration};

use reqwest::Url;
use typed_builder::TypedBuilder;

use crate::error::ConfigError;

pub const DEFAULT_PARALLELISM: usize = 10;
pub const DEFAULT_PROJECT: &str = "example-project";
pub const DEFAULT_SECRET: &str = "example-secret";
pub const DEFAULT_ENDPOINT: &str = "https://secretmanager.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Compose `projects/<project>/secrets/<secret>/versions/latest`.
pub fn secret_version_path(project: &str, secret: &str) -> String {
    format!("projects/{project}/secrets/{secret}/versions/latest")
}

/// Raw, unvalidated inputs of a stress run.
///
/// Build it with the generated builder (every field has a default) and turn it into a
/// [`StressConfig`] with [`StressOptions::into_config`]:
///
/// ```rust
/// use secretload::config::StressOptions;
///
/// let config = StressOptions::builder()
///     .parallelism(3)
///     .project("my-project")
///     .secret("api-key")
///     .build()
///     .into_config()
///     .unwrap();
///
/// assert_eq!(config.parallelism().get(), 3);
/// assert_eq!(
///     config.target(),
///     "projects/my-project/secrets/api-key/versions/latest"
/// );
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct StressOptions {
    #[builder(default = DEFAULT_PARALLELISM)]
    pub parallelism: usize,
    #[builder(default = DEFAULT_PROJECT.to_owned(), setter(into))]
    pub project: String,
    #[builder(default = DEFAULT_SECRET.to_owned(), setter(into))]
    pub secret: String,
    #[builder(default = DEFAULT_ENDPOINT.to_owned(), setter(into))]
    pub endpoint: String,
    /// Bearer token sent with every request. Requests go out unauthenticated without it.
    #[builder(default, setter(strip_option, into))]
    pub access_token: Option<String>,
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
}

impl Default for StressOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl StressOptions {
    /// Validate the options. No task can run with a config that fails here.
    pub fn into_config(self) -> Result<StressConfig, ConfigError> {
        let parallelism = NonZeroUsize::new(self.parallelism).ok_or(ConfigError::ZeroParallelism)?;
        validate_segment("project", &self.project)?;
        validate_segment("secret", &self.secret)?;
        let endpoint = parse_endpoint(&self.endpoint)?;
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(StressConfig {
            parallelism,
            target: secret_version_path(&self.project, &self.secret),
            endpoint,
            access_token: self.access_token.filter(|t| !t.is_empty()),
            timeout: self.timeout,
        })
    }
}

fn validate_segment(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Empty { field });
    }
    if value.contains('/') {
        return Err(ConfigError::PathSeparator {
            field,
            value: value.to_owned(),
        });
    }
    Ok(())
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_owned(),
        reason,
    };
    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

/// Validated configuration of one stress run.
#[derive(Clone)]
pub struct StressConfig {
    parallelism: NonZeroUsize,
    target: String,
    endpoint: Url,
    access_token: Option<String>,
    timeout: Duration,
}

impl StressConfig {
    /// Maximum number of tasks executing at the same time.
    pub fn parallelism(&self) -> NonZeroUsize {
        self.parallelism
    }

    /// Opaque identifier of the secret version every task reads.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for StressConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StressConfig")
            .field("parallelism", &self.parallelism)
            .field("target", &self.target)
            .field("endpoint", &self.endpoint.as_str())
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = StressOptions::default().into_config().unwrap();
        assert_eq!(config.parallelism().get(), DEFAULT_PARALLELISM);
        assert_eq!(
            config.target(),
            "projects/example-project/secrets/example-secret/versions/latest"
        );
        assert_eq!(config.endpoint().as_str(), "https://secretmanager.googleapis.com/");
        assert_eq!(config.access_token(), None);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn target_path_is_byte_exact() {
        assert_eq!(
            secret_version_path("p-1", "key_2"),
            "projects/p-1/secrets/key_2/versions/latest"
        );
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let err = StressOptions::builder()
            .parallelism(0)
            .build()
            .into_config()
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroParallelism);
    }

    #[test]
    fn empty_segments_are_rejected() {
        let err = StressOptions::builder().project("").build().into_config().unwrap_err();
        assert_eq!(err, ConfigError::Empty { field: "project" });

        let err = StressOptions::builder().secret("").build().into_config().unwrap_err();
        assert_eq!(err, ConfigError::Empty { field: "secret" });
    }

    #[test]
    fn slash_in_secret_is_rejected() {
        let err = StressOptions::builder()
            .secret("a/b")
            .build()
            .into_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::PathSeparator { field: "secret", .. }));
    }

    #[test]
    fn endpoint_must_be_http() {
        let err = StressOptions::builder()
            .endpoint("ftp://example.com")
            .build()
            .into_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));

        let err = StressOptions::builder()
            .endpoint("not a url")
            .build()
            .into_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = StressOptions::builder()
            .timeout(Duration::ZERO)
            .build()
            .into_config()
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroTimeout);
    }

    #[test]
    fn empty_token_is_dropped_and_redacted() {
        let config = StressOptions::builder()
            .access_token("")
            .build()
            .into_config()
            .unwrap();
        assert_eq!(config.access_token(), None);

        let config = StressOptions::builder()
            .access_token("s3cr3t")
            .build()
            .into_config()
            .unwrap();
        assert_eq!(config.access_token(), Some("s3cr3t"));
        assert!(!format!("{config:?}").contains("s3cr3t"));
    }
}
