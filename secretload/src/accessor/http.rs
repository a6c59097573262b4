use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

use super::{SecretAccessor, SecretClient, SecretPayload};
use crate::{config::StressConfig, error::AccessError};

/// [`SecretAccessor`] for the Secret Manager REST API.
///
/// Each call to [`connect`](SecretAccessor::connect) builds a brand new
/// [`reqwest::Client`] with idle pooling disabled, so every task opens and tears down
/// its own connection. A read is `GET {endpoint}/v1/{name}:access`, authenticated with
/// the configured bearer token if there is one.
#[derive(Debug, Clone)]
pub struct HttpSecretAccessor {
    endpoint: Url,
    access_token: Option<String>,
    timeout: Duration,
}

impl HttpSecretAccessor {
    pub fn new(endpoint: Url, access_token: Option<String>, timeout: Duration) -> Self {
        Self {
            endpoint,
            access_token,
            timeout,
        }
    }

    pub fn from_config(config: &StressConfig) -> Self {
        Self::new(
            config.endpoint().clone(),
            config.access_token().map(str::to_owned),
            config.timeout(),
        )
    }
}

impl SecretAccessor for HttpSecretAccessor {
    type Client = HttpSecretClient;

    async fn connect(&self) -> Result<Self::Client, AccessError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| AccessError::Connect(e.to_string()))?;

        Ok(HttpSecretClient {
            client,
            base: self.endpoint.as_str().trim_end_matches('/').to_owned(),
            access_token: self.access_token.clone(),
        })
    }
}

/// Single-use client produced by [`HttpSecretAccessor`].
#[derive(Debug)]
pub struct HttpSecretClient {
    client: Client,
    base: String,
    access_token: Option<String>,
}

impl HttpSecretClient {
    fn access_url(&self, name: &str) -> String {
        format!("{}/v1/{name}:access", self.base)
    }
}

impl SecretClient for HttpSecretClient {
    async fn access_secret_version(&self, name: &str) -> Result<SecretPayload, AccessError> {
        let mut request = self.client.get(self.access_url(name));
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(AccessError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let decoded: AccessSecretVersionResponse = serde_json::from_slice(&body)?;
        Ok(SecretPayload {
            name: decoded.name,
            data: decoded.payload.map(|p| p.data).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AccessSecretVersionResponse {
    #[serde(default)]
    name: String,
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    data: String,
}
