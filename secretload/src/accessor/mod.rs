//! Accessor — the remote operation every stress task performs
//!
//! A stress run exercises exactly one call: reading the latest version of a secret.
//! The call is split in two steps so the dispatcher can account for both of them:
//!
//! 1. [`SecretAccessor::connect`] builds a fresh [`SecretClient`]. Every task gets its
//!    own client, and with it its own connection to the service. Failing here counts as
//!    a failed attempt just like a failed request.
//! 2. [`SecretClient::access_secret_version`] performs the request against the target
//!    identifier of the run.
//!
//! The client is released when it is dropped, which happens on every exit path of the
//! task. An implementation is free to share connections internally, as long as one
//! task still maps to one remote operation.
//!
//! [`HttpSecretAccessor`] talks to the Secret Manager REST API. Tests plug in their own
//! implementations to count calls, inject failures, or stall.
pub mod http;
pub use http::HttpSecretAccessor;

use crate::error::AccessError;
use std::future::Future;

/// Factory for per-task [`SecretClient`]s.
pub trait SecretAccessor
where
    Self: Send + Sync + 'static,
{
    type Client: SecretClient;

    /// Open a new client. Called once per task.
    fn connect(&self) -> impl Future<Output = Result<Self::Client, AccessError>> + Send;
}

/// A connected client able to read one secret version.
pub trait SecretClient
where
    Self: Send + 'static,
{
    /// Read the secret version identified by `name`.
    fn access_secret_version(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<SecretPayload, AccessError>> + Send;
}

/// Opaque result of a successful read. The dispatcher never looks inside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretPayload {
    /// Resource name reported by the service.
    pub name: String,
    /// Payload exactly as returned on the wire (base64 for the REST API).
    pub data: String,
}
