//! Boundary with the tracking service's HTTP API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::session::Credential;

pub mod http;

pub use http::HttpTransport;

/// Typed transport failure. `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// Non-2xx response. `message` is the body's `detail`, else the reason phrase.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    /// The body was JSON but not the shape the caller expected.
    #[error("unexpected response from {path}: {message}")]
    Decode { path: String, message: String },
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Performs one GET against the service, attaching the credential.
///
/// `Ok(None)` is a null result: no content, an empty body, or a body that
/// is not JSON.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(
        &self,
        path: &str,
        credential: Option<&Credential>,
    ) -> Result<Option<Value>, TransportError>;
}


/// GET `path` and decode the body as `R`. A null result decodes as `R::default()`.
pub async fn fetch_json<T, R>(
    transport: &T,
    path: &str,
    credential: &Credential,
) -> Result<R, TransportError>
where
    T: Transport + ?Sized,
    R: DeserializeOwned + Default,
{
    match transport.get_json(path, Some(credential)).await? {
        None => Ok(R::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| TransportError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        }),
    }
}
