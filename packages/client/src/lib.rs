#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Generic JSON-over-HTTP capability consumed by the sync engine.
//!
//! The engine never talks to `reqwest` directly; everything goes through
//! the [`ApiClient`] trait so the catalog, geocoder, and coordinator can be
//! exercised against [`mock::MockApiClient`] in tests. The real
//! implementation attaches the session token it was constructed with and
//! does nothing else clever — fallback and reconciliation behavior belongs
//! to the callers, not the transport.

pub mod mock;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors from the HTTP capability.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {path}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request path that produced the status.
        path: String,
    },

    /// The response body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Returns the HTTP status code, if this error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(_) | Self::Json(_) => None,
        }
    }
}

/// A generic `GET/POST/PATCH/DELETE(path, body?) -> JSON` capability.
///
/// Paths are relative to the client's base URL (e.g., `"/locations"`).
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Issues a GET request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure, a non-success status,
    /// or an unparseable body.
    async fn get(&self, path: &str) -> Result<Value, ClientError>;

    /// Issues a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure, a non-success status,
    /// or an unparseable body.
    async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError>;

    /// Issues a PATCH request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure, a non-success status,
    /// or an unparseable body.
    async fn patch(&self, path: &str, body: &Value) -> Result<Value, ClientError>;

    /// Issues a DELETE request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure, a non-success status,
    /// or an unparseable body.
    async fn delete(&self, path: &str) -> Result<Value, ClientError>;
}

/// Reqwest-backed [`ApiClient`] that attaches a bearer session token.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl HttpApiClient {
    /// Creates a client for `base_url`, optionally carrying a session
    /// token to attach as a bearer header on every request.
    #[must_use]
    pub fn new(base_url: impl Into<String>, session_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            session_token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url.trim_end_matches('/'));
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.session_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<Value, ClientError> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            log::warn!("HTTP {status} from {path}");
            return Err(ClientError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        // Read as text first so an empty 204-style body maps to null
        // instead of a JSON parse error.
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.send(self.request(reqwest::Method::GET, path), path).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.send(self.request(reqwest::Method::POST, path).json(body), path)
            .await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.send(self.request(reqwest::Method::PATCH, path).json(body), path)
            .await
    }

    async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        self.send(self.request(reqwest::Method::DELETE, path), path)
            .await
    }
}
