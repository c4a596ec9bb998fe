//! In-memory [`ApiClient`](crate::ApiClient) for tests.
//!
//! Routes are keyed by `"METHOD path"`. Each route holds a FIFO queue of
//! canned results; the last entry is sticky so a route configured once
//! answers every call, but an entry that has been served is never
//! replayed once a newer one is queued behind it. Unrouted paths answer
//! HTTP 404, which is exactly what the endpoint fallback chains need to
//! step to their next variant.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::{ApiClient, ClientError};

type CannedResult = Result<Value, u16>;

#[derive(Debug, Default)]
struct Route {
    responses: Vec<CannedResult>,
    served: usize,
}

/// Scripted in-memory API client.
#[derive(Debug, Default)]
pub struct MockApiClient {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
}

impl MockApiClient {
    /// Creates an empty mock; every call answers 404.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `method path` to answer `value` with HTTP 200.
    pub fn on(&self, method: &str, path: &str, value: Value) -> &Self {
        self.push(method, path, Ok(value));
        self
    }

    /// Configures `method path` to answer the given HTTP error status.
    pub fn on_status(&self, method: &str, path: &str, status: u16) -> &Self {
        self.push(method, path, Err(status));
        self
    }

    /// Returns every call made so far, as `"METHOD path"` strings in
    /// issue order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns how many calls matched `method path`.
    #[must_use]
    pub fn call_count(&self, method: &str, path: &str) -> usize {
        let key = Self::key(method, path);
        self.calls.lock().unwrap().iter().filter(|c| **c == key).count()
    }

    fn key(method: &str, path: &str) -> String {
        format!("{} {path}", method.to_ascii_uppercase())
    }

    fn push(&self, method: &str, path: &str, result: CannedResult) {
        self.routes
            .lock()
            .unwrap()
            .entry(Self::key(method, path))
            .or_default()
            .responses
            .push(result);
    }

    fn answer(&self, method: &str, path: &str) -> Result<Value, ClientError> {
        let key = Self::key(method, path);
        self.calls.lock().unwrap().push(key.clone());

        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes.get_mut(&key) else {
            return Err(ClientError::Status {
                status: 404,
                path: path.to_string(),
            });
        };

        // Already-served entries are consumed for good; only the last
        // entry is sticky, so a response queued after earlier ones were
        // served supersedes them.
        let index = route.served.min(route.responses.len() - 1);
        route.served += 1;

        route.responses[index]
            .clone()
            .map_err(|status| ClientError::Status {
                status,
                path: path.to_string(),
            })
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.answer("GET", path)
    }

    async fn post(&self, path: &str, _body: &Value) -> Result<Value, ClientError> {
        self.answer("POST", path)
    }

    async fn patch(&self, path: &str, _body: &Value) -> Result<Value, ClientError> {
        self.answer("PATCH", path)
    }

    async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        self.answer("DELETE", path)
    }
}
