//! HTTP transport for posting observation documents.
//!
//! [`Transport`] is the seam between batching and the network. The client
//! uses [`HttpTransport`] by default; [`RecordingTransport`] keeps requests
//! in memory for dry runs and tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::{debug, instrument};

use observation_common::{ObservationError, ObservationResult};
use observation_protocol::{media_types, ObservationDocument};

use crate::config::ClientConfig;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The service only signals acceptance with 200.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Posts JSON documents to the observations service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url`, sending `api_key` as the `x-api-key` header.
    ///
    /// Returns the response for any HTTP status. Only failures to complete
    /// the request at all are errors.
    async fn post_json(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &ObservationDocument,
    ) -> ObservationResult<TransportResponse>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport using the timeouts from `config`.
    pub fn new(config: &ClientConfig) -> ObservationResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ObservationError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, url, api_key, body), fields(url = %url, items = body.item_count()))]
    async fn post_json(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &ObservationDocument,
    ) -> ObservationResult<TransportResponse> {
        let mut request = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, media_types::JSON)
            .json(body);

        if let Some(key) = api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ObservationError::Transport(format!("POST {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                debug!(status, error = %e, "Failed to read response body");
                String::new()
            }
        };
        debug!(status, "Observation POST completed");

        Ok(TransportResponse::new(status, text))
    }
}

/// A request captured by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub api_key: Option<String>,
    pub body: Value,
}

enum Scripted {
    Status(u16, String),
    Error(String),
}

/// In-memory transport that records every request instead of sending it.
///
/// Responds 200 unless responses have been scripted with
/// [`push_status`](Self::push_status) or [`push_error`](Self::push_error).
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    script: Mutex<VecDeque<Scripted>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next unscripted request with `status`.
    pub fn push_status(&self, status: u16, body: impl Into<String>) {
        self.lock_script().push_back(Scripted::Status(status, body.into()));
    }

    /// Fail the next unscripted request at the transport level.
    pub fn push_error(&self, message: impl Into<String>) {
        self.lock_script().push_back(Scripted::Error(message.into()));
    }

    /// Every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock_requests().clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock_requests().len()
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<RecordedRequest>> {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &ObservationDocument,
    ) -> ObservationResult<TransportResponse> {
        self.lock_requests().push(RecordedRequest {
            url: url.to_string(),
            api_key: api_key.map(str::to_string),
            body: serde_json::to_value(body)?,
        });

        let next = self.lock_script().pop_front();
        match next {
            Some(Scripted::Status(status, body)) => Ok(TransportResponse::new(status, body)),
            Some(Scripted::Error(message)) => Err(ObservationError::Transport(message)),
            None => Ok(TransportResponse::new(200, "")),
        }
    }
}
