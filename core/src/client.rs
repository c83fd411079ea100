//! Request builder, response normalizer and transport driver.
//!
//! # Design
//! `ApiClient` holds only its configuration and a shared `Transport`; it
//! carries no mutable state between calls. Each call is split the same way
//! every time: `build_request` produces an `HttpRequest`, the transport
//! executes it under a timeout and a fresh cancellation token, and
//! `parse_response` turns the `HttpResponse` into typed data or a
//! `FetchError`. The public verbs (`get`, `post`, ...) always return an
//! `Envelope`; no error escapes the client.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::envelope::Envelope;
use crate::error::FetchError;
use crate::http::{merge_headers, HttpMethod, HttpRequest, HttpResponse, Transport};

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Merged over the default headers; the caller wins on collision.
    pub headers: Vec<(String, String)>,
    /// Replaces the client's default timeout.
    pub timeout: Option<Duration>,
    /// Cancelling this token aborts the call. The call observes a child
    /// token, so cancelling one call never affects another.
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Body shape of API error responses.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// JSON API client bound to a base path.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(mut config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let base = config.base_path.trim_end_matches('/');
        config.base_path = if base.is_empty() || base.starts_with('/') || base.contains("://") {
            base.to_string()
        } else {
            format!("/{base}")
        };
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_path(&self) -> &str {
        &self.config.base_path
    }

    /// Builds the wire request for one call. The body is attached only for
    /// POST, PUT and PATCH; `Content-Type: application/json` is always set
    /// and `headers` are merged over it.
    pub fn build_request<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        headers: &[(String, String)],
    ) -> Result<HttpRequest, FetchError>
    where
        B: Serialize + ?Sized,
    {
        let mut merged = vec![("Content-Type".to_string(), "application/json".to_string())];
        merge_headers(&mut merged, &self.config.default_headers);
        merge_headers(&mut merged, headers);

        let body = match body {
            Some(body) if method.allows_body() => Some(serde_json::to_string(body)?),
            Some(_) => {
                warn!(%method, path, "ignoring request body on method without body");
                None
            }
            None => None,
        };

        Ok(HttpRequest {
            method,
            path: self.url(path),
            headers: merged,
            body,
        })
    }

    /// Normalizes a response: 2xx bodies parse as `T` (an empty body parses
    /// as JSON `null`), anything else becomes `FetchError::HttpStatus`.
    pub fn parse_response<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, FetchError> {
        if !response.is_success() {
            return Err(http_error(&response));
        }
        let body = if response.body.trim().is_empty() {
            "null"
        } else {
            response.body.as_str()
        };
        serde_json::from_str(body).map_err(|e| FetchError::ParseFailure(e.to_string()))
    }

    /// Performs one request and returns its envelope.
    pub async fn request<T, B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Envelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = match self.build_request(method, path, body, &options.headers) {
            Ok(request) => request,
            Err(e) => {
                warn!(%method, path, error = %e, "failed to build request");
                return Envelope::failure(e);
            }
        };
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let token = match &options.cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        debug!(%method, path = %request.path, ?timeout, "sending request");
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(FetchError::Cancelled),
            result = tokio::time::timeout(timeout, self.transport.execute(request)) => {
                result.unwrap_or(Err(FetchError::Timeout(timeout)))
            }
        };

        match outcome.and_then(|response| self.parse_response(response)) {
            Ok(data) => Envelope::success(data),
            Err(e) => {
                warn!(%method, path, error = %e, "request failed");
                Envelope::failure(e)
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Envelope<T> {
        self.request(HttpMethod::Get, path, None::<&()>, RequestOptions::default())
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Envelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(HttpMethod::Post, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Envelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(HttpMethod::Put, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Envelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(HttpMethod::Patch, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Envelope<T> {
        self.request(HttpMethod::Delete, path, None::<&()>, RequestOptions::default())
            .await
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.config.base_path)
        } else {
            format!("{}/{path}", self.config.base_path)
        }
    }
}

/// Prefer the server's `{message}`; otherwise synthesize one from the status.
fn http_error(response: &HttpResponse) -> FetchError {
    let message = serde_json::from_str::<ErrorBody>(&response.body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Error {}: {}", response.status, response.status_text));
    FetchError::HttpStatus {
        status: response.status,
        message,
    }
}
