//! HTTP transport types and the `Transport` seam.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! client builds `HttpRequest` values and parses `HttpResponse` values; a
//! `Transport` implementation performs the actual round trip. Swapping the
//! transport (reqwest in production, scripted fakes in tests) never touches
//! request building or response normalization.
//!
//! All fields use owned types (`String`, `Vec`) so values can be moved into
//! spawned tasks and across the transport boundary without lifetimes.

use std::fmt;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// GET and DELETE requests never carry a body.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Built by `ApiClient::build_request`. `path` is the base path joined with
/// the call path; it may be relative (`/api/courses`) or absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Status 200–299.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one HTTP round trip.
///
/// Implementations report only transport-level failures as `Err`; any
/// response that arrived, whatever its status, is returned as `Ok`.
/// Dropping the returned future must abandon the request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FetchError>;
}

/// Production transport backed by `reqwest`.
///
/// Relative request paths are resolved against `origin`, the way a browser
/// resolves them against the page origin.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    origin: Option<String>,
}

impl ReqwestTransport {
    /// Transport for absolute request paths only.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            origin: None,
        }
    }

    /// Transport resolving relative paths against `origin`
    /// (for example `http://127.0.0.1:3000`).
    pub fn with_origin(origin: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            origin: Some(origin.trim_end_matches('/').to_string()),
        }
    }

    /// Reuse an existing `reqwest::Client` (connection pool, TLS config).
    pub fn with_client(client: reqwest::Client, origin: Option<&str>) -> Self {
        Self {
            client,
            origin: origin.map(|o| o.trim_end_matches('/').to_string()),
        }
    }

    fn resolve(&self, path: &str) -> Result<String, FetchError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }
        match &self.origin {
            Some(origin) if path.starts_with('/') => Ok(format!("{origin}{path}")),
            Some(origin) => Ok(format!("{origin}/{path}")),
            None => Err(FetchError::NetworkFailure(format!(
                "relative URL without origin: {path}"
            ))),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let url = self.resolve(&request.path)?;
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(network_error)?;
        debug!(%url, status = status.as_u16(), "response received");

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn network_error(err: reqwest::Error) -> FetchError {
    FetchError::NetworkFailure(err.to_string())
}

/// Case-insensitive lookup in a header list.
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Merge `overrides` into `base`. Keys are compared case-insensitively and
/// the override value replaces the base entry in place.
pub fn merge_headers(base: &mut Vec<(String, String)>, overrides: &[(String, String)]) {
    for (name, value) in overrides {
        match base.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(entry) => *entry = (name.clone(), value.clone()),
            None => base.push((name.clone(), value.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn only_post_put_patch_allow_body() {
        assert!(!HttpMethod::Get.allows_body());
        assert!(!HttpMethod::Delete.allows_body());
        assert!(HttpMethod::Post.allows_body());
        assert!(HttpMethod::Put.allows_body());
        assert!(HttpMethod::Patch.allows_body());
    }

    #[test]
    fn merge_replaces_colliding_key_case_insensitively() {
        let mut headers = vec![pair("Content-Type", "application/json")];
        merge_headers(&mut headers, &[pair("content-type", "text/plain")]);
        assert_eq!(headers, vec![pair("content-type", "text/plain")]);
    }

    #[test]
    fn merge_keeps_both_when_keys_differ() {
        let mut headers = vec![pair("Content-Type", "application/json")];
        merge_headers(&mut headers, &[pair("Authorization", "Bearer t")]);
        assert_eq!(headers.len(), 2);
        assert_eq!(find_header(&headers, "content-type"), Some("application/json"));
        assert_eq!(find_header(&headers, "AUTHORIZATION"), Some("Bearer t"));
    }

    #[test]
    fn relative_path_requires_origin() {
        let transport = ReqwestTransport::new();
        assert!(matches!(
            transport.resolve("/api/courses"),
            Err(FetchError::NetworkFailure(_))
        ));
        let transport = ReqwestTransport::with_origin("http://localhost:3000/");
        assert_eq!(
            transport.resolve("/api/courses").unwrap(),
            "http://localhost:3000/api/courses"
        );
        assert_eq!(
            transport.resolve("api/courses").unwrap(),
            "http://localhost:3000/api/courses"
        );
        assert_eq!(
            transport.resolve("https://example.com/x").unwrap(),
            "https://example.com/x"
        );
    }

    #[test]
    fn success_range() {
        let mut response = HttpResponse {
            status: 204,
            status_text: "No Content".to_string(),
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(response.is_success());
        response.status = 300;
        assert!(!response.is_success());
        response.status = 199;
        assert!(!response.is_success());
    }
}
