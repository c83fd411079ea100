//! Error types for the fetch layer.
//!
//! # Design
//! Every failure a request can meet is normalized into `FetchError` at the
//! client boundary. The variant tells callers what went wrong (timeout,
//! HTTP status, network, parse) while `message()` keeps the human-readable
//! text a dashboard shows to the learner.

use std::time::Duration;

use thiserror::Error;

/// Errors carried by a failed `Envelope`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request did not complete within its timeout.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The request was cancelled by its owner before completing.
    #[error("request was cancelled")]
    Cancelled,

    /// The server answered with a status outside 200–299. `message` is the
    /// server's `{message}` or a synthesized `Error <status>: <statusText>`.
    #[error("{message}")]
    HttpStatus { status: u16, message: String },

    /// The request never produced a response (connection refused, DNS, reset).
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// A successful response carried a body that is not the expected JSON.
    #[error("failed to parse response: {0}")]
    ParseFailure(String),

    /// The request body could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(String),
}

/// Discriminant of `FetchError` without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    Cancelled,
    HttpStatus(u16),
    NetworkFailure,
    ParseFailure,
    Serialization,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Timeout(_) => ErrorKind::Timeout,
            FetchError::Cancelled => ErrorKind::Cancelled,
            FetchError::HttpStatus { status, .. } => ErrorKind::HttpStatus(*status),
            FetchError::NetworkFailure(_) => ErrorKind::NetworkFailure,
            FetchError::ParseFailure(_) => ErrorKind::ParseFailure,
            FetchError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Human-readable description for display.
    pub fn message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            "Unknown error occurred".to_string()
        } else {
            message
        }
    }

    /// HTTP status code, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_displays_only_the_message() {
        let err = FetchError::HttpStatus {
            status: 404,
            message: "Not found".to_string(),
        };
        assert_eq!(err.message(), "Not found");
        assert_eq!(err.kind(), ErrorKind::HttpStatus(404));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn empty_message_falls_back_to_unknown() {
        let err = FetchError::HttpStatus {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.message(), "Unknown error occurred");
    }

    #[test]
    fn timeout_is_distinguishable_from_cancel() {
        let timeout = FetchError::Timeout(Duration::from_millis(250));
        assert!(timeout.is_timeout());
        assert_eq!(timeout.message(), "request timed out after 250ms");
        assert_ne!(timeout.kind(), FetchError::Cancelled.kind());
    }
}
