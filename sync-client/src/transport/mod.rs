//! Transport abstraction for markit-sync.
//!
//! This module provides a pluggable transport layer that abstracts the
//! HTTP client used to reach the repository REST API (reqwest, or an
//! in-memory repository for testing).
//!
//! # Design
//!
//! A transport executes one fully-formed [`ApiRequest`] and returns the
//! raw [`ApiResponse`]. A non-2xx status is *not* a transport error: it is
//! returned as a response so the request layer can extract the remote's
//! error message. [`TransportError`] is reserved for failures where no
//! response arrived at all.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.seed_file("notes/a.md", "hello");
//! let response = transport.execute(ApiRequest::get("/repos/o/r/contents/notes/a.md")).await?;
//! ```

mod http;
mod mock;

pub use http::{HttpTransport, HttpTransportConfig};
pub use mock::MockTransport;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed (DNS, refused, TLS).
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The request could not be built or sent.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The response body could not be read.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// PUT
    Put,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Put => f.write_str("PUT"),
        }
    }
}

/// A request ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Endpoint path relative to the API base, starting with `/`.
    pub endpoint: String,
    /// Query string pairs.
    pub query: Vec<(String, String)>,
    /// Header pairs.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// A bare request with no query, headers or body.
    pub fn new(method: Method, endpoint: &str) -> Self {
        Self {
            method,
            endpoint: endpoint.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// A bare GET request.
    pub fn get(endpoint: &str) -> Self {
        Self::new(Method::Get, endpoint)
    }

    /// Value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a header (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as received.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body; `Value::Null` for an empty body, `Value::String`
    /// for a non-JSON body.
    pub body: Value,
}

impl ApiResponse {
    /// Create a response.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// True for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The remote's structured error message, if the body carries one.
    pub fn error_message(&self) -> Option<&str> {
        self.body
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
    }
}

/// Transport trait for executing repository API requests.
///
/// Implementations handle the underlying HTTP mechanism
/// (reqwest, in-memory mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and return the response, whatever its status.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_range() {
        assert!(ApiResponse::new(200, Value::Null).is_success());
        assert!(ApiResponse::new(201, Value::Null).is_success());
        assert!(!ApiResponse::new(304, Value::Null).is_success());
        assert!(!ApiResponse::new(404, Value::Null).is_success());
    }

    #[test]
    fn error_message_extraction() {
        let response = ApiResponse::new(404, json!({"message": "Not Found"}));
        assert_eq!(response.error_message(), Some("Not Found"));

        assert_eq!(ApiResponse::new(500, json!({"message": ""})).error_message(), None);
        assert_eq!(ApiResponse::new(500, json!("oops")).error_message(), None);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut request = ApiRequest::get("/user");
        request
            .headers
            .push(("Authorization".into(), "token abc".into()));
        assert_eq!(request.header("authorization"), Some("token abc"));
        assert_eq!(request.header("accept"), None);
    }
}
