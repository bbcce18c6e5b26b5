//! HttpTransport - real transport using reqwest.
//!
//! Sends requests to the repository REST API over HTTPS (rustls).

use super::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

/// Default `User-Agent`; the hosted API rejects requests without one.
pub const USER_AGENT: &str = concat!("markit-sync/", env!("CARGO_PKG_VERSION"));

/// Configuration for HttpTransport.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Base URL that endpoints are appended to.
    pub api_base: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl HttpTransportConfig {
    /// Configuration for the given API base with default timeouts.
    pub fn new(api_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::ConnectionFailed(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::ReceiveFailed(e.to_string())
        } else {
            TransportError::RequestFailed(e.to_string())
        }
    }
}

/// HttpTransport implements the Transport trait with a pooled reqwest client.
///
/// # Example
///
/// ```ignore
/// let transport = HttpTransport::new(HttpTransportConfig::new("https://api.github.com"))?;
/// let response = transport.execute(ApiRequest::get("/user")).await?;
/// ```
pub struct HttpTransport {
    http: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    /// Create a new HttpTransport.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let base = Url::parse(&config.api_base).map_err(|e| {
            TransportError::RequestFailed(format!("invalid API base {}: {e}", config.api_base))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http, base })
    }

    /// Resolve an endpoint against the API base.
    ///
    /// Each path segment is percent-encoded on its own, so file names with
    /// spaces, `#`, `?` or non-ASCII characters stay inside their segment.
    pub fn url_for(&self, endpoint: &str) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                TransportError::RequestFailed(format!("API base {} cannot hold a path", self.base))
            })?;
            segments
                .pop_if_empty()
                .extend(endpoint.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.endpoint)?;
        let mut builder = match request.method {
            Method::Get => self.http.get(url),
            Method::Put => self.http.put(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        tracing::debug!("{} {} -> {}", request.method, request.endpoint, status);
        Ok(ApiResponse::new(status, body))
    }
}
