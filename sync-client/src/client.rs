//! RepoClient - the main interface for markit-sync.
//!
//! This module provides [`RepoClient`], the primary API for applications to
//! read and write documents in a remote repository over its REST API.
//!
//! # Architecture
//!
//! Every call goes through one request layer ([`RepoClient::request`]) that
//! attaches credentials, drives the injected progress reporter, and
//! normalizes every outcome into an [`OpResult`]. File operations, batch
//! orchestration and status aggregation are built on top of it.
//!
//! ```text
//! Application → RepoClient → Transport → REST API
//!                   ↓
//!             ProgressReporter
//! ```
//!
//! # Example
//!
//! ```ignore
//! use markit_sync_client::{RepoClient, RemoteConfig, FileRecord};
//!
//! let config = RemoteConfig::new(&token, "octo", "notes");
//! let client = RepoClient::http(config)?;
//!
//! client.push_file(&FileRecord::new("a.md", "# Hello", "feat: add a")).await?;
//! let files = client.pull_all().await?.data;
//! ```

use std::sync::Arc;

use markit_sync_types::{
    Failure, FailureKind, FileRecord, OpResult, RemoteConfig, RemoteFile, Success,
};
use serde_json::{json, Value};

use crate::codec;
use crate::progress::{NoProgress, ProgressReporter, ProgressScope};
use crate::transport::{
    ApiRequest, HttpTransport, HttpTransportConfig, Method, Transport, TransportError,
};

/// `Accept` header pinning the response schema version.
pub const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";

/// Number of commits requested by [`RepoClient::commits`].
pub const COMMITS_PER_PAGE: u32 = 10;

/// One call through the request layer.
#[derive(Debug, Clone)]
pub struct ApiCall {
    method: Method,
    endpoint: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    progress: String,
    success: String,
    failure: String,
}

impl ApiCall {
    /// A call with generic labels.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            progress: format!("{method} {endpoint}..."),
            success: "Request succeeded".to_string(),
            failure: "Request failed".to_string(),
            method,
            endpoint,
            query: Vec::new(),
            body: None,
        }
    }

    /// A GET call.
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    /// A PUT call.
    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Put, endpoint)
    }

    /// Add a query parameter.
    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the progress line and the success/failure summaries.
    pub fn labels(mut self, progress: impl Into<String>, success: &str, failure: &str) -> Self {
        self.progress = progress.into();
        self.success = success.to_string();
        self.failure = failure.to_string();
        self
    }
}

/// Client for one remote repository.
///
/// Holds only immutable configuration besides the transport and progress
/// reporter, so it is safe to reuse across calls and share between tasks.
/// Concurrent batch operations on one client share one progress session.
pub struct RepoClient<T: Transport> {
    config: RemoteConfig,
    transport: T,
    progress: Arc<dyn ProgressReporter>,
}

impl RepoClient<HttpTransport> {
    /// Create a client that talks to `config.api_base` over HTTPS.
    pub fn http(config: RemoteConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(HttpTransportConfig::new(&config.api_base))?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> RepoClient<T> {
    /// Create a new RepoClient that reports no progress.
    pub fn new(config: RemoteConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            progress: Arc::new(NoProgress),
        }
    }

    /// Report progress through `reporter`.
    pub fn with_progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress = reporter;
        self
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn reporter(&self) -> &dyn ProgressReporter {
        self.progress.as_ref()
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            (
                "Authorization".to_string(),
                format!("token {}", self.config.token),
            ),
            ("Accept".to_string(), ACCEPT_HEADER.to_string()),
        ]
    }

    pub(crate) fn contents_endpoint(&self, path: &str) -> String {
        format!(
            "{}/contents/{}",
            self.config.repo_endpoint(),
            path.trim_start_matches('/')
        )
    }

    /// Issue one authenticated call and normalize its outcome.
    ///
    /// Transport errors and non-2xx statuses become a [`Failure`] whose
    /// `error` is the remote's `message` field when present. The progress
    /// session opened here is released on every exit path. Never retries.
    pub async fn request(&self, call: ApiCall) -> OpResult<Value> {
        let _scope = ProgressScope::begin(self.reporter(), &call.progress);

        let request = ApiRequest {
            method: call.method,
            endpoint: call.endpoint,
            query: call.query,
            headers: self.headers(),
            body: call.body,
        };
        let method = request.method;
        let endpoint = request.endpoint.clone();

        match self.transport.execute(request).await {
            Ok(response) if response.is_success() => Ok(Success::new(call.success, response.body)),
            Ok(response) => {
                let error = response
                    .error_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", response.status));
                tracing::debug!("{} {} failed ({}): {}", method, endpoint, response.status, error);
                Err(Failure::new(
                    FailureKind::from_status(response.status),
                    call.failure,
                    error,
                ))
            }
            Err(e) => {
                tracing::warn!("{} {} transport error: {}", method, endpoint, e);
                Err(Failure::new(FailureKind::Transport, call.failure, e.to_string()))
            }
        }
    }

    /// Verify the token by fetching the authenticated user.
    pub async fn validate_credentials(&self) -> OpResult<Value> {
        self.request(ApiCall::get("/user").labels(
            "Validating GitHub configuration...",
            "GitHub configuration is valid",
            "GitHub configuration is invalid",
        ))
        .await
    }

    /// Fetch repository metadata.
    pub async fn repo_info(&self) -> OpResult<Value> {
        self.request(ApiCall::get(self.config.repo_endpoint()).labels(
            "Fetching repository info...",
            "Repository info fetched",
            "Failed to fetch repository info",
        ))
        .await
    }

    /// Fetch the branch list.
    pub async fn branches(&self) -> OpResult<Value> {
        let endpoint = format!("{}/branches", self.config.repo_endpoint());
        self.request(ApiCall::get(endpoint).labels(
            "Fetching branches...",
            "Branches fetched",
            "Failed to fetch branches",
        ))
        .await
    }

    /// Fetch the latest commits on the configured branch.
    pub async fn commits(&self) -> OpResult<Value> {
        let endpoint = format!("{}/commits", self.config.repo_endpoint());
        self.request(
            ApiCall::get(endpoint)
                .query("sha", &self.config.branch)
                .query("per_page", COMMITS_PER_PAGE)
                .labels(
                    "Fetching commit history...",
                    "Commit history fetched",
                    "Failed to fetch commit history",
                ),
        )
        .await
    }

    /// Raw contents response for `path` on the configured branch.
    async fn fetch_contents(&self, path: &str) -> OpResult<Value> {
        self.request(
            ApiCall::get(self.contents_endpoint(path))
                .query("ref", &self.config.branch)
                .labels(
                    format!("Fetching file: {path}..."),
                    "File fetched",
                    "Failed to fetch file",
                ),
        )
        .await
    }

    /// Fetch one file's decoded content and concurrency token.
    ///
    /// A missing path is an ordinary failure with
    /// [`FailureKind::NotFound`], which callers use to tell "create"
    /// from "update".
    pub async fn get_file(&self, path: &str) -> OpResult<RemoteFile> {
        let fetched = self.fetch_contents(path).await?;
        let message = fetched.message;
        let body = fetched.data;

        // Files over the inline size limit come back with an empty payload.
        if let Some(encoding) = body.get("encoding").and_then(Value::as_str) {
            if encoding != "base64" {
                return Err(Failure::new(
                    FailureKind::InvalidResponse,
                    "Failed to fetch file",
                    format!("{path}: content not inline (encoding {encoding})"),
                ));
            }
        }

        let (Some(encoded), Some(sha)) = (
            body.get("content").and_then(Value::as_str),
            body.get("sha").and_then(Value::as_str),
        ) else {
            return Err(Failure::new(
                FailureKind::InvalidResponse,
                "Failed to fetch file",
                format!("{path} is not a file"),
            ));
        };

        let content = codec::decode(encoded).map_err(|e| {
            Failure::new(FailureKind::Decode, "Failed to decode file", e.to_string())
        })?;

        Ok(Success::new(
            message,
            RemoteFile {
                path: path.to_string(),
                content,
                sha: sha.to_string(),
            },
        ))
    }

    /// Create or update a file, probing the remote for its current token.
    ///
    /// Two steps, not atomic: the current token is read, then the write is
    /// conditioned on it. If another writer lands in between, the write is
    /// rejected and returned as a [`FailureKind::Conflict`] failure. There
    /// is no retry.
    pub async fn push_file(&self, record: &FileRecord) -> OpResult<Value> {
        let label = format!("Pushing file: {}...", record.path);
        let _scope = ProgressScope::begin(self.reporter(), &label);

        let sha = match self.fetch_contents(&record.path).await {
            Ok(existing) => existing
                .data
                .get("sha")
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(lookup) => {
                tracing::debug!("{}: no existing file ({})", record.path, lookup.error);
                None
            }
        };

        self.upsert(record, sha.as_deref()).await
    }

    /// Write a file conditioned exactly on `record.sha`, without probing.
    ///
    /// `None` only succeeds if the file does not exist yet. A stale token
    /// fails with [`FailureKind::Conflict`], letting the caller decide
    /// whether to re-read and retry.
    pub async fn put_file(&self, record: &FileRecord) -> OpResult<Value> {
        self.upsert(record, record.sha.as_deref()).await
    }

    async fn upsert(&self, record: &FileRecord, sha: Option<&str>) -> OpResult<Value> {
        let mut payload = json!({
            "message": record.commit_message,
            "content": codec::encode(&record.content),
            "branch": self.config.branch,
        });
        if let Some(sha) = sha {
            payload["sha"] = Value::String(sha.to_string());
        }

        let result = self
            .request(ApiCall::put(self.contents_endpoint(&record.path)).body(payload).labels(
                format!("Pushing file: {}...", record.path),
                "File pushed",
                "Failed to push file",
            ))
            .await;

        match &result {
            Ok(_) => {
                let mode = if sha.is_some() { "update" } else { "create" };
                tracing::info!("pushed {} ({})", record.path, mode);
            }
            Err(failure) if failure.is_conflict() => {
                tracing::warn!("{}: remote changed concurrently: {}", record.path, failure.error);
            }
            Err(_) => {}
        }
        result
    }
}
