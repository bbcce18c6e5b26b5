//! Mock transport for testing.
//!
//! An in-memory repository that answers the REST endpoints the client uses,
//! enforces the concurrency-token rule on writes, captures every request
//! for verification, and allows injecting failures per route.

use super::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Line width the remote wraps base64 content at.
const WRAP_WIDTH: usize = 60;

/// Mock transport for testing.
///
/// Clones share state, so a test can hand one clone to the client and keep
/// another for seeding and assertions.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug)]
struct MockTransportInner {
    branches: Vec<String>,
    files: BTreeMap<String, StoredFile>,
    extra_entries: Vec<(String, &'static str)>,
    commits: Vec<Value>,
    requests: Vec<ApiRequest>,
    failures: Vec<InjectedFailure>,
    fail_next_transport: Option<String>,
    concurrent_writes: Vec<(String, String)>,
}

impl Default for MockTransportInner {
    fn default() -> Self {
        Self {
            branches: vec!["main".to_string()],
            files: BTreeMap::new(),
            extra_entries: Vec::new(),
            commits: Vec::new(),
            requests: Vec::new(),
            failures: Vec::new(),
            fail_next_transport: None,
            concurrent_writes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredFile {
    /// Base64 payload exactly as served.
    encoded: String,
    sha: String,
    /// Whether the contents endpoint returns the payload inline.
    inline: bool,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    method: Method,
    endpoint_suffix: String,
    status: u16,
    message: String,
    once: bool,
}

impl MockTransport {
    /// Create an empty repository with a single `main` branch.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a text file, returning its concurrency token.
    pub fn seed_file(&self, path: &str, content: &str) -> String {
        let mut inner = self.lock();
        inner.store(path, STANDARD.encode(content.as_bytes()))
    }

    /// Store a file whose served payload is the given raw base64 text.
    ///
    /// Used to serve content that does not decode to UTF-8.
    pub fn seed_raw(&self, path: &str, encoded: &str) -> String {
        let mut inner = self.lock();
        inner.store(path, encoded.to_string())
    }

    /// Store a file too large to be served inline.
    ///
    /// Its contents response carries `"encoding": "none"` and an empty
    /// `content`, as the remote does for files over 1 MB.
    pub fn seed_oversized(&self, path: &str, content: &str) -> String {
        let mut inner = self.lock();
        let sha = inner.store(path, STANDARD.encode(content.as_bytes()));
        if let Some(file) = inner.files.get_mut(path) {
            file.inline = false;
        }
        sha
    }

    /// Add a non-blob tree entry (`"tree"` or `"commit"`).
    pub fn seed_entry(&self, path: &str, kind: &'static str) {
        self.lock().extra_entries.push((path.to_string(), kind));
    }

    /// Add a branch.
    pub fn add_branch(&self, name: &str) {
        self.lock().branches.push(name.to_string());
    }

    /// Decoded content of a stored file.
    pub fn file_content(&self, path: &str) -> Option<String> {
        let inner = self.lock();
        let file = inner.files.get(path)?;
        let bytes = STANDARD.decode(file.encoded.as_bytes()).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Concurrency token of a stored file.
    pub fn file_sha(&self, path: &str) -> Option<String> {
        self.lock().files.get(path).map(|f| f.sha.clone())
    }

    /// Get all requests that were executed.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Get the last request that was executed.
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.lock().requests.last().cloned()
    }

    /// Number of executed requests with this method whose endpoint ends with `suffix`.
    pub fn count_requests(&self, method: Method, suffix: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.endpoint.ends_with(suffix))
            .count()
    }

    /// Answer every matching request with an error status until cleared.
    pub fn fail_route(&self, method: Method, endpoint_suffix: &str, status: u16, message: &str) {
        self.push_failure(method, endpoint_suffix, status, message, false);
    }

    /// Answer the next matching request with an error status.
    pub fn fail_next(&self, method: Method, endpoint_suffix: &str, status: u16, message: &str) {
        self.push_failure(method, endpoint_suffix, status, message, true);
    }

    fn push_failure(&self, method: Method, suffix: &str, status: u16, message: &str, once: bool) {
        self.lock().failures.push(InjectedFailure {
            method,
            endpoint_suffix: suffix.to_string(),
            status,
            message: message.to_string(),
            once,
        });
    }

    /// Cause the next request to fail before any response arrives.
    pub fn fail_next_transport(&self, error: &str) {
        self.lock().fail_next_transport = Some(error.to_string());
    }

    /// Simulate another writer: right after the next GET of `path`'s
    /// contents is served, replace the file with `content`.
    pub fn write_after_next_read(&self, path: &str, content: &str) {
        self.lock()
            .concurrent_writes
            .push((path.to_string(), content.to_string()));
    }

    /// Clear all state (files, requests, failures).
    pub fn reset(&self) {
        *self.lock() = MockTransportInner::default();
    }
}

impl MockTransportInner {
    fn store(&mut self, path: &str, encoded: String) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("blob {}\0", encoded.len()).as_bytes());
        hasher.update(encoded.as_bytes());
        let sha = hex::encode(hasher.finalize());
        self.files.insert(
            path.to_string(),
            StoredFile {
                encoded,
                sha: sha.clone(),
                inline: true,
            },
        );
        sha
    }

    fn take_failure(&mut self, request: &ApiRequest) -> Option<ApiResponse> {
        let index = self.failures.iter().position(|f| {
            f.method == request.method && request.endpoint.ends_with(&f.endpoint_suffix)
        })?;
        let failure = if self.failures[index].once {
            self.failures.remove(index)
        } else {
            self.failures[index].clone()
        };
        Some(error(failure.status, &failure.message))
    }

    fn route(&mut self, request: &ApiRequest) -> ApiResponse {
        let segments: Vec<&str> = request
            .endpoint
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["user"]) => ApiResponse::new(200, json!({"login": "mock-user", "id": 1})),
            (Method::Get, ["repos", owner, repo]) => ApiResponse::new(
                200,
                json!({
                    "full_name": format!("{owner}/{repo}"),
                    "default_branch": self.branches.first().cloned().unwrap_or_default(),
                    "private": true,
                }),
            ),
            (Method::Get, ["repos", _, _, "branches"]) => {
                let branches: Vec<Value> = self
                    .branches
                    .iter()
                    .map(|b| json!({"name": b, "protected": false}))
                    .collect();
                ApiResponse::new(200, Value::Array(branches))
            }
            (Method::Get, ["repos", _, _, "commits"]) => {
                let limit = request
                    .query_param("per_page")
                    .and_then(|p| p.parse::<usize>().ok())
                    .unwrap_or(30);
                let commits: Vec<Value> = self.commits.iter().rev().take(limit).cloned().collect();
                ApiResponse::new(200, Value::Array(commits))
            }
            (Method::Get, ["repos", _, _, "git", "trees", branch]) => {
                if !self.branches.iter().any(|b| b == branch) {
                    return error(404, "Not Found");
                }
                ApiResponse::new(200, json!({"tree": self.tree_entries(), "truncated": false}))
            }
            (Method::Get, ["repos", _, _, "contents", path @ ..]) => {
                let path = path.join("/");
                self.get_contents(&path, request.query_param("ref"))
            }
            (Method::Put, ["repos", _, _, "contents", path @ ..]) => {
                let path = path.join("/");
                self.put_contents(&path, request.body.as_ref())
            }
            _ => error(404, "Not Found"),
        }
    }

    fn tree_entries(&self) -> Vec<Value> {
        let mut dirs: Vec<String> = Vec::new();
        for path in self.files.keys() {
            let mut prefix = String::new();
            let parts: Vec<&str> = path.split('/').collect();
            for part in &parts[..parts.len().saturating_sub(1)] {
                if !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(part);
                if !dirs.contains(&prefix) {
                    dirs.push(prefix.clone());
                }
            }
        }

        let mut entries: Vec<(String, Value)> = Vec::new();
        for dir in dirs {
            entries.push((dir.clone(), json!({"path": dir, "type": "tree"})));
        }
        for (path, file) in &self.files {
            entries.push((
                path.clone(),
                json!({"path": path, "type": "blob", "sha": file.sha}),
            ));
        }
        for (path, kind) in &self.extra_entries {
            entries.push((path.clone(), json!({"path": path, "type": kind})));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, v)| v).collect()
    }

    fn get_contents(&mut self, path: &str, reference: Option<&str>) -> ApiResponse {
        if let Some(reference) = reference {
            if !self.branches.iter().any(|b| b == reference) {
                return error(404, &format!("No commit found for the ref {reference}"));
            }
        }
        let Some(file) = self.files.get(path).cloned() else {
            return error(404, "Not Found");
        };

        let (encoding, content) = if file.inline {
            ("base64", wrap(&file.encoded))
        } else {
            ("none", String::new())
        };
        let response = ApiResponse::new(
            200,
            json!({
                "type": "file",
                "encoding": encoding,
                "path": path,
                "sha": file.sha,
                "content": content,
            }),
        );

        if let Some(index) = self.concurrent_writes.iter().position(|(p, _)| p == path) {
            let (_, content) = self.concurrent_writes.remove(index);
            self.store(path, STANDARD.encode(content.as_bytes()));
        }
        response
    }

    fn put_contents(&mut self, path: &str, body: Option<&Value>) -> ApiResponse {
        let Some(body) = body else {
            return error(400, "Problems parsing JSON");
        };
        let Some(content) = body.get("content").and_then(|c| c.as_str()) else {
            return error(422, "Invalid request.\n\n\"content\" wasn't supplied.");
        };
        let message = body.get("message").and_then(|m| m.as_str()).unwrap_or("");
        if let Some(branch) = body.get("branch").and_then(|b| b.as_str()) {
            if !self.branches.iter().any(|b| b == branch) {
                return error(404, &format!("Branch {branch} not found"));
            }
        }
        let sent_sha = body.get("sha").and_then(|s| s.as_str());

        let existing = self.files.get(path).map(|f| f.sha.clone());
        let created = match (existing, sent_sha) {
            (Some(_), None) => {
                return error(422, "Invalid request.\n\n\"sha\" wasn't supplied.");
            }
            (Some(current), Some(sent)) if current != sent => {
                return error(409, &format!("{path} does not match {sent}"));
            }
            (None, Some(sent)) => {
                return error(409, &format!("{path} does not match {sent}"));
            }
            (Some(_), Some(_)) => false,
            (None, None) => true,
        };

        if STANDARD.decode(content.as_bytes()).is_err() {
            return error(422, "content is not valid Base64");
        }
        let sha = self.store(path, content.to_string());
        let commit_sha = hex::encode(Sha256::digest(format!("{path}{sha}{message}").as_bytes()));
        let commit = json!({"sha": commit_sha, "commit": {"message": message}});
        self.commits.push(commit.clone());

        ApiResponse::new(
            if created { 201 } else { 200 },
            json!({"content": {"path": path, "sha": sha}, "commit": commit}),
        )
    }
}

fn error(status: u16, message: &str) -> ApiResponse {
    ApiResponse::new(status, json!({"message": message}))
}

fn wrap(encoded: &str) -> String {
    let mut out = String::with_capacity(encoded.len() + encoded.len() / WRAP_WIDTH + 1);
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % WRAP_WIDTH == 0 {
            out.push('\n');
        }
        out.push(c);
    }
    out.push('\n');
    out
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut inner = self.lock();
        inner.requests.push(request.clone());

        // Check for forced failure
        if let Some(error) = inner.fail_next_transport.take() {
            return Err(TransportError::ConnectionFailed(error));
        }
        if let Some(response) = inner.take_failure(&request) {
            return Ok(response);
        }

        Ok(inner.route(&request))
    }
}
