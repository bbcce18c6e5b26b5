//! Document payloads exchanged with the remote repository.

use serde::{Deserialize, Serialize};

use crate::OpResult;

/// A local document to be written to the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Repository-relative path.
    pub path: String,
    /// Full text content.
    pub content: String,
    /// Commit message for the write.
    pub commit_message: String,
    /// Concurrency token of the remote version this write is conditioned on.
    ///
    /// `None` creates a new file; `Some` updates exactly that version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl FileRecord {
    /// Create a record with no concurrency token.
    pub fn new(path: &str, content: &str, commit_message: &str) -> Self {
        Self {
            path: path.to_string(),
            content: content.to_string(),
            commit_message: commit_message.to_string(),
            sha: None,
        }
    }

    /// Condition the write on a known remote version.
    pub fn with_sha(mut self, sha: &str) -> Self {
        self.sha = Some(sha.to_string());
        self
    }
}

/// Kind of an entry in the remote's hierarchical listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A file.
    Blob,
    /// A directory.
    Tree,
    /// A submodule pointer.
    Commit,
    /// Anything the remote adds later.
    #[serde(other)]
    Other,
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Repository-relative path.
    pub path: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl TreeEntry {
    /// Only blobs are synchronizable documents.
    pub fn is_blob(&self) -> bool {
        self.kind == EntryKind::Blob
    }
}

/// A single remote file, decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Repository-relative path.
    pub path: String,
    /// Decoded text content.
    pub content: String,
    /// Current concurrency token.
    pub sha: String,
}

/// A file produced by a full pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulledFile {
    /// Repository-relative path.
    pub path: String,
    /// Decoded text content.
    pub content: String,
    /// Concurrency token at the time of the pull.
    pub sha: String,
}

impl From<RemoteFile> for PulledFile {
    fn from(file: RemoteFile) -> Self {
        Self {
            path: file.path,
            content: file.content,
            sha: file.sha,
        }
    }
}

/// A file written by a batch push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushedFile {
    /// Repository-relative path.
    pub path: String,
    /// Outcome message of the write.
    pub message: String,
    /// Raw response body from the remote.
    pub response: serde_json::Value,
}

impl PushedFile {
    /// The new concurrency token reported by the remote, if any.
    pub fn new_sha(&self) -> Option<&str> {
        self.response
            .get("content")
            .and_then(|c| c.get("sha"))
            .and_then(|s| s.as_str())
    }
}

/// Composite repository status.
///
/// Each part is an independent outcome: a failed sub-query does not make
/// the composite fail, so callers must inspect every field.
#[derive(Debug, Clone)]
pub struct RepoStatus {
    /// Repository metadata.
    pub repo_info: OpResult<serde_json::Value>,
    /// Branch list.
    pub branches: OpResult<serde_json::Value>,
    /// Recent commits on the configured branch.
    pub commits: OpResult<serde_json::Value>,
}

impl RepoStatus {
    /// True when every sub-query succeeded.
    pub fn is_complete(&self) -> bool {
        self.repo_info.is_ok() && self.branches.is_ok() && self.commits.is_ok()
    }
}
