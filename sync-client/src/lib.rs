//! # sync-client
//!
//! Client library for syncing text documents with a remote repository
//! over its REST API.
//!
//! This is the main library that applications use to push and pull documents.
//!
//! ## Features
//!
//! - **Byte-safe Transcoding**: UTF-8 + base64, correct for CJK, emoji and accented text
//! - **Optimistic Concurrency**: writes are conditioned on the remote's current file token
//! - **Explicit Batch Policies**: fail-fast push, best-effort pull, both configurable and cancellable
//! - **Transport Abstraction**: Pluggable transport layer (reqwest, in-memory mock)
//! - **Scoped Progress**: an injected reporter, released on every exit path
//!
//! ## Example
//!
//! ```ignore
//! use markit_sync_client::{RepoClient, RemoteConfig, FileRecord};
//!
//! let config = RemoteConfig::new(&token, "octo", "notes");
//! let client = RepoClient::http(config)?;
//!
//! // Push documents, stopping at the first failure
//! client.push_batch(&records).await?;
//!
//! // Pull every document on the branch
//! let files = client.pull_all().await?.data;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod client;
pub mod codec;
pub mod commit;
pub mod progress;
pub mod status;
pub mod transport;

pub use batch::{BatchCancelled, BatchOptions, BatchPolicy, Step, WorkQueue};
pub use client::{ApiCall, RepoClient, ACCEPT_HEADER, COMMITS_PER_PAGE};
pub use codec::DecodeError;
pub use commit::{commit_message, format_file_path, CommitAction};
pub use progress::{
    ChannelProgress, LoadingIndicator, LoadingState, NoProgress, ProgressEvent, ProgressReporter,
    ProgressScope,
};
pub use transport::{
    ApiRequest, ApiResponse, HttpTransport, HttpTransportConfig, Method, MockTransport, Transport,
    TransportError,
};

pub use markit_sync_types::{
    Failure, FailureKind, FileRecord, OpResult, PulledFile, PushedFile, RemoteConfig, RemoteFile,
    RepoStatus, Success, TreeEntry,
};
