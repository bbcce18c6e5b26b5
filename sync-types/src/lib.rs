//! # sync-types
//!
//! Data model for markit-sync, the remote repository synchronization client.
//!
//! This crate provides the foundational types used across all markit-sync crates:
//! - [`RemoteConfig`] - Credentials and coordinates of the remote repository
//! - [`FileRecord`], [`RemoteFile`], [`PulledFile`], [`PushedFile`] - Document payloads
//! - [`TreeEntry`] - Entries of the remote's recursive file listing
//! - [`Success`], [`Failure`], [`OpResult`] - The uniform operation outcome

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod files;
mod outcome;

pub use config::{ConfigError, RemoteConfig, DEFAULT_API_BASE, DEFAULT_BRANCH};
pub use files::{EntryKind, FileRecord, PulledFile, PushedFile, RemoteFile, RepoStatus, TreeEntry};
pub use outcome::{Failure, FailureKind, OpResult, Success};
