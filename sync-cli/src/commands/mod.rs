//! CLI command implementations.

pub mod init;
pub mod new;
pub mod pull;
pub mod push;
pub mod status;
pub mod sync;
pub mod validate;

use anyhow::{Context, Result};
use markit_sync_client::{HttpTransport, MockTransport, RemoteConfig, RepoClient};
use markit_sync_types::DEFAULT_BRANCH;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Profile;
use crate::progress::TerminalProgress;

/// Document served by the simulated repository in `--mock` mode.
pub const MOCK_WELCOME_PATH: &str = "WELCOME.md";

/// Load the profile and build the client configuration.
pub async fn load_remote(data_dir: &Path) -> Result<RemoteConfig> {
    let profile = Profile::load(data_dir).await?;
    profile
        .remote_config()
        .context("Profile is not usable for remote access")
}

/// Client over the real REST API.
pub fn http_client(config: RemoteConfig) -> Result<RepoClient<HttpTransport>> {
    let client = RepoClient::http(config).context("Failed to create HTTP transport")?;
    Ok(client.with_progress(Arc::new(TerminalProgress::new())))
}

/// Client over an in-memory repository (for testing/demo).
///
/// The repository starts with the configured branch and one welcome
/// document, and is discarded when the command exits.
pub fn mock_client(config: RemoteConfig) -> RepoClient<MockTransport> {
    let transport = MockTransport::new();
    if config.branch != DEFAULT_BRANCH {
        transport.add_branch(&config.branch);
    }
    transport.seed_file(
        MOCK_WELCOME_PATH,
        "# Welcome\n\nThis document lives in a simulated repository.\n",
    );
    RepoClient::new(config, transport).with_progress(Arc::new(TerminalProgress::new()))
}

/// First seven characters of a commit or blob sha, for display.
///
/// Falls back to the whole value when it is shorter or not ASCII there.
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Cancellation token tripped by Ctrl-C.
///
/// Batches stop at the next file boundary; files already written stay
/// written.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, stopping after the current file...");
            trigger.cancel();
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sha_truncates_hex() {
        assert_eq!(short_sha("3f786850e387550fdab836ed7e6dc881de23001b"), "3f78685");
        assert_eq!(short_sha("abc"), "abc");
        assert_eq!(short_sha(""), "");
    }

    #[test]
    fn short_sha_does_not_split_characters() {
        // Byte 7 falls inside the second "é".
        assert_eq!(short_sha("abcdééx"), "abcdééx");
        assert_eq!(short_sha("ééééé"), "ééééé");
    }
}
