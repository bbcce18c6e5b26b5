//! Composite repository status.

use markit_sync_types::{OpResult, RepoStatus, Success};

use crate::client::RepoClient;
use crate::progress::ProgressScope;
use crate::transport::Transport;

impl<T: Transport> RepoClient<T> {
    /// Fetch repository metadata, branches and recent commits concurrently.
    ///
    /// The composite result succeeds whenever the three queries complete,
    /// even if some of them failed: each sub-result in [`RepoStatus`]
    /// carries its own outcome and must be checked individually.
    pub async fn get_status(&self) -> OpResult<RepoStatus> {
        let _scope = ProgressScope::begin(self.reporter(), "Fetching repository status...");

        let (repo_info, branches, commits) =
            tokio::join!(self.repo_info(), self.branches(), self.commits());

        let status = RepoStatus {
            repo_info,
            branches,
            commits,
        };
        if !status.is_complete() {
            tracing::debug!("repository status is partial for {}", self.config().slug());
        }
        Ok(Success::new("Repository status fetched", status))
    }
}
