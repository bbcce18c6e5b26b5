//! Batch push and full-tree pull.
//!
//! Both batches walk their items strictly in sequence through a
//! [`WorkQueue`], which checks a cancellation token at every step boundary.
//! How a per-item failure is handled is an explicit [`BatchPolicy`]:
//!
//! - push defaults to [`BatchPolicy::FailFast`]: the first failure is
//!   returned and later files are never attempted. Files written before the
//!   failure stay committed; there is no rollback.
//! - pull defaults to [`BatchPolicy::BestEffort`]: failed files are skipped
//!   and the result holds only the files that succeeded, in tree order.

use markit_sync_types::{
    Failure, FailureKind, FileRecord, OpResult, PulledFile, PushedFile, Success, TreeEntry,
};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::client::{ApiCall, RepoClient};
use crate::progress::ProgressScope;
use crate::transport::Transport;

/// What a batch does when one item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Stop at the first failure and return it.
    FailFast,
    /// Skip failed items and return the successes.
    BestEffort,
}

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Per-item failure policy.
    pub policy: BatchPolicy,
    /// Checked before each item; once cancelled, no further item starts.
    pub cancel: CancellationToken,
}

impl BatchOptions {
    /// Fail-fast, never cancelled.
    pub fn fail_fast() -> Self {
        Self {
            policy: BatchPolicy::FailFast,
            cancel: CancellationToken::new(),
        }
    }

    /// Best-effort, never cancelled.
    pub fn best_effort() -> Self {
        Self {
            policy: BatchPolicy::BestEffort,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` as the cancellation signal.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Position of an item within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Zero-based index.
    pub index: usize,
    /// Batch size.
    pub total: usize,
}

/// A batch stopped by its cancellation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled after {completed} of {total} items")]
pub struct BatchCancelled {
    /// Items handed out before cancellation was observed.
    pub completed: usize,
    /// Batch size.
    pub total: usize,
}

impl BatchCancelled {
    fn into_failure(self, message: &str) -> Failure {
        Failure::new(FailureKind::Cancelled, message, self.to_string())
    }
}

/// Sequential iterator over batch items that honors a cancellation token.
///
/// Yields `Ok((step, item))` per item. If the token is cancelled, the next
/// call yields a single `Err(BatchCancelled)` and the iterator then ends.
pub struct WorkQueue<'a, I: Iterator> {
    items: I,
    position: usize,
    total: usize,
    cancel: &'a CancellationToken,
    stopped: bool,
}

impl<'a, I: ExactSizeIterator> WorkQueue<'a, I> {
    /// Queue `items`, checking `cancel` before each one.
    pub fn new(items: I, cancel: &'a CancellationToken) -> Self {
        Self {
            total: items.len(),
            items,
            position: 0,
            cancel,
            stopped: false,
        }
    }
}

impl<I: Iterator> Iterator for WorkQueue<'_, I> {
    type Item = Result<(Step, I::Item), BatchCancelled>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.stopped = true;
            return Some(Err(BatchCancelled {
                completed: self.position,
                total: self.total,
            }));
        }
        let item = self.items.next()?;
        let step = Step {
            index: self.position,
            total: self.total,
        };
        self.position += 1;
        Some(Ok((step, item)))
    }
}

impl<T: Transport> RepoClient<T> {
    /// Push files in caller order, stopping at the first failure.
    pub async fn push_batch(&self, records: &[FileRecord]) -> OpResult<Vec<PushedFile>> {
        self.push_batch_with(records, &BatchOptions::fail_fast()).await
    }

    /// Push files in caller order under explicit options.
    ///
    /// Under [`BatchPolicy::BestEffort`] failed files are logged and left
    /// out of the result.
    pub async fn push_batch_with(
        &self,
        records: &[FileRecord],
        options: &BatchOptions,
    ) -> OpResult<Vec<PushedFile>> {
        let total = records.len();
        let scope = ProgressScope::begin(self.reporter(), &format!("Pushing {total} files..."));
        let mut pushed = Vec::with_capacity(total);

        for item in WorkQueue::new(records.iter(), &options.cancel) {
            let (step, record) = item.map_err(|c| c.into_failure("Push cancelled"))?;
            scope.step(
                step.index,
                total,
                &format!("Pushing file {}/{}: {}...", step.index + 1, total, record.path),
            );

            match self.push_file(record).await {
                Ok(done) => pushed.push(PushedFile {
                    path: record.path.clone(),
                    message: done.message,
                    response: done.data,
                }),
                Err(failure) => match options.policy {
                    BatchPolicy::FailFast => {
                        tracing::warn!(
                            "push stopped at {}/{} ({}): {}",
                            step.index + 1,
                            total,
                            record.path,
                            failure.error
                        );
                        let message = format!("{} ({})", failure.message, record.path);
                        return Err(failure.with_message(message));
                    }
                    BatchPolicy::BestEffort => {
                        tracing::warn!("skipping {}: {}", record.path, failure.error);
                    }
                },
            }
        }

        Ok(Success::new(format!("Pushed {} files", pushed.len()), pushed))
    }

    /// Fetch the recursive file tree of the configured branch.
    pub async fn tree(&self) -> OpResult<Vec<TreeEntry>> {
        let endpoint = format!(
            "{}/git/trees/{}",
            self.config().repo_endpoint(),
            self.config().branch
        );
        let listing = self
            .request(ApiCall::get(endpoint).query("recursive", 1).labels(
                "Fetching file list from GitHub...",
                "File list fetched",
                "Failed to fetch file list",
            ))
            .await?;

        if listing.data.get("truncated").and_then(Value::as_bool) == Some(true) {
            tracing::warn!("tree listing was truncated by the remote; some files will be missing");
        }
        let tree = listing.data.get("tree").cloned().unwrap_or(Value::Null);
        let entries: Vec<TreeEntry> = serde_json::from_value(tree).map_err(|e| {
            Failure::new(
                FailureKind::InvalidResponse,
                "Failed to fetch file list",
                e.to_string(),
            )
        })?;
        Ok(Success::new(listing.message, entries))
    }

    /// Pull every file on the configured branch, skipping failures.
    pub async fn pull_all(&self) -> OpResult<Vec<PulledFile>> {
        self.pull_all_with(&BatchOptions::best_effort()).await
    }

    /// Pull every file on the configured branch under explicit options.
    ///
    /// Only blob entries are fetched; directories and submodule entries
    /// are ignored. Failing to list the tree fails the whole pull.
    pub async fn pull_all_with(&self, options: &BatchOptions) -> OpResult<Vec<PulledFile>> {
        let scope = ProgressScope::begin(self.reporter(), "Fetching file list from GitHub...");

        let entries = self
            .tree()
            .await
            .map_err(|f| f.with_message("Failed to pull files"))?
            .data;
        let blobs: Vec<TreeEntry> = entries.into_iter().filter(TreeEntry::is_blob).collect();
        let total = blobs.len();
        let mut pulled = Vec::with_capacity(total);

        for item in WorkQueue::new(blobs.iter(), &options.cancel) {
            let (step, entry) = item.map_err(|c| c.into_failure("Pull cancelled"))?;
            scope.step(
                step.index,
                total,
                &format!("Fetching file {}/{}: {}...", step.index + 1, total, entry.path),
            );

            match self.get_file(&entry.path).await {
                Ok(file) => pulled.push(PulledFile::from(file.data)),
                Err(failure) => match options.policy {
                    BatchPolicy::BestEffort => {
                        tracing::warn!("skipping {}: {}", entry.path, failure.error);
                    }
                    BatchPolicy::FailFast => {
                        let message = format!("{} ({})", failure.message, entry.path);
                        return Err(failure.with_message(message));
                    }
                },
            }
        }

        tracing::info!("pulled {} of {} files", pulled.len(), total);
        Ok(Success::new("Files pulled", pulled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{ChannelProgress, ProgressEvent};
    use crate::transport::{Method, MockTransport};
    use markit_sync_types::RemoteConfig;
    use std::sync::Arc;

    fn test_client() -> (RepoClient<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let config = RemoteConfig::new("test-token", "octo", "notes");
        (RepoClient::new(config, transport.clone()), transport)
    }

    fn records(paths: &[&str]) -> Vec<FileRecord> {
        paths
            .iter()
            .map(|p| FileRecord::new(p, &format!("content of {p}"), "feat: update"))
            .collect()
    }

    // ===========================================
    // WorkQueue Tests
    // ===========================================

    #[test]
    fn work_queue_yields_steps_in_order() {
        let token = CancellationToken::new();
        let items = ["a", "b"];
        let steps: Vec<_> = WorkQueue::new(items.iter(), &token)
            .map(|r| r.unwrap())
            .map(|(step, item)| (step.index, step.total, *item))
            .collect();
        assert_eq!(steps, vec![(0, 2, "a"), (1, 2, "b")]);
    }

    #[test]
    fn work_queue_stops_at_step_boundary_when_cancelled() {
        let token = CancellationToken::new();
        let items = [1, 2, 3];
        let mut queue = WorkQueue::new(items.iter(), &token);

        assert!(queue.next().unwrap().is_ok());
        token.cancel();
        assert_eq!(
            queue.next().unwrap().unwrap_err(),
            BatchCancelled {
                completed: 1,
                total: 3
            }
        );
        assert!(queue.next().is_none());
    }

    // ===========================================
    // Push Batch Tests
    // ===========================================

    #[tokio::test]
    async fn push_batch_pushes_in_caller_order() {
        let (client, transport) = test_client();

        let result = client
            .push_batch(&records(&["z.md", "a.md", "m.md"]))
            .await
            .unwrap();

        let paths: Vec<&str> = result.data.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["z.md", "a.md", "m.md"]);
        let put_order: Vec<String> = transport
            .requests()
            .into_iter()
            .filter(|r| r.method == Method::Put)
            .map(|r| r.endpoint)
            .collect();
        assert_eq!(
            put_order,
            vec![
                "/repos/octo/notes/contents/z.md",
                "/repos/octo/notes/contents/a.md",
                "/repos/octo/notes/contents/m.md",
            ]
        );
        assert!(result.data[0].new_sha().is_some());
    }

    #[tokio::test]
    async fn push_batch_fails_fast() {
        let (client, transport) = test_client();
        transport.fail_next(Method::Put, "contents/b.md", 500, "Server Error");

        let failure = client
            .push_batch(&records(&["a.md", "b.md", "c.md"]))
            .await
            .unwrap_err();

        assert_eq!(failure.error, "Server Error");
        assert!(failure.message.contains("b.md"));
        // A was committed and stays committed; C was never attempted.
        assert_eq!(transport.file_content("a.md").unwrap(), "content of a.md");
        let puts = transport
            .requests()
            .iter()
            .filter(|r| r.method == Method::Put)
            .count();
        assert_eq!(puts, 2);
        assert_eq!(transport.count_requests(Method::Get, "c.md"), 0);
        assert_eq!(transport.count_requests(Method::Put, "c.md"), 0);
        assert!(transport.file_content("c.md").is_none());
    }

    #[tokio::test]
    async fn push_batch_best_effort_continues_past_failure() {
        let (client, transport) = test_client();
        transport.fail_next(Method::Put, "contents/b.md", 500, "Server Error");

        let result = client
            .push_batch_with(&records(&["a.md", "b.md", "c.md"]), &BatchOptions::best_effort())
            .await
            .unwrap();

        let paths: Vec<&str> = result.data.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["a.md", "c.md"]);
        assert!(transport.file_content("c.md").is_some());
    }

    #[tokio::test]
    async fn push_batch_empty_succeeds() {
        let (client, transport) = test_client();
        let result = client.push_batch(&[]).await.unwrap();
        assert!(result.data.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn push_batch_cancelled_before_start_sends_nothing() {
        let (client, transport) = test_client();
        let token = CancellationToken::new();
        token.cancel();

        let failure = client
            .push_batch_with(
                &records(&["a.md", "b.md"]),
                &BatchOptions::fail_fast().with_cancel(token),
            )
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Cancelled);
        assert_eq!(failure.error, "cancelled after 0 of 2 items");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn push_batch_reports_progress_per_file() {
        let (reporter, mut rx) = ChannelProgress::new();
        let transport = MockTransport::new();
        let client = RepoClient::new(RemoteConfig::new("t", "octo", "notes"), transport)
            .with_progress(Arc::new(reporter));

        client.push_batch(&records(&["a.md", "b.md"])).await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                ProgressEvent::Begin {
                    message: "Pushing 2 files...".into()
                },
                ProgressEvent::Update {
                    message: "Pushing file 1/2: a.md...".into(),
                    fraction: Some(0.5)
                },
                ProgressEvent::Update {
                    message: "Pushing file 2/2: b.md...".into(),
                    fraction: Some(1.0)
                },
                ProgressEvent::End,
            ]
        );
    }

    // ===========================================
    // Pull Tests
    // ===========================================

    #[tokio::test]
    async fn pull_skips_failed_file_and_keeps_order() {
        let (client, transport) = test_client();
        transport.seed_file("1.md", "one");
        transport.seed_file("2.md", "two");
        transport.seed_file("3.md", "three");
        transport.fail_next(Method::Get, "contents/2.md", 500, "Server Error");

        let result = client.pull_all().await.unwrap();

        let pulled: Vec<(&str, &str)> = result
            .data
            .iter()
            .map(|f| (f.path.as_str(), f.content.as_str()))
            .collect();
        assert_eq!(pulled, vec![("1.md", "one"), ("3.md", "three")]);
    }

    #[tokio::test]
    async fn pull_only_fetches_blobs() {
        let (client, transport) = test_client();
        transport.seed_file("a", "alpha");
        transport.seed_entry("b", "tree");
        transport.seed_file("c", "gamma");
        transport.seed_entry("d", "commit");

        let result = client.pull_all().await.unwrap();

        let paths: Vec<&str> = result.data.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "c"]);
        assert_eq!(transport.count_requests(Method::Get, "contents/b"), 0);
        assert_eq!(transport.count_requests(Method::Get, "contents/d"), 0);

        let tree_request = &transport.requests()[0];
        assert_eq!(tree_request.endpoint, "/repos/octo/notes/git/trees/main");
        assert_eq!(tree_request.query_param("recursive"), Some("1"));
    }

    #[tokio::test]
    async fn pull_skips_undecodable_files() {
        let (client, transport) = test_client();
        transport.seed_file("notes.md", "text");
        transport.seed_raw("logo.png", "iVBORw0KGgo=");

        let result = client.pull_all().await.unwrap();
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].path, "notes.md");
    }

    #[tokio::test]
    async fn pull_skips_files_without_inline_content() {
        let (client, transport) = test_client();
        transport.seed_file("a.md", "a");
        transport.seed_oversized("big.md", "large");
        transport.seed_file("c.md", "c");

        let pulled = client.pull_all().await.unwrap().data;

        let paths: Vec<_> = pulled.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["a.md", "c.md"]);
        assert!(pulled.iter().all(|f| !f.content.is_empty()));
    }

    #[tokio::test]
    async fn pull_fail_fast_returns_first_failure() {
        let (client, transport) = test_client();
        transport.seed_file("1.md", "one");
        transport.seed_file("2.md", "two");
        transport.fail_next(Method::Get, "contents/1.md", 403, "API rate limit exceeded");

        let failure = client
            .pull_all_with(&BatchOptions::fail_fast())
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Forbidden);
        assert_eq!(failure.error, "API rate limit exceeded");
        assert_eq!(transport.count_requests(Method::Get, "contents/2.md"), 0);
    }

    #[tokio::test]
    async fn pull_tree_failure_fails_whole_pull() {
        let (client, transport) = test_client();
        transport.seed_file("a.md", "a");
        transport.fail_next(Method::Get, "git/trees/main", 404, "Not Found");

        let failure = client.pull_all().await.unwrap_err();
        assert_eq!(failure.message, "Failed to pull files");
        assert!(failure.is_not_found());
    }

    #[tokio::test]
    async fn pulled_content_matches_pushed_multibyte_text() {
        let (client, _transport) = test_client();
        let texts = [
            ("zh.md", "中文内容测试"),
            ("emoji.md", "🎉🚀 launch 👩‍💻"),
            ("fr.md", "déjà vu, naïve café"),
        ];
        let batch: Vec<FileRecord> = texts
            .iter()
            .map(|(p, c)| FileRecord::new(p, c, "feat: update 3 files"))
            .collect();
        client.push_batch(&batch).await.unwrap();

        let pulled = client.pull_all().await.unwrap().data;
        for (path, content) in texts {
            let file = pulled.iter().find(|f| f.path == path).unwrap();
            assert_eq!(file.content, content);
        }
    }

    #[tokio::test]
    async fn pull_cancelled_returns_cancelled_failure() {
        let (client, transport) = test_client();
        transport.seed_file("a.md", "a");
        let token = CancellationToken::new();
        token.cancel();

        let failure = client
            .pull_all_with(&BatchOptions::best_effort().with_cancel(token))
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Cancelled);
        // The tree was listed, but no file was fetched.
        assert_eq!(transport.count_requests(Method::Get, "contents/a.md"), 0);
    }
}
