//! Two-way sync between a local directory and the branch.
//!
//! Files only on the remote are downloaded and files only on disk are
//! pushed in one commit batch. A file present on both sides with different
//! content is reported as diverged and left alone on both sides.

use anyhow::{Context, Result};
use markit_sync_client::{
    commit_message, BatchOptions, CommitAction, RepoClient, TreeEntry, Transport,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::{cancel_on_ctrl_c, http_client, load_remote, mock_client};
use crate::store::DocumentStore;

/// What a sync did, by repository path.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Written locally from the remote.
    pub downloaded: Vec<String>,
    /// Pushed from the local directory.
    pub uploaded: Vec<String>,
    /// Different on both sides; untouched.
    pub diverged: Vec<String>,
    /// On the remote but could not be fetched; untouched.
    pub skipped: Vec<String>,
}

/// Run the sync command.
pub async fn run(data_dir: &Path, dir: &Path, use_mock: bool) -> Result<()> {
    let config = load_remote(data_dir).await?;
    let store = DocumentStore::new(dir);
    let cancel = cancel_on_ctrl_c();

    let report = if use_mock {
        do_sync(&mock_client(config), &store, &cancel).await?
    } else {
        do_sync(&http_client(config)?, &store, &cancel).await?
    };

    print_section("Downloaded", &report.downloaded);
    print_section("Uploaded", &report.uploaded);
    print_section("Diverged (left unchanged)", &report.diverged);
    print_section("Skipped (could not fetch)", &report.skipped);
    if report == SyncReport::default() {
        println!("Already in sync.");
    }
    Ok(())
}

fn print_section(title: &str, paths: &[String]) {
    if paths.is_empty() {
        return;
    }
    println!("{title} ({}):", paths.len());
    for path in paths {
        println!("  {path}");
    }
}

/// Common sync logic for any transport.
async fn do_sync<T: Transport>(
    client: &RepoClient<T>,
    store: &DocumentStore,
    cancel: &CancellationToken,
) -> Result<SyncReport> {
    println!(
        "Syncing {} with {} ({})...",
        store.root().display(),
        client.config().slug(),
        client.config().branch
    );

    let remote_paths: BTreeSet<String> = client
        .tree()
        .await?
        .data
        .into_iter()
        .filter(TreeEntry::is_blob)
        .map(|entry| entry.path)
        .collect();

    let pulled = client
        .pull_all_with(&BatchOptions::best_effort().with_cancel(cancel.clone()))
        .await?
        .data;

    tokio::fs::create_dir_all(store.root())
        .await
        .with_context(|| format!("Failed to create {}", store.root().display()))?;
    let local: BTreeMap<String, String> = store
        .load(&[], "")
        .await
        .context("Failed to read local documents")?
        .into_iter()
        .map(|record| (record.path, record.content))
        .collect();

    let mut report = SyncReport::default();
    let mut fetched = BTreeSet::new();
    let mut downloads = Vec::new();
    for file in pulled {
        fetched.insert(file.path.clone());
        match local.get(&file.path) {
            None => downloads.push(file),
            Some(content) if *content != file.content => report.diverged.push(file.path),
            Some(_) => {}
        }
    }
    report.skipped = remote_paths.difference(&fetched).cloned().collect();

    store
        .save(&downloads)
        .await
        .context("Failed to write pulled documents")?;
    report.downloaded = downloads.into_iter().map(|file| file.path).collect();

    let uploads: Vec<String> = local
        .keys()
        .filter(|path| !remote_paths.contains(*path))
        .cloned()
        .collect();
    if !uploads.is_empty() {
        let message = commit_message(CommitAction::Pull, uploads.len());
        let records = store
            .load(&uploads, &message)
            .await
            .context("Failed to read documents")?;
        let options = BatchOptions::fail_fast().with_cancel(cancel.clone());
        let pushed = client.push_batch_with(&records, &options).await?.data;
        report.uploaded = pushed.into_iter().map(|file| file.path).collect();
    }

    tracing::info!(
        "sync: {} down, {} up, {} diverged, {} skipped",
        report.downloaded.len(),
        report.uploaded.len(),
        report.diverged.len(),
        report.skipped.len()
    );
    Ok(report)
}
