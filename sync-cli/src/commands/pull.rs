//! Pull every document on the branch into a local directory.

use anyhow::{Context, Result};
use markit_sync_client::{BatchOptions, RepoClient, Transport};
use std::path::Path;

use super::{cancel_on_ctrl_c, http_client, load_remote, mock_client};
use crate::store::DocumentStore;

/// Run the pull command.
pub async fn run(data_dir: &Path, dir: &Path, fail_fast: bool, use_mock: bool) -> Result<()> {
    let config = load_remote(data_dir).await?;
    let options = options_for(fail_fast).with_cancel(cancel_on_ctrl_c());
    let store = DocumentStore::new(dir);

    if use_mock {
        do_pull(&mock_client(config), &store, &options).await?;
    } else {
        do_pull(&http_client(config)?, &store, &options).await?;
    }
    Ok(())
}

fn options_for(fail_fast: bool) -> BatchOptions {
    if fail_fast {
        BatchOptions::fail_fast()
    } else {
        BatchOptions::best_effort()
    }
}

/// Common pull logic for any transport. Returns the number of files written.
async fn do_pull<T: Transport>(
    client: &RepoClient<T>,
    store: &DocumentStore,
    options: &BatchOptions,
) -> Result<usize> {
    println!(
        "Pulling {} ({}) into {}...",
        client.config().slug(),
        client.config().branch,
        store.root().display()
    );

    let result = client.pull_all_with(options).await?;
    let files = result.data;

    tokio::fs::create_dir_all(store.root())
        .await
        .with_context(|| format!("Failed to create {}", store.root().display()))?;
    let written = store
        .save(&files)
        .await
        .context("Failed to write pulled documents")?;

    println!("{}: {} written", result.message, written);
    for file in &files {
        println!("  {}", file.path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;
    use markit_sync_client::{FailureKind, Method, MockTransport, RemoteConfig};
    use tempfile::tempdir;

    fn client_with(transport: &MockTransport) -> RepoClient<MockTransport> {
        RepoClient::new(
            RemoteConfig::new("secret", "octo", "notes"),
            transport.clone(),
        )
    }

    #[tokio::test]
    async fn pull_requires_profile() {
        let data = tempdir().unwrap();
        let docs = tempdir().unwrap();
        assert!(run(data.path(), docs.path(), false, true).await.is_err());
    }

    #[tokio::test]
    async fn pull_with_mock_transport() {
        let data = tempdir().unwrap();
        let docs = tempdir().unwrap();
        Profile::new("octo/notes", Some("secret"))
            .unwrap()
            .save(data.path())
            .await
            .unwrap();

        run(data.path(), docs.path(), false, true).await.unwrap();

        assert!(docs.path().join(crate::commands::MOCK_WELCOME_PATH).exists());
    }

    #[tokio::test]
    async fn pull_writes_nested_documents() {
        let docs = tempdir().unwrap();
        let transport = MockTransport::new();
        transport.seed_file("notes/学习笔记.md", "# 学习笔记\n");
        transport.seed_file("readme.md", "café ✓");
        let store = DocumentStore::new(docs.path().join("out"));

        let written = do_pull(&client_with(&transport), &store, &options_for(false))
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            std::fs::read_to_string(docs.path().join("out/notes/学习笔记.md")).unwrap(),
            "# 学习笔记\n"
        );
        assert_eq!(
            std::fs::read_to_string(docs.path().join("out/readme.md")).unwrap(),
            "café ✓"
        );
    }

    #[tokio::test]
    async fn best_effort_pull_skips_failed_file() {
        let docs = tempdir().unwrap();
        let transport = MockTransport::new();
        transport.seed_file("a.md", "a");
        transport.seed_file("b.md", "b");
        transport.fail_route(Method::Get, "/contents/a.md", 500, "Server Error");
        let store = DocumentStore::new(docs.path());

        let written = do_pull(&client_with(&transport), &store, &options_for(false))
            .await
            .unwrap();

        assert_eq!(written, 1);
        assert!(!docs.path().join("a.md").exists());
        assert!(docs.path().join("b.md").exists());
    }

    #[tokio::test]
    async fn oversized_remote_file_keeps_local_copy() {
        let docs = tempdir().unwrap();
        std::fs::write(docs.path().join("big.md"), "local draft").unwrap();
        let transport = MockTransport::new();
        transport.seed_oversized("big.md", "remote body");
        transport.seed_file("small.md", "small");
        let store = DocumentStore::new(docs.path());

        let written = do_pull(&client_with(&transport), &store, &options_for(false))
            .await
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(
            std::fs::read_to_string(docs.path().join("big.md")).unwrap(),
            "local draft"
        );
    }

    #[tokio::test]
    async fn fail_fast_pull_writes_nothing() {
        let docs = tempdir().unwrap();
        let transport = MockTransport::new();
        transport.seed_file("a.md", "a");
        transport.seed_file("b.md", "b");
        transport.fail_route(Method::Get, "/contents/b.md", 500, "Server Error");
        let store = DocumentStore::new(docs.path());

        let err = do_pull(&client_with(&transport), &store, &options_for(true))
            .await
            .unwrap_err();

        let failure = err.downcast_ref::<markit_sync_client::Failure>().unwrap();
        assert_eq!(failure.kind, FailureKind::Http(500));
        assert!(!docs.path().join("a.md").exists());
    }

    #[tokio::test]
    async fn tree_failure_fails_pull() {
        let docs = tempdir().unwrap();
        let transport = MockTransport::new();
        transport.fail_route(Method::Get, "/git/trees/main", 404, "Not Found");
        let store = DocumentStore::new(docs.path());

        let err = do_pull(&client_with(&transport), &store, &options_for(false))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to pull files"), "got: {err}");
    }
}
