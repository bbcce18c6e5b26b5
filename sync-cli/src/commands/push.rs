//! Push local documents to the repository.

use anyhow::{Context, Result};
use markit_sync_client::{
    commit_message, BatchOptions, BatchPolicy, CommitAction, PushedFile, RepoClient, Transport,
};
use std::path::Path;

use super::{cancel_on_ctrl_c, http_client, load_remote, mock_client, short_sha};
use crate::store::DocumentStore;

/// Arguments for `push`.
#[derive(Debug)]
pub struct PushArgs<'a> {
    /// Document directory.
    pub dir: &'a Path,
    /// Documents to push, relative to `dir`. Empty means all of them.
    pub paths: &'a [String],
    /// Commit message override.
    pub message: Option<&'a str>,
    /// Keep going past failed files.
    pub best_effort: bool,
}

/// Run the push command.
pub async fn run(data_dir: &Path, args: PushArgs<'_>, use_mock: bool) -> Result<()> {
    let config = load_remote(data_dir).await?;
    let options = options_for(args.best_effort).with_cancel(cancel_on_ctrl_c());

    if use_mock {
        do_push(&mock_client(config), &args, &options).await?;
    } else {
        do_push(&http_client(config)?, &args, &options).await?;
    }
    Ok(())
}

fn options_for(best_effort: bool) -> BatchOptions {
    if best_effort {
        BatchOptions::best_effort()
    } else {
        BatchOptions::fail_fast()
    }
}

/// Common push logic for any transport.
async fn do_push<T: Transport>(
    client: &RepoClient<T>,
    args: &PushArgs<'_>,
    options: &BatchOptions,
) -> Result<Vec<PushedFile>> {
    let store = DocumentStore::new(args.dir);
    let paths = if args.paths.is_empty() {
        store
            .list()
            .await
            .with_context(|| format!("Failed to list documents in {}", args.dir.display()))?
    } else {
        args.paths.to_vec()
    };
    if paths.is_empty() {
        println!("Nothing to push in {}", args.dir.display());
        return Ok(Vec::new());
    }

    let message = match args.message {
        Some(message) => message.to_string(),
        None => commit_message(CommitAction::Push, paths.len()),
    };
    let records = store
        .load(&paths, &message)
        .await
        .context("Failed to read documents")?;

    println!(
        "Pushing {} files to {} ({})...",
        records.len(),
        client.config().slug(),
        client.config().branch
    );

    let result = client.push_batch_with(&records, options).await?;
    let pushed = result.data;

    println!("{}", result.message);
    println!();
    for file in &pushed {
        let sha = file.new_sha().unwrap_or("-");
        println!("  {}  {}", short_sha(sha), file.path);
    }
    if options.policy == BatchPolicy::BestEffort && pushed.len() < records.len() {
        println!();
        println!(
            "{} of {} files failed; run with --verbose for details.",
            records.len() - pushed.len(),
            records.len()
        );
    }

    Ok(pushed)
}
