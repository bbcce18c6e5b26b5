//! Check that the stored credentials are accepted.

use anyhow::Result;
use markit_sync_client::{RepoClient, Transport};
use std::path::Path;

use super::{http_client, load_remote, mock_client};

/// Run the validate command.
pub async fn run(data_dir: &Path, use_mock: bool) -> Result<()> {
    let config = load_remote(data_dir).await?;
    if use_mock {
        do_validate(&mock_client(config)).await
    } else {
        do_validate(&http_client(config)?).await
    }
}

async fn do_validate<T: Transport>(client: &RepoClient<T>) -> Result<()> {
    let user = client.validate_credentials().await?;
    let login = user.data["login"].as_str().unwrap_or("(unknown)");

    println!("{}", user.message);
    println!("  Authenticated as: {}", login);

    let repo = client.repo_info().await?;
    println!(
        "  Repository:       {} ({})",
        client.config().slug(),
        repo.message
    );
    Ok(())
}
