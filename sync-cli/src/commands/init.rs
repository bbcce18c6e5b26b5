//! Create the repository profile.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{Profile, TOKEN_ENV};

/// Arguments for `init`.
#[derive(Debug, Default)]
pub struct InitArgs<'a> {
    /// Repository as `owner/repo`.
    pub repo: &'a str,
    /// Access token to store, if given on the command line.
    pub token: Option<&'a str>,
    /// Branch to sync.
    pub branch: Option<&'a str>,
    /// REST API base URL.
    pub api_base: Option<&'a str>,
    /// Overwrite an existing profile.
    pub force: bool,
}

/// Run the init command.
pub async fn run(data_dir: &Path, args: InitArgs<'_>) -> Result<()> {
    if Profile::exists(data_dir) && !args.force {
        anyhow::bail!(
            "Profile already exists. Delete {} or pass --force to reinitialize.",
            Profile::path(data_dir).display()
        );
    }

    let token = match args.token {
        Some(token) => Some(token.trim().to_string()),
        None if std::env::var_os(TOKEN_ENV).is_some() => None,
        None => Some(prompt_token()?),
    };

    let mut profile = Profile::new(args.repo, token.as_deref())?;
    if let Some(branch) = args.branch {
        profile = profile.with_branch(branch);
    }
    if let Some(api_base) = args.api_base {
        profile = profile.with_api_base(api_base);
    }
    profile.save(data_dir).await?;

    println!("Profile saved!");
    println!();
    println!("  Repository: {}", profile.repo);
    println!("  Branch:     {}", profile.branch);
    println!("  API:        {}", profile.api_base);
    println!(
        "  Token:      {}",
        if profile.token.is_some() {
            "stored"
        } else {
            "from environment"
        }
    );
    println!("  Data dir:   {}", data_dir.display());
    println!();
    println!("Next steps:");
    println!("  1. Check access: markit-sync validate");
    println!("  2. Push documents: markit-sync push --dir <DIR>");

    Ok(())
}

/// Prompt for the access token with echo suppression.
fn prompt_token() -> Result<String> {
    let token = rpassword::prompt_password("Access token: ").context("Failed to read token")?;
    let trimmed = token.trim().to_string();
    if trimmed.is_empty() {
        anyhow::bail!("Access token must not be empty");
    }
    Ok(trimmed)
}
