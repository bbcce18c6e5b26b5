//! # markit-sync
//!
//! Sync a directory of text documents with a GitHub repository.
//!
//! ## Commands
//!
//! - `init`: Save the repository profile (and optionally the token)
//! - `validate`: Check that the token is accepted
//! - `push`: Push local documents to the branch
//! - `pull`: Pull every document on the branch
//! - `status`: Show repository info, branches and recent commits
//! - `new`: Create a local document from a title
//! - `sync`: Download remote-only and push local-only documents
//!
//! ## Example
//!
//! ```bash
//! # Save the profile (prompts for the token)
//! markit-sync init --repo octo/notes
//!
//! # Push every document under ./notes
//! markit-sync push --dir notes
//!
//! # Pull the branch into ./notes
//! markit-sync pull --dir notes
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod progress;
mod store;

use commands::init::InitArgs;
use commands::push::PushArgs;
use commands::{init, new, pull, push, status, sync, validate};

/// Sync a directory of text documents with a GitHub repository.
#[derive(Parser, Debug)]
#[command(name = "markit-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for storing the repository profile
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use an in-memory simulated repository instead of the real API (for testing/demo)
    #[arg(long, global = true)]
    mock: bool,

    /// Log debug output to stderr (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save the repository profile
    Init {
        /// Repository as owner/repo
        #[arg(long, short)]
        repo: String,

        /// Access token to store (will prompt if not provided and MARKIT_GITHUB_TOKEN is unset)
        #[arg(long, short)]
        token: Option<String>,

        /// Branch to sync
        #[arg(long, short)]
        branch: Option<String>,

        /// REST API base URL (for GitHub Enterprise)
        #[arg(long)]
        api_base: Option<String>,

        /// Overwrite an existing profile
        #[arg(long)]
        force: bool,
    },

    /// Check that the stored token is accepted
    Validate,

    /// Push local documents to the branch
    Push {
        /// Documents to push, relative to --dir (default: all)
        paths: Vec<String>,

        /// Document directory
        #[arg(long, short, default_value = ".")]
        dir: PathBuf,

        /// Commit message (default: generated from the file count)
        #[arg(long, short)]
        message: Option<String>,

        /// Keep going past failed files instead of stopping at the first one
        #[arg(long)]
        best_effort: bool,
    },

    /// Pull every document on the branch
    Pull {
        /// Directory to write documents into
        #[arg(long, short, default_value = ".")]
        dir: PathBuf,

        /// Stop at the first failed file instead of skipping it
        #[arg(long)]
        fail_fast: bool,
    },

    /// Show repository status
    Status {
        /// Print JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// Create a local document named after a title
    New {
        /// Document title
        title: String,

        /// Document directory
        #[arg(long, short, default_value = ".")]
        dir: PathBuf,

        /// File extension
        #[arg(long, default_value = new::DEFAULT_EXTENSION)]
        ext: String,
    },

    /// Download remote-only documents and push local-only ones
    Sync {
        /// Document directory
        #[arg(long, short, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;
    config::set_dir_permissions_0700(&data_dir)
        .await
        .context("Failed to set data directory permissions")?;

    match cli.command {
        Commands::Init {
            repo,
            token,
            branch,
            api_base,
            force,
        } => {
            let args = InitArgs {
                repo: &repo,
                token: token.as_deref(),
                branch: branch.as_deref(),
                api_base: api_base.as_deref(),
                force,
            };
            init::run(&data_dir, args).await?;
        }
        Commands::Validate => {
            validate::run(&data_dir, cli.mock).await?;
        }
        Commands::Push {
            paths,
            dir,
            message,
            best_effort,
        } => {
            let args = PushArgs {
                dir: &dir,
                paths: &paths,
                message: message.as_deref(),
                best_effort,
            };
            push::run(&data_dir, args, cli.mock).await?;
        }
        Commands::Pull { dir, fail_fast } => {
            pull::run(&data_dir, &dir, fail_fast, cli.mock).await?;
        }
        Commands::Status { json } => {
            status::run(&data_dir, json, cli.mock).await?;
        }
        Commands::New { title, dir, ext } => {
            new::run(&dir, &title, &ext).await?;
        }
        Commands::Sync { dir } => {
            sync::run(&data_dir, &dir, cli.mock).await?;
        }
    }

    Ok(())
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` applies unless `--verbose` is given; the default level is `warn`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Get the default data directory for markit-sync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "markit", "markit-sync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
