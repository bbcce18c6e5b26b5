//! Profile configuration for markit-sync.
//!
//! The profile lives in `remote.toml` inside the data directory and holds
//! the repository coordinates plus, optionally, the access token. The
//! token can always be supplied through `MARKIT_GITHUB_TOKEN` instead,
//! which takes precedence over the stored one.

use markit_sync_types::{RemoteConfig, DEFAULT_API_BASE, DEFAULT_BRANCH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the profile inside the data directory.
pub const PROFILE_FILE: &str = "remote.toml";

/// Environment variable that overrides the stored token.
pub const TOKEN_ENV: &str = "MARKIT_GITHUB_TOKEN";

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No profile has been written yet.
    #[error("no profile at {0}. Run 'markit-sync init' first.")]
    NotInitialized(PathBuf),

    /// Failed to read the profile.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the profile.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the profile.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the profile.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// Failed to serialize the profile.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Failed to write the profile.
    #[error("failed to write config file {path}: {source}")]
    WriteError {
        /// Path to the profile.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Neither the profile nor the environment provides a token.
    #[error("no access token configured. Set {TOKEN_ENV} or run 'markit-sync init --token <TOKEN>'.")]
    MissingToken,

    /// The stored coordinates are not usable.
    #[error(transparent)]
    Invalid(#[from] markit_sync_types::ConfigError),
}

/// Repository profile stored locally.
#[derive(Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Repository as `owner/repo`.
    pub repo: String,
    /// Branch to sync.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Stored access token, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// When the profile was created (unix seconds).
    #[serde(default)]
    pub created_at: u64,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Profile {
    /// Create a profile for `repo` on the default branch.
    ///
    /// The slug is checked up front so a bad one never reaches disk.
    pub fn new(repo: &str, token: Option<&str>) -> Result<Self, ConfigError> {
        let parsed = RemoteConfig::from_repo_slug("", repo)?;
        Ok(Self {
            repo: parsed.slug(),
            branch: default_branch(),
            api_base: default_api_base(),
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
            created_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        })
    }

    /// Set the branch. An empty name keeps the default.
    pub fn with_branch(mut self, branch: &str) -> Self {
        if !branch.is_empty() {
            self.branch = branch.to_string();
        }
        self
    }

    /// Set the API base URL.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Path of the profile inside `data_dir`.
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(PROFILE_FILE)
    }

    /// Check if a profile exists.
    pub fn exists(data_dir: &Path) -> bool {
        Self::path(data_dir).exists()
    }

    /// Load the profile from a directory.
    pub async fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(data_dir);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotInitialized(path));
            }
            Err(source) => return Err(ConfigError::ReadError { path, source }),
        };
        toml::from_str(&contents).map_err(|source| ConfigError::ParseError { path, source })
    }

    /// Save the profile to a directory, readable by the owner only.
    pub async fn save(&self, data_dir: &Path) -> Result<(), ConfigError> {
        let path = Self::path(data_dir);
        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| ConfigError::WriteError {
                path: path.clone(),
                source,
            })?;
        set_file_permissions_0600(&path)
            .await
            .map_err(|source| ConfigError::WriteError { path, source })
    }

    /// Build the client configuration, taking the token from the environment
    /// when set.
    pub fn remote_config(&self) -> Result<RemoteConfig, ConfigError> {
        self.remote_config_with(std::env::var(TOKEN_ENV).ok())
    }

    /// Build the client configuration with an explicit token override.
    pub fn remote_config_with(
        &self,
        token_override: Option<String>,
    ) -> Result<RemoteConfig, ConfigError> {
        let token = token_override
            .filter(|t| !t.is_empty())
            .or_else(|| self.token.clone())
            .ok_or(ConfigError::MissingToken)?;
        let config = RemoteConfig::from_repo_slug(&token, &self.repo)?
            .with_branch(&self.branch)
            .with_api_base(&self.api_base);
        config.validate()?;
        Ok(config)
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).await?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
