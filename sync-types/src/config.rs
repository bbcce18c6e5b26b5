//! Remote repository configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Branch used when none is configured.
pub const DEFAULT_BRANCH: &str = "main";

/// Base URL of the hosted REST API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Errors building a [`RemoteConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The `owner/repo` slug could not be split into two non-empty parts.
    #[error("invalid repository slug {0:?}: expected \"owner/repo\"")]
    InvalidSlug(String),

    /// A required field was empty.
    #[error("missing required field: {0}")]
    Missing(&'static str),
}

/// Credentials and coordinates of the remote repository.
///
/// Owned by exactly one client and never mutated after construction;
/// build a new one to change any field.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Personal access token sent in the `Authorization` header.
    pub token: String,
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch every read and write targets.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Base URL of the REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl RemoteConfig {
    /// Create a configuration on the default branch.
    pub fn new(token: &str, owner: &str, repo: &str) -> Self {
        Self {
            token: token.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: default_branch(),
            api_base: default_api_base(),
        }
    }

    /// Create a configuration from an `owner/repo` slug.
    pub fn from_repo_slug(token: &str, slug: &str) -> Result<Self, ConfigError> {
        let (owner, repo) = slug
            .trim()
            .trim_end_matches('/')
            .split_once('/')
            .ok_or_else(|| ConfigError::InvalidSlug(slug.to_string()))?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(ConfigError::InvalidSlug(slug.to_string()));
        }
        Ok(Self::new(token, owner, repo))
    }

    /// Set the branch. An empty name keeps the default.
    pub fn with_branch(mut self, branch: &str) -> Self {
        if !branch.is_empty() {
            self.branch = branch.to_string();
        }
        self
    }

    /// Set the API base URL (e.g. a GitHub Enterprise host).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Check that every required field is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.is_empty() {
            return Err(ConfigError::Missing("token"));
        }
        if self.owner.is_empty() {
            return Err(ConfigError::Missing("owner"));
        }
        if self.repo.is_empty() {
            return Err(ConfigError::Missing("repo"));
        }
        Ok(())
    }

    /// `owner/repo`.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Endpoint prefix for repository-scoped calls: `/repos/{owner}/{repo}`.
    pub fn repo_endpoint(&self) -> String {
        format!("/repos/{}/{}", self.owner, self.repo)
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("token", &"[REDACTED]")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_defaults_to_main() {
        let config = RemoteConfig::new("t", "octo", "notes");
        assert_eq!(config.branch, "main");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn branch_defaults_when_absent_from_serialized_form() {
        let config: RemoteConfig =
            serde_json::from_str(r#"{"token":"t","owner":"octo","repo":"notes"}"#).unwrap();
        assert_eq!(config.branch, "main");
    }

    #[test]
    fn empty_branch_keeps_default() {
        let config = RemoteConfig::new("t", "octo", "notes").with_branch("");
        assert_eq!(config.branch, "main");

        let config = config.with_branch("drafts");
        assert_eq!(config.branch, "drafts");
    }

    #[test]
    fn slug_parsing() {
        let config = RemoteConfig::from_repo_slug("t", "octo/notes").unwrap();
        assert_eq!(config.owner, "octo");
        assert_eq!(config.repo, "notes");
        assert_eq!(config.slug(), "octo/notes");
        assert_eq!(config.repo_endpoint(), "/repos/octo/notes");
    }

    #[test]
    fn malformed_slugs_rejected() {
        for slug in ["notes", "/notes", "octo/", "a/b/c", ""] {
            assert!(
                matches!(
                    RemoteConfig::from_repo_slug("t", slug),
                    Err(ConfigError::InvalidSlug(_))
                ),
                "slug {:?} should be rejected",
                slug
            );
        }
    }

    #[test]
    fn api_base_trailing_slash_trimmed() {
        let config = RemoteConfig::new("t", "o", "r").with_api_base("https://ghe.local/api/v3/");
        assert_eq!(config.api_base, "https://ghe.local/api/v3");
    }

    #[test]
    fn validate_reports_missing_token() {
        let config = RemoteConfig::new("", "o", "r");
        assert_eq!(config.validate(), Err(ConfigError::Missing("token")));
        assert!(RemoteConfig::new("t", "o", "r").validate().is_ok());
    }

    #[test]
    fn debug_redacts_token() {
        let config = RemoteConfig::new("ghp_supersecret", "o", "r");
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("ghp_supersecret"));
    }
}
