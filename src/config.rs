use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub formatter: FormatterConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_clone_base_url")]
    pub clone_base_url: String,
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
}

// Manual Debug impl to avoid leaking the access token
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"[REDACTED]")
            .field("organization", &self.organization)
            .field("api_base_url", &self.api_base_url)
            .field("clone_base_url", &self.clone_base_url)
            .field("base_branch", &self.base_branch)
            .finish()
    }
}

/// What to look for and what to turn it into.
#[derive(Debug, Deserialize, Clone)]
pub struct MigrationConfig {
    #[serde(default = "default_block_type")]
    pub block_type: String,
    #[serde(default = "default_legacy_source")]
    pub legacy_source: String,
    #[serde(default = "default_canonical_source")]
    pub canonical_source: String,
    #[serde(default = "default_canonical_version")]
    pub canonical_version: String,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
    #[serde(default = "default_pr_title")]
    pub pr_title: String,
    #[serde(default = "default_pr_body")]
    pub pr_body: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GitConfig {
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default = "default_author_email")]
    pub author_email: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FormatterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_formatter_command")]
    pub command: String,
    #[serde(default = "default_formatter_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_dir")]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_organization() -> String {
    "gmi-platform".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_clone_base_url() -> String {
    "https://github.com".to_string()
}

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_block_type() -> String {
    "module".to_string()
}

fn default_legacy_source() -> String {
    "terraform.generalmills.com/generalmills/iaas/gmi//modules/infoblox-record".to_string()
}

fn default_canonical_source() -> String {
    "artifactory.genmills.com/terraform-module-local__generalmills/infoblox-record/gmi//modules/infoblox-record"
        .to_string()
}

fn default_canonical_version() -> String {
    "~> 0.1".to_string()
}

fn default_file_extension() -> String {
    "tf".to_string()
}

fn default_branch_prefix() -> String {
    "update-infoblox-module".to_string()
}

fn default_commit_message() -> String {
    "Update Infoblox Terraform Module Source and Version".to_string()
}

fn default_pr_title() -> String {
    "Update Infoblox Module Source and Version".to_string()
}

fn default_pr_body() -> String {
    "Automated update of Terraform module source and version.".to_string()
}

fn default_author_name() -> String {
    "Rehome Bot".to_string()
}

fn default_author_email() -> String {
    "rehome[bot]@users.noreply.github.com".to_string()
}

fn default_true() -> bool {
    true
}

fn default_formatter_command() -> String {
    "terraform".to_string()
}

fn default_formatter_args() -> Vec<String> {
    vec!["fmt".to_string(), "-recursive".to_string()]
}

fn default_workspace_dir() -> PathBuf {
    std::env::temp_dir().join("rehome-workspaces")
}

fn default_log_path() -> PathBuf {
    PathBuf::from("pr_links.txt")
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self::with_token("")
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            block_type: default_block_type(),
            legacy_source: default_legacy_source(),
            canonical_source: default_canonical_source(),
            canonical_version: default_canonical_version(),
            file_extension: default_file_extension(),
            branch_prefix: default_branch_prefix(),
            commit_message: default_commit_message(),
            pr_title: default_pr_title(),
            pr_body: default_pr_body(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_email: default_author_email(),
        }
    }
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_formatter_command(),
            args: default_formatter_args(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            base_dir: default_workspace_dir(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            log_path: default_log_path(),
            dry_run: false,
        }
    }
}

impl GitHubConfig {
    /// A config pointing at github.com with every optional field defaulted.
    pub fn with_token(token: &str) -> Self {
        Self {
            token: token.to_string(),
            organization: default_organization(),
            api_base_url: default_api_base_url(),
            clone_base_url: default_clone_base_url(),
            base_branch: default_base_branch(),
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("rehome").required(false));
        }

        // Environment variable overrides with REHOME_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("REHOME")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("run.repositories"),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let config: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_github(github: GitHubConfig) -> Self {
        Self {
            github,
            migration: MigrationConfig::default(),
            git: GitConfig::default(),
            formatter: FormatterConfig::default(),
            workspace: WorkspaceConfig::default(),
            run: RunConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.migration.legacy_source == self.migration.canonical_source {
            return Err(AppError::Config(
                "migration.legacy_source and migration.canonical_source are identical".to_string(),
            ));
        }
        Ok(())
    }

    /// Fails unless an access token was supplied. Only runs that talk to the
    /// remote need one.
    pub fn require_token(&self) -> Result<()> {
        if self.github.token.trim().is_empty() {
            return Err(AppError::Config(
                "github.token must be set (or REHOME__GITHUB__TOKEN)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn access_token(&self) -> &str {
        &self.github.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_applies_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rehome.toml");
        std::fs::write(
            &path,
            "[github]\ntoken = \"abc\"\n\n[run]\nrepositories = [\"terraform-a\", \"other-org/terraform-b\"]\n",
        )
        .unwrap();

        let config = AppConfig::load(path.to_str()).unwrap();
        assert_eq!(config.github.organization, "gmi-platform");
        assert_eq!(config.github.base_branch, "main");
        assert_eq!(config.migration.canonical_version, "~> 0.1");
        assert_eq!(config.formatter.args, vec!["fmt", "-recursive"]);
        assert_eq!(config.run.repositories.len(), 2);
        assert_eq!(config.run.log_path, PathBuf::from("pr_links.txt"));
        assert!(!config.run.dry_run);
    }

    #[test]
    fn test_missing_token_is_rejected_for_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rehome.toml");
        std::fs::write(&path, "[migration]\nfile_extension = \"hcl\"\n").unwrap();

        let config = AppConfig::load(path.to_str()).unwrap();
        assert_eq!(config.migration.file_extension, "hcl");
        let err = config.require_token().unwrap_err();
        assert!(err.to_string().contains("github.token"));
    }

    #[test]
    fn test_load_rejects_identical_sources() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rehome.toml");
        std::fs::write(
            &path,
            "[migration]\nlegacy_source = \"a/b\"\ncanonical_source = \"a/b\"\n",
        )
        .unwrap();

        assert!(matches!(
            AppConfig::load(path.to_str()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let github = GitHubConfig::with_token("ghp_secret");
        let rendered = format!("{github:?}");
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
