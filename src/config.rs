use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::changelog::DEFAULT_CHANGELOG_CONFIG;
use crate::error::{ReleaseError, Result};

/// Represents the complete configuration for git-release.
///
/// Contains release, changelog, publishing and pull-request gate settings.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub release: ReleaseConfig,

    #[serde(default)]
    pub changelog: ChangelogSettings,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub gate: GateConfig,
}

fn default_true() -> bool {
    true
}

/// Settings for version extraction and release range selection.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReleaseConfig {
    /// Reject tags that are not semantic versions
    #[serde(default)]
    pub strict_semver: bool,

    /// Only include commits since the previous release tag
    #[serde(default = "default_true")]
    pub latest_only: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            strict_semver: false,
            latest_only: true,
        }
    }
}

fn default_changelog_config() -> PathBuf {
    PathBuf::from(DEFAULT_CHANGELOG_CONFIG)
}

/// Where the changelog configuration lives.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChangelogSettings {
    #[serde(default = "default_changelog_config")]
    pub config: PathBuf,
}

impl Default for ChangelogSettings {
    fn default() -> Self {
        ChangelogSettings {
            config: default_changelog_config(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

/// Configuration for the release service.
///
/// The token itself is never stored here, only the name of the environment
/// variable that holds it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PublishConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// "owner/name"; inferred from the environment or the origin remote when unset
    #[serde(default)]
    pub repository: Option<String>,

    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default)]
    pub draft: bool,

    #[serde(default)]
    pub prerelease: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        PublishConfig {
            api_url: default_api_url(),
            repository: None,
            token_env: default_token_env(),
            draft: false,
            prerelease: false,
        }
    }
}

fn default_toolchain() -> String {
    "stable".to_string()
}

fn default_lint_timeout_secs() -> u64 {
    600
}

fn default_test_args() -> Vec<String> {
    vec!["test".to_string()]
}

fn default_lint_args() -> Vec<String> {
    vec!["clippy".to_string(), "--tests".to_string()]
}

/// Configuration for the pull-request gate jobs.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GateConfig {
    #[serde(default = "default_toolchain")]
    pub test_toolchain: String,

    #[serde(default = "default_toolchain")]
    pub lint_toolchain: String,

    /// Upper bound on the lint job; the test job is unbounded
    #[serde(default = "default_lint_timeout_secs")]
    pub lint_timeout_secs: u64,

    /// Run `rustup toolchain install` before each job
    #[serde(default)]
    pub install_toolchain: bool,

    /// Arguments passed to `cargo` for the test job
    #[serde(default = "default_test_args")]
    pub test_args: Vec<String>,

    /// Arguments passed to `cargo` for the lint job
    #[serde(default = "default_lint_args")]
    pub lint_args: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            test_toolchain: default_toolchain(),
            lint_toolchain: default_toolchain(),
            lint_timeout_secs: default_lint_timeout_secs(),
            install_toolchain: false,
            test_args: default_test_args(),
            lint_args: default_lint_args(),
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitrelease.toml` in current directory
/// 3. `.gitrelease.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let path = if let Some(path) = config_path {
        path.to_path_buf()
    } else if Path::new("./gitrelease.toml").exists() {
        PathBuf::from("./gitrelease.toml")
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(".gitrelease.toml");
        if config_path.exists() {
            config_path
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config_str = fs::read_to_string(&path).map_err(|e| {
        ReleaseError::config(format!("cannot read '{}': {}", path.display(), e))
    })?;

    toml::from_str(&config_str)
        .map_err(|e| ReleaseError::config(format!("invalid '{}': {}", path.display(), e)))
}
