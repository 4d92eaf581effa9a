//! `cliff.toml`-compatible changelog configuration.
//!
//! Only the keys the generator understands are read; everything else in the
//! file is ignored so existing configurations load unchanged.

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{ReleaseError, Result};

/// Conventional location of the changelog configuration
pub const DEFAULT_CHANGELOG_CONFIG: &str = "cliff.toml";

/// Tags considered release boundaries when no `tag_pattern` is configured
pub const DEFAULT_TAG_PATTERN: &str = "^v";

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChangelogConfig {
    #[serde(default)]
    pub changelog: ChangelogSection,

    #[serde(default)]
    pub git: GitSection,
}

/// The `[changelog]` table: text around the rendered release.
#[derive(Debug, Deserialize, Clone)]
pub struct ChangelogSection {
    pub header: Option<String>,

    pub footer: Option<String>,

    /// Template for the release body; present in many cliff configs but not rendered
    pub body: Option<String>,

    #[serde(default = "default_true")]
    pub trim: bool,
}

impl Default for ChangelogSection {
    fn default() -> Self {
        ChangelogSection {
            header: None,
            footer: None,
            body: None,
            trim: true,
        }
    }
}

/// The `[git]` table: which commits and tags make up a release.
#[derive(Debug, Deserialize, Clone)]
pub struct GitSection {
    #[serde(default = "default_true")]
    pub conventional_commits: bool,

    #[serde(default = "default_true")]
    pub filter_unconventional: bool,

    /// Drop commits that no parser matched instead of listing them under "Other"
    #[serde(default)]
    pub filter_commits: bool,

    pub tag_pattern: Option<String>,

    #[serde(default)]
    pub commit_parsers: Vec<CommitParser>,
}

impl Default for GitSection {
    fn default() -> Self {
        GitSection {
            conventional_commits: true,
            filter_unconventional: true,
            filter_commits: false,
            tag_pattern: None,
            commit_parsers: Vec::new(),
        }
    }
}

/// Routes commits whose first line matches `message` into `group`, or drops them.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CommitParser {
    pub message: Option<String>,

    pub group: Option<String>,

    #[serde(default)]
    pub skip: bool,
}

impl CommitParser {
    fn group(message: &str, group: &str) -> Self {
        CommitParser {
            message: Some(message.to_string()),
            group: Some(group.to_string()),
            skip: false,
        }
    }

    fn skip(message: &str) -> Self {
        CommitParser {
            message: Some(message.to_string()),
            group: None,
            skip: true,
        }
    }
}

/// Parser set used when the configuration declares none.
pub fn default_commit_parsers() -> Vec<CommitParser> {
    vec![
        CommitParser::group("^feat", "Features"),
        CommitParser::group("^fix", "Bug Fixes"),
        CommitParser::group("^doc", "Documentation"),
        CommitParser::group("^perf", "Performance"),
        CommitParser::group("^refactor", "Refactor"),
        CommitParser::group("^style", "Styling"),
        CommitParser::group("^test", "Testing"),
        CommitParser::skip(r"^chore\(release\)"),
        CommitParser::group("^(chore|ci|build)", "Miscellaneous Tasks"),
        CommitParser::group("^revert", "Revert"),
    ]
}

/// A commit parser with its pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledParser {
    pub pattern: Regex,
    pub group: Option<String>,
    pub skip: bool,
}

impl ChangelogConfig {
    /// Loads a changelog configuration file.
    ///
    /// # Returns
    /// * `Ok(ChangelogConfig)` - Parsed configuration
    /// * `Err` - If the file is missing, unreadable or not valid TOML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ReleaseError::changelog(format!(
                "cannot read changelog config '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml(&content).map_err(|e| {
            ReleaseError::changelog(format!("invalid changelog config '{}': {}", path.display(), e))
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Compiles the configured parsers, falling back to [default_commit_parsers].
    ///
    /// Parsers without a `message` pattern match every commit.
    pub fn compiled_parsers(&self) -> Result<Vec<CompiledParser>> {
        let parsers = if self.git.commit_parsers.is_empty() {
            default_commit_parsers()
        } else {
            self.git.commit_parsers.clone()
        };

        parsers
            .into_iter()
            .map(|parser| {
                let source = parser.message.as_deref().unwrap_or(".*");
                let pattern = Regex::new(source).map_err(|e| {
                    ReleaseError::changelog(format!("invalid commit parser '{}': {}", source, e))
                })?;
                Ok(CompiledParser {
                    pattern,
                    group: parser.group,
                    skip: parser.skip,
                })
            })
            .collect()
    }

    pub fn compiled_tag_pattern(&self) -> Result<Regex> {
        let source = self
            .git
            .tag_pattern
            .as_deref()
            .unwrap_or(DEFAULT_TAG_PATTERN);
        Regex::new(source)
            .map_err(|e| ReleaseError::changelog(format!("invalid tag_pattern '{}': {}", source, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_tables_missing() {
        let config = ChangelogConfig::from_toml("").unwrap();
        assert!(config.changelog.trim);
        assert!(config.git.conventional_commits);
        assert!(config.git.filter_unconventional);
        assert!(!config.git.filter_commits);
        assert_eq!(config.compiled_parsers().unwrap().len(), default_commit_parsers().len());
    }

    #[test]
    fn test_parses_cliff_style_config() {
        let config = ChangelogConfig::from_toml(
            r##"
[changelog]
header = "# Changelog\n"
body = "{% for group, commits in commits | group_by(attribute=\"group\") %}{% endfor %}"
trim = false

[git]
conventional_commits = true
filter_unconventional = false
tag_pattern = "v[0-9].*"
commit_parsers = [
  { message = "^feat", group = "<!-- 0 -->Features" },
  { message = "^chore\\(release\\)", skip = true },
]
protect_breaking_commits = false
"##,
        )
        .unwrap();

        assert_eq!(config.changelog.header.as_deref(), Some("# Changelog\n"));
        assert!(config.changelog.body.is_some());
        assert!(!config.changelog.trim);
        assert!(!config.git.filter_unconventional);
        assert_eq!(config.git.commit_parsers.len(), 2);
        assert!(config.git.commit_parsers[1].skip);
        assert!(config.compiled_tag_pattern().unwrap().is_match("v1.0.0"));
    }

    #[test]
    fn test_invalid_parser_regex_is_an_error() {
        let config = ChangelogConfig::from_toml(
            r#"
[git]
commit_parsers = [{ message = "^feat(", group = "Features" }]
"#,
        )
        .unwrap();

        let err = config.compiled_parsers().unwrap_err();
        assert!(err.to_string().contains("invalid commit parser"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ChangelogConfig::load("/nonexistent/cliff.toml").unwrap_err();
        assert!(err.to_string().starts_with("Changelog error"));
    }
}
