//! Release notes generation
//!
//! Collects the commits that make up a release and renders them as Markdown,
//! grouped by the commit parsers of a `cliff.toml`-style configuration.

pub mod config;

pub use config::{ChangelogConfig, CommitParser, CompiledParser, DEFAULT_CHANGELOG_CONFIG};

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info, instrument};

use crate::conventional::{parse_or_plain, plain_commit, ParsedCommit};
use crate::error::{ReleaseError, Result};
use crate::git::{CommitInfo, Repository};
use crate::version::ReleaseVersion;
use crate::warnings::ReleaseWarning;

/// Group for commits no parser matched
pub const OTHER_GROUP: &str = "Other";

static ORDERING_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<!--.*?-->\s*").expect("Invalid regex"));

/// Rendered release notes for one version.
///
/// Produced by the changelog stage and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNotes(String);

impl ReleaseNotes {
    pub fn new(body: impl Into<String>) -> Self {
        ReleaseNotes(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ReleaseNotes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the changelog stage hands to the next stage.
#[derive(Debug, Clone)]
pub struct ChangelogOutput {
    pub notes: ReleaseNotes,
    /// Tag the release range starts after, if any
    pub previous_tag: Option<String>,
    /// Number of commits rendered
    pub commit_count: usize,
    pub warnings: Vec<ReleaseWarning>,
}

#[derive(Debug, Clone)]
struct Entry {
    parsed: ParsedCommit,
    group: String,
}

/// Changelog generator
pub struct ChangelogGenerator {
    config: ChangelogConfig,
    parsers: Vec<CompiledParser>,
    tag_pattern: Regex,
}

impl ChangelogGenerator {
    /// Create a generator, compiling the configured patterns.
    ///
    /// # Returns
    /// * `Err` - If a commit parser or the tag pattern is not a valid regex
    pub fn new(config: ChangelogConfig) -> Result<Self> {
        let parsers = config.compiled_parsers()?;
        let tag_pattern = config.compiled_tag_pattern()?;

        Ok(ChangelogGenerator {
            config,
            parsers,
            tag_pattern,
        })
    }

    /// Load a configuration file and create a generator from it
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::new(ChangelogConfig::load(path)?)
    }

    /// Generate the release notes for `version`.
    ///
    /// The range ends at the commit tagged `version`, or at HEAD when the tag
    /// does not exist yet. With `latest_only` it starts after the nearest
    /// earlier release tag; otherwise it spans the whole history.
    ///
    /// # Returns
    /// * `Err` - If the history is shallow or cannot be read
    #[instrument(skip(self, repo, version), fields(version = %version))]
    pub fn generate<R: Repository + ?Sized>(
        &self,
        repo: &R,
        version: &ReleaseVersion,
        latest_only: bool,
    ) -> Result<ChangelogOutput> {
        if repo.is_shallow() {
            return Err(ReleaseError::changelog(
                "repository is a shallow clone; release notes need the full history",
            ));
        }

        let mut warnings = Vec::new();
        if let Some(body) = &self.config.changelog.body {
            debug!(template_len = body.len(), "body template ignored");
            warnings.push(ReleaseWarning::IgnoredTemplate {
                key: "changelog.body".to_string(),
            });
        }

        let end = match repo.find_tag_oid(version.as_str())? {
            Some(oid) => oid,
            None => {
                debug!("version tag not found locally, using HEAD");
                repo.head_oid()?
            }
        };

        let previous = if latest_only {
            let accept = |name: &str| name != version.as_str() && self.tag_pattern.is_match(name);
            repo.latest_tag_before(end, &accept)?
        } else {
            None
        };

        let commits = repo.get_commits_between(previous.as_ref().map(|(_, oid)| *oid), end)?;
        let previous_tag = previous.map(|(name, _)| name);

        info!(
            previous_tag = previous_tag.as_deref().unwrap_or("<none>"),
            commit_count = commits.len(),
            "collected release range"
        );

        let entries = self.classify(&commits);
        if entries.is_empty() {
            warnings.push(ReleaseWarning::EmptyRange {
                version: version.to_string(),
                previous_tag: previous_tag.clone(),
            });
        }

        let notes = self.render(version, &entries, release_date(&commits));

        Ok(ChangelogOutput {
            notes,
            previous_tag,
            commit_count: entries.len(),
            warnings,
        })
    }

    /// Render notes for an explicit list of commits (oldest first).
    pub fn render_commits(
        &self,
        version: &ReleaseVersion,
        commits: &[CommitInfo],
    ) -> ReleaseNotes {
        let entries = self.classify(commits);
        self.render(version, &entries, release_date(commits))
    }

    fn classify(&self, commits: &[CommitInfo]) -> Vec<Entry> {
        let git = &self.config.git;
        let mut entries = Vec::new();

        for commit in commits {
            let (parsed, conventional) = if git.conventional_commits {
                parse_or_plain(&commit.message)
            } else {
                (plain_commit(&commit.message), false)
            };

            if git.conventional_commits && git.filter_unconventional && !conventional {
                debug!(commit = commit.short_hash(), "skipping unconventional commit");
                continue;
            }

            let header = commit.message.lines().next().unwrap_or("");
            let parser = self.parsers.iter().find(|p| p.pattern.is_match(header));

            let group = match parser {
                Some(parser) if parser.skip => continue,
                Some(CompiledParser {
                    group: Some(group), ..
                }) => group.clone(),
                _ if git.filter_commits => continue,
                _ => OTHER_GROUP.to_string(),
            };

            entries.push(Entry { parsed, group });
        }

        entries
    }

    fn render(&self, version: &ReleaseVersion, entries: &[Entry], date: DateTime<Utc>) -> ReleaseNotes {
        let mut out = String::new();

        if let Some(header) = &self.config.changelog.header {
            out.push_str(header);
            if !header.ends_with('\n') {
                out.push('\n');
            }
        }

        out.push_str(&format!("## [{}] - {}\n", version, date.format("%Y-%m-%d")));

        for group in self.group_order(entries) {
            out.push_str(&format!("\n### {}\n\n", display_group(&group)));
            for entry in entries.iter().filter(|e| e.group == group) {
                out.push_str(&format_entry(&entry.parsed));
                out.push('\n');
            }
        }

        if let Some(footer) = &self.config.changelog.footer {
            out.push('\n');
            out.push_str(footer);
        }

        if self.config.changelog.trim {
            out = format!("{}\n", out.trim());
        }

        ReleaseNotes(out)
    }

    /// Groups in parser declaration order, then anything unmatched.
    fn group_order(&self, entries: &[Entry]) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        let declared = self
            .parsers
            .iter()
            .filter_map(|p| p.group.clone())
            .chain(std::iter::once(OTHER_GROUP.to_string()));

        for group in declared {
            if !order.contains(&group) && entries.iter().any(|e| e.group == group) {
                order.push(group);
            }
        }

        order
    }
}

fn display_group(group: &str) -> String {
    ORDERING_COMMENT.replace(group, "").to_string()
}

fn format_entry(parsed: &ParsedCommit) -> String {
    let mut line = String::from("- ");
    if let Some(scope) = &parsed.scope {
        line.push_str(&format!("*({})* ", scope));
    }
    if parsed.is_breaking_change {
        line.push_str("[**breaking**] ");
    }
    line.push_str(&upper_first(&parsed.description));
    line
}

fn upper_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Date of the newest commit in the range, or today for an empty range.
fn release_date(commits: &[CommitInfo]) -> DateTime<Utc> {
    commits
        .iter()
        .map(|c| c.time)
        .max()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(message: &str, time: i64) -> CommitInfo {
        CommitInfo {
            hash: "abc1234567890".to_string(),
            message: message.to_string(),
            author: "Test Author".to_string(),
            time,
        }
    }

    fn generator(toml: &str) -> ChangelogGenerator {
        ChangelogGenerator::new(ChangelogConfig::from_toml(toml).unwrap()).unwrap()
    }

    #[test]
    fn test_render_groups_in_parser_order() {
        let generator = generator("");
        let notes = generator.render_commits(
            &ReleaseVersion::new("v2.0.0"),
            &[
                commit("fix(core): handle empty input", 1_700_000_000),
                commit("feat: add export", 1_700_086_400),
            ],
        );

        assert_eq!(
            notes.as_str(),
            "## [v2.0.0] - 2023-11-15\n\n### Features\n\n- Add export\n\n### Bug Fixes\n\n- *(core)* Handle empty input\n"
        );
    }

    #[test]
    fn test_unconventional_commits_filtered_by_default() {
        let notes = generator("").render_commits(
            &ReleaseVersion::new("v1.0.0"),
            &[commit("Update README", 0), commit("feat: one", 0)],
        );
        assert!(!notes.as_str().contains("README"));
        assert!(notes.as_str().contains("- One"));
    }

    #[test]
    fn test_unmatched_commits_go_to_other() {
        let notes = generator(
            r#"
[git]
filter_unconventional = false
commit_parsers = [{ message = "^feat", group = "Features" }]
"#,
        )
        .render_commits(
            &ReleaseVersion::new("v1.0.0"),
            &[commit("Update README", 0), commit("feat: one", 0)],
        );
        let text = notes.as_str();
        assert!(text.find("### Features").unwrap() < text.find("### Other").unwrap());
        assert!(text.contains("- Update README"));
    }

    #[test]
    fn test_skip_parsers_and_filter_commits() {
        let notes = generator(
            r#"
[git]
filter_commits = true
commit_parsers = [
  { message = "^chore\\(release\\)", skip = true },
  { message = "^fix", group = "<!-- 1 -->Bug Fixes" },
]
"#,
        )
        .render_commits(
            &ReleaseVersion::new("v1.0.1"),
            &[
                commit("chore(release): v1.0.1", 0),
                commit("docs: typo", 0),
                commit("fix: crash", 0),
            ],
        );
        let text = notes.as_str();
        assert!(!text.contains("release"));
        assert!(!text.contains("typo"));
        assert!(text.contains("### Bug Fixes\n\n- Crash"));
    }

    #[test]
    fn test_breaking_marker_and_header_footer() {
        let notes = generator(
            r##"
[changelog]
header = "# Changelog"
footer = "<!-- generated -->"
"##,
        )
        .render_commits(&ReleaseVersion::new("v3.0.0"), &[commit("feat(api)!: drop v1", 0)]);
        let text = notes.as_str();
        assert!(text.starts_with("# Changelog\n## [v3.0.0]"));
        assert!(text.contains("- *(api)* [**breaking**] Drop v1"));
        assert!(text.ends_with("<!-- generated -->\n"));
    }

    #[test]
    fn test_plain_mode_uses_first_line() {
        let notes = generator(
            r#"
[git]
conventional_commits = false
commit_parsers = [{ group = "Changes" }]
"#,
        )
        .render_commits(
            &ReleaseVersion::new("nightly"),
            &[commit("Tweak build\n\nlong body", 0)],
        );
        assert!(notes.as_str().contains("### Changes\n\n- Tweak build"));
    }
}
