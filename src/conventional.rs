use std::sync::LazyLock;

use regex::Regex;

/// Footers that mark a commit as a breaking change
pub const BREAKING_CHANGE_INDICATORS: [&str; 2] = ["BREAKING CHANGE:", "BREAKING-CHANGE:"];

/// Parsed representation of a conventional commit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit {
    pub r#type: String,
    pub scope: Option<String>,
    pub description: String,
    pub is_breaking_change: bool,
}

static HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z]+)(?:\(([^)]+)\))?(!)?:\s*(.*)$").expect("Invalid regex")
});

/// Parse a commit message according to the conventional commits format.
///
/// Supports `type(scope)!: description`, `type(scope): description`,
/// `type!: description` and `type: description`. Only the first line is
/// matched; breaking-change footers may appear anywhere in the message.
///
/// # Returns
/// * `Some(ParsedCommit)` - The message follows the format
/// * `None` - Non-conventional message
pub fn parse_conventional_commit(message: &str) -> Option<ParsedCommit> {
    let header = message.lines().next().unwrap_or("").trim();
    let captures = HEADER_REGEX.captures(header)?;

    let r#type = captures.get(1)?.as_str().to_lowercase();
    let scope = captures.get(2).map(|m| m.as_str().to_string());
    let has_exclamation = captures.get(3).is_some();
    let description = captures
        .get(4)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let is_breaking_change = has_exclamation
        || BREAKING_CHANGE_INDICATORS
            .iter()
            .any(|indicator| message.contains(indicator));

    Some(ParsedCommit {
        r#type,
        scope,
        description,
        is_breaking_change,
    })
}

/// Parse a commit, falling back to the bare first line for non-conventional messages.
///
/// The boolean is `true` when the message was conventional.
pub fn parse_or_plain(message: &str) -> (ParsedCommit, bool) {
    match parse_conventional_commit(message) {
        Some(parsed) => (parsed, true),
        None => (plain_commit(message), false),
    }
}

/// A commit taken verbatim: no type, no scope, first line as description.
pub fn plain_commit(message: &str) -> ParsedCommit {
    ParsedCommit {
        r#type: String::new(),
        scope: None,
        description: message.lines().next().unwrap_or("").trim().to_string(),
        is_breaking_change: false,
    }
}
