//! Named stage outputs for the orchestrating platform.
//!
//! When `GITHUB_OUTPUT` names a file, values are appended to it so later
//! pipeline stages can consume them by name.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use tracing::debug;

use crate::error::Result;

/// Environment variable naming the output file
pub const OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Output carrying the extracted version
pub const VERSION_OUTPUT: &str = "version";

/// Output carrying the release notes body
pub const CONTENT_OUTPUT: &str = "content";

#[derive(Debug, Clone, Default)]
pub struct StageOutputs {
    path: Option<PathBuf>,
}

impl StageOutputs {
    /// Outputs written to the file named by `GITHUB_OUTPUT`, if set.
    pub fn from_env() -> Self {
        StageOutputs {
            path: std::env::var_os(OUTPUT_ENV)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        StageOutputs {
            path: Some(path.into()),
        }
    }

    /// Appends `name=value`; multi-line values use a heredoc delimiter.
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(format_output(name, value).as_bytes())?;
        debug!(name, len = value.len(), "stage output written");
        Ok(())
    }
}

fn format_output(name: &str, value: &str) -> String {
    if !value.contains('\n') && !value.contains('\r') {
        return format!("{}={}\n", name, value);
    }

    let mut delimiter = String::from("GIT_RELEASE_EOF");
    while value.lines().any(|line| line == delimiter) {
        delimiter.push('_');
    }

    let mut out = format!("{}<<{}\n{}", name, delimiter, value);
    if !value.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&delimiter);
    out.push('\n');
    out
}
