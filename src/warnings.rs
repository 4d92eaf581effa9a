use std::fmt;

/// Non-fatal conditions met while running a release.
/// They are reported to the user but never fail a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseWarning {
    /// The trigger reference did not start with `refs/tags/`
    UnprefixedRef { reference: String },
    /// The extracted version is not a semantic version
    NonSemverVersion { version: String },
    /// No commits were found in the changelog range
    EmptyRange {
        version: String,
        previous_tag: Option<String>,
    },
    /// The changelog config carries a template that is not rendered
    IgnoredTemplate { key: String },
}

impl fmt::Display for ReleaseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseWarning::UnprefixedRef { reference } => {
                write!(
                    f,
                    "Reference '{}' is not a tag reference; using it as the version",
                    reference
                )
            }
            ReleaseWarning::NonSemverVersion { version } => {
                write!(f, "Version '{}' is not a semantic version", version)
            }
            ReleaseWarning::EmptyRange {
                version,
                previous_tag,
            } => match previous_tag {
                Some(tag) => write!(
                    f,
                    "No commits between '{}' and '{}'; release notes will be empty",
                    tag, version
                ),
                None => write!(
                    f,
                    "No commits found for '{}'; release notes will be empty",
                    version
                ),
            },
            ReleaseWarning::IgnoredTemplate { key } => {
                write!(
                    f,
                    "Changelog template '{}' is not supported and was ignored",
                    key
                )
            }
        }
    }
}
