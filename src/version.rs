use std::fmt;

use tracing::debug;

use crate::error::{ReleaseError, Result};
use crate::warnings::ReleaseWarning;

/// Prefix that tag references carry when the pipeline is triggered by a tag push.
pub const TAG_REF_PREFIX: &str = "refs/tags/";

/// The version identifier of a release, derived once from the triggering tag.
///
/// There is no mutating API: every later stage receives a clone of the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    /// Wraps an already extracted version string.
    pub fn new(version: impl Into<String>) -> Self {
        ReleaseVersion(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the version as semver, ignoring a leading `v` or `V`.
    ///
    /// # Returns
    /// * `Some(Version)` - The version is semver-shaped (e.g. "v1.2.3", "2.0.0-rc.1")
    /// * `None` - Anything else (e.g. "nightly", "v1.2")
    pub fn semver(&self) -> Option<semver::Version> {
        let clean = self
            .0
            .strip_prefix('v')
            .or_else(|| self.0.strip_prefix('V'))
            .unwrap_or(&self.0);
        semver::Version::parse(clean).ok()
    }

    /// Whether the version carries a semver pre-release component.
    pub fn is_prerelease(&self) -> bool {
        self.semver().map(|v| !v.pre.is_empty()).unwrap_or(false)
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the release version from a tag reference.
///
/// Strips the `refs/tags/` prefix. A reference without the prefix is returned
/// unchanged; no format validation is performed.
///
/// # Example
/// ```
/// use git_release::version::extract_version;
///
/// assert_eq!(extract_version("refs/tags/v1.2.3").as_str(), "v1.2.3");
/// assert_eq!(extract_version("v1.2.3").as_str(), "v1.2.3");
/// ```
pub fn extract_version(tag_ref: &str) -> ReleaseVersion {
    let version = tag_ref.strip_prefix(TAG_REF_PREFIX).unwrap_or(tag_ref);
    debug!(tag_ref, version, "extracted release version");
    ReleaseVersion::new(version)
}

/// Extracts the version and collects non-fatal warnings about its shape.
///
/// When `strict` is set, versions that are not semver-shaped are rejected
/// instead of only being reported.
pub fn extract_version_checked(
    tag_ref: &str,
    strict: bool,
) -> Result<(ReleaseVersion, Vec<ReleaseWarning>)> {
    let version = extract_version(tag_ref);
    let mut warnings = Vec::new();

    if !tag_ref.starts_with(TAG_REF_PREFIX) {
        warnings.push(ReleaseWarning::UnprefixedRef {
            reference: tag_ref.to_string(),
        });
    }

    if strict && version.as_str().is_empty() {
        return Err(ReleaseError::version(format!(
            "tag reference '{}' yields an empty version",
            tag_ref
        )));
    }

    if version.semver().is_none() {
        if strict {
            return Err(ReleaseError::version(format!(
                "'{}' is not a semantic version",
                version
            )));
        }
        warnings.push(ReleaseWarning::NonSemverVersion {
            version: version.to_string(),
        });
    }

    Ok((version, warnings))
}
