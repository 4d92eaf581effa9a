use git_release::version::{extract_version, extract_version_checked, ReleaseVersion};
use git_release::warnings::ReleaseWarning;

#[test]
fn test_prefix_stripping_is_exact() {
    let cases = [
        "v1.2.3",
        "v2.0.0-rc.1",
        "release-42",
        "v",
        "nested/tag/name",
        "refs/tags/v1",
        " v1.0.0 ",
        "ünïcode",
    ];

    for tail in cases {
        let reference = format!("refs/tags/{}", tail);
        assert_eq!(
            extract_version(&reference).as_str(),
            tail,
            "extracting from '{}'",
            reference
        );
    }
}

#[test]
fn test_extraction_is_idempotent() {
    let first = extract_version("refs/tags/v2.0.0");
    let second = extract_version("refs/tags/v2.0.0");
    assert_eq!(first, second);
    assert_eq!(first, ReleaseVersion::new("v2.0.0"));
}

#[test]
fn test_unprefixed_reference_passes_through() {
    assert_eq!(extract_version("refs/heads/main").as_str(), "refs/heads/main");
    assert_eq!(extract_version("").as_str(), "");
}

#[test]
fn test_lenient_mode_accepts_any_tag() {
    let (version, warnings) = extract_version_checked("refs/tags/release-42", false).unwrap();
    assert_eq!(version.as_str(), "release-42");
    assert!(warnings
        .iter()
        .any(|w| matches!(w, ReleaseWarning::NonSemverVersion { .. })));
}

#[test]
fn test_strict_mode_accepts_semver() {
    let (version, warnings) = extract_version_checked("refs/tags/v2.0.0", true).unwrap();
    assert_eq!(version.as_str(), "v2.0.0");
    assert!(warnings.is_empty());
}

#[test]
fn test_warning_messages() {
    let warning = ReleaseWarning::EmptyRange {
        version: "v1.0.1".to_string(),
        previous_tag: Some("v1.0.0".to_string()),
    };
    let message = warning.to_string();
    assert!(message.contains("v1.0.0"), "got: {}", message);
    assert!(message.contains("v1.0.1"), "got: {}", message);

    let warning = ReleaseWarning::UnprefixedRef {
        reference: "main".to_string(),
    };
    assert!(warning.to_string().contains("'main'"));
}
