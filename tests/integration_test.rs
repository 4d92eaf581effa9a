// tests/integration_test.rs
use std::path::Path;
use std::process::{Command, Output};

use git2::{Repository, Signature};
use tempfile::TempDir;

const CLIFF: &str = r#"
[git]
commit_parsers = [
  { message = "^feat", group = "Features" },
  { message = "^fix", group = "Bug Fixes" },
]
"#;

fn git_release(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_git-release"))
        .args(args)
        .current_dir(dir)
        .env_remove("GITHUB_OUTPUT")
        .env_remove("GITHUB_REF")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute git-release")
}

fn commit(repo: &Repository, message: &str) -> git2::Oid {
    let sig = Signature::now("Test Author", "test@example.com").unwrap();
    let tree_id = repo.index().unwrap().write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

fn tag(repo: &Repository, name: &str, oid: git2::Oid) {
    repo.tag_lightweight(name, &repo.find_object(oid, None).unwrap(), false)
        .unwrap();
}

/// A repository with v0.1.0 released and v0.2.0 tagged on HEAD
fn release_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    let first = commit(&repo, "feat: first feature");
    tag(&repo, "v0.1.0", first);
    commit(&repo, "fix: first bug");
    let head = commit(&repo, "feat: second feature");
    tag(&repo, "v0.2.0", head);

    std::fs::write(dir.path().join("cliff.toml"), CLIFF).unwrap();
    dir
}

#[test]
fn test_git_release_help() {
    let dir = TempDir::new().unwrap();
    let output = git_release(dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("git-release"));
    assert!(stdout.contains("changelog"));
    assert!(stdout.contains("gate"));
}

#[test]
fn test_version_command_prints_and_exports() {
    let dir = TempDir::new().unwrap();
    let output_file = dir.path().join("github_output");

    let output = Command::new(env!("CARGO_BIN_EXE_git-release"))
        .args(["version", "--ref", "refs/tags/v2.0.0"])
        .current_dir(dir.path())
        .env("GITHUB_OUTPUT", &output_file)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "v2.0.0\n");
    assert_eq!(
        std::fs::read_to_string(&output_file).unwrap(),
        "version=v2.0.0\n"
    );
}

#[test]
fn test_version_command_reads_github_ref() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_git-release"))
        .arg("version")
        .current_dir(dir.path())
        .env_remove("GITHUB_OUTPUT")
        .env("GITHUB_REF", "refs/tags/v3.1.4")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "v3.1.4\n");
}

#[test]
fn test_version_command_strict_rejects_non_semver() {
    let dir = TempDir::new().unwrap();
    let output = git_release(dir.path(), &["version", "--ref", "refs/tags/nightly", "--strict"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_changelog_command_on_real_repository() {
    let dir = release_repo();
    let output = git_release(dir.path(), &["changelog", "--tag", "v0.2.0"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let notes = String::from_utf8(output.stdout).unwrap();
    assert!(notes.starts_with("## [v0.2.0] - "));
    assert!(notes.contains("### Features\n\n- Second feature"));
    assert!(notes.contains("### Bug Fixes\n\n- First bug"));
    assert!(!notes.contains("First feature"));
}

#[test]
fn test_changelog_command_all_history() {
    let dir = release_repo();
    let output = git_release(dir.path(), &["changelog", "--tag", "v0.2.0", "--all"]);

    assert!(output.status.success());
    let notes = String::from_utf8(output.stdout).unwrap();
    assert!(notes.contains("- First feature"));
}

#[test]
fn test_release_dry_run() {
    let dir = release_repo();
    let output = git_release(dir.path(), &["release", "--ref", "refs/tags/v0.2.0", "--dry-run"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Release pipeline"));
    assert!(stdout.contains("v0.2.0"));
}

#[test]
fn test_release_with_broken_changelog_config_fails() {
    let dir = release_repo();
    std::fs::write(dir.path().join("cliff.toml"), "[git\n").unwrap();

    let output = git_release(dir.path(), &["release", "--ref", "refs/tags/v0.2.0", "--dry-run"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("publish (skipped)"));
}

#[test]
fn test_publish_dry_run_reads_notes_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("notes.md"), "## [v1.0.0]\n").unwrap();

    let output = git_release(
        dir.path(),
        &["publish", "--tag", "v1.0.0", "--notes-file", "notes.md", "--dry-run"],
    );

    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().contains("v1.0.0"));
}
