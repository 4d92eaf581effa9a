use std::collections::HashMap;
use std::path::Path;

use git2::{Oid, Repository as Git2Repo, Sort};
use tracing::debug;

use crate::error::{ReleaseError, Result};
use crate::git::CommitInfo;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    /// Maps every tagged commit to the names of the tags pointing at it.
    fn tags_by_commit(&self) -> Result<HashMap<Oid, Vec<String>>> {
        let mut tagged: HashMap<Oid, Vec<String>> = HashMap::new();
        let names = self.repo.tag_names(None)?;

        for name in names.iter().flatten() {
            let reference = match self.repo.find_reference(&format!("refs/tags/{}", name)) {
                Ok(reference) => reference,
                Err(_) => continue,
            };
            // Tags on trees or blobs never appear in a commit walk
            if let Ok(commit) = reference.peel_to_commit() {
                tagged.entry(commit.id()).or_default().push(name.to_string());
            }
        }

        for names in tagged.values_mut() {
            names.sort();
        }

        Ok(tagged)
    }
}

impl super::Repository for Git2Repository {
    fn head_oid(&self) -> Result<Oid> {
        let head = self.repo.head()?;
        let commit = head.peel_to_commit()?;
        Ok(commit.id())
    }

    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>> {
        let reference_name = format!("refs/tags/{}", tag_name);

        match self.repo.find_reference(&reference_name) {
            Ok(reference) => {
                let commit = reference.peel_to_commit().map_err(|e| {
                    ReleaseError::Git(git2::Error::from_str(&format!(
                        "Cannot peel tag '{}' to a commit: {}",
                        tag_name, e
                    )))
                })?;

                Ok(Some(commit.id()))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn latest_tag_before(
        &self,
        to: Oid,
        accept: &dyn Fn(&str) -> bool,
    ) -> Result<Option<(String, Oid)>> {
        let tagged = self.tags_by_commit()?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(to)?;

        for oid in revwalk {
            let oid = oid?;
            if oid == to {
                continue;
            }
            if let Some(names) = tagged.get(&oid) {
                if let Some(name) = names.iter().find(|name| accept(name)) {
                    debug!(tag = %name, commit = %oid, "found previous tag");
                    return Ok(Some((name.clone(), oid)));
                }
            }
        }

        Ok(None)
    }

    fn get_commits_between(&self, from_oid: Option<Oid>, to_oid: Oid) -> Result<Vec<CommitInfo>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(to_oid)?;

        if let Some(from_oid) = from_oid {
            revwalk.hide(from_oid)?;
        }

        let mut commits = Vec::new();

        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = self.repo.find_commit(oid)?;

            let message = commit.message().unwrap_or("(empty message)").to_string();
            let author = commit.author().name().unwrap_or("unknown").to_string();

            commits.push(CommitInfo {
                hash: oid.to_string(),
                message,
                author,
                time: commit.time().seconds(),
            });
        }

        commits.reverse();
        Ok(commits)
    }

    fn is_shallow(&self) -> bool {
        self.repo.is_shallow()
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        match self.repo.find_remote(remote) {
            Ok(remote) => Ok(remote.url().map(|url| url.to_string())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Repository;
    use tempfile::TempDir;

    fn commit(repo: &Git2Repo, message: &str) -> Oid {
        let sig = git2::Signature::now("Test Author", "test@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_commits_between_tags() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let first = commit(&raw, "feat: first");
        raw.tag_lightweight("v0.1.0", &raw.find_object(first, None).unwrap(), false)
            .unwrap();
        commit(&raw, "fix: second");
        let third = commit(&raw, "feat: third");

        let repo = Git2Repository::from_git2(raw);
        assert_eq!(repo.head_oid().unwrap(), third);

        let previous = repo.latest_tag_before(third, &|_| true).unwrap();
        assert_eq!(previous, Some(("v0.1.0".to_string(), first)));

        let commits = repo.get_commits_between(Some(first), third).unwrap();
        let messages: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["fix: second", "feat: third"]);
    }

    #[test]
    fn test_tags_on_the_end_commit_are_not_previous() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let first = commit(&raw, "feat: first");
        raw.tag_lightweight("v1.0.0", &raw.find_object(first, None).unwrap(), false)
            .unwrap();
        let head = commit(&raw, "fix: second");
        let head_obj = raw.find_object(head, None).unwrap();
        raw.tag_lightweight("v2.0.0-rc.1", &head_obj, false).unwrap();
        raw.tag_lightweight("v2.0.0", &head_obj, false).unwrap();
        drop(head_obj);

        let repo = Git2Repository::from_git2(raw);
        let previous = repo.latest_tag_before(head, &|name| name != "v2.0.0").unwrap();
        assert_eq!(previous, Some(("v1.0.0".to_string(), first)));
    }

    #[test]
    fn test_annotated_tag_peels_to_commit() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let oid = commit(&raw, "chore: init");
        let sig = git2::Signature::now("Test Author", "test@example.com").unwrap();
        raw.tag(
            "v1.0.0",
            &raw.find_object(oid, None).unwrap(),
            &sig,
            "release",
            false,
        )
        .unwrap();

        let repo = Git2Repository::from_git2(raw);
        assert_eq!(repo.find_tag_oid("v1.0.0").unwrap(), Some(oid));
        assert_eq!(repo.find_tag_oid("v9.9.9").unwrap(), None);
        assert!(!repo.is_shallow());
        assert_eq!(repo.remote_url("origin").unwrap(), None);
    }
}
