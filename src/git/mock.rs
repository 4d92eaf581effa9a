use crate::error::{ReleaseError, Result};
use crate::git::{CommitInfo, Repository};
use git2::Oid;
use std::collections::HashMap;

const BASE_TIME: i64 = 1_700_000_000;

/// Mock repository with a single linear history, for testing without git
pub struct MockRepository {
    commits: Vec<(Oid, CommitInfo)>,
    tags: HashMap<String, Oid>,
    remotes: HashMap<String, String>,
    shallow: bool,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        MockRepository {
            commits: Vec::new(),
            tags: HashMap::new(),
            remotes: HashMap::new(),
            shallow: false,
        }
    }

    /// Append a commit on top of the history and return its OID.
    ///
    /// Commits are one day apart, starting at a fixed timestamp.
    pub fn push_commit(&mut self, message: impl Into<String>) -> Oid {
        let index = self.commits.len();
        let mut bytes = [0u8; 20];
        bytes[16..].copy_from_slice(&(index as u32 + 1).to_be_bytes());
        let oid = Oid::from_bytes(&bytes).unwrap_or_else(|_| Oid::zero());

        self.commits.push((
            oid,
            CommitInfo {
                hash: oid.to_string(),
                message: message.into(),
                author: "Mock Author".to_string(),
                time: BASE_TIME + index as i64 * 86_400,
            },
        ));
        oid
    }

    /// Add a tag pointing to an OID
    pub fn add_tag(&mut self, name: impl Into<String>, oid: Oid) {
        self.tags.insert(name.into(), oid);
    }

    /// Tag the current head
    pub fn tag_head(&mut self, name: impl Into<String>) {
        if let Some((oid, _)) = self.commits.last() {
            let oid = *oid;
            self.add_tag(name, oid);
        }
    }

    pub fn add_remote(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.remotes.insert(name.into(), url.into());
    }

    pub fn set_shallow(&mut self, shallow: bool) {
        self.shallow = shallow;
    }

    fn position(&self, oid: Oid) -> Result<usize> {
        self.commits
            .iter()
            .position(|(candidate, _)| *candidate == oid)
            .ok_or_else(|| ReleaseError::Git(git2::Error::from_str(&format!("unknown commit {}", oid))))
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn head_oid(&self) -> Result<Oid> {
        self.commits
            .last()
            .map(|(oid, _)| *oid)
            .ok_or_else(|| ReleaseError::Git(git2::Error::from_str("repository has no commits")))
    }

    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>> {
        Ok(self.tags.get(tag_name).copied())
    }

    fn latest_tag_before(
        &self,
        to: Oid,
        accept: &dyn Fn(&str) -> bool,
    ) -> Result<Option<(String, Oid)>> {
        let end = self.position(to)?;

        for (oid, _) in self.commits[..end].iter().rev() {
            let mut names: Vec<&String> = self
                .tags
                .iter()
                .filter(|(_, target)| *target == oid)
                .map(|(name, _)| name)
                .collect();
            names.sort();

            if let Some(name) = names.into_iter().find(|name| accept(name)) {
                return Ok(Some((name.clone(), *oid)));
            }
        }

        Ok(None)
    }

    fn get_commits_between(&self, from_oid: Option<Oid>, to_oid: Oid) -> Result<Vec<CommitInfo>> {
        let end = self.position(to_oid)?;
        let start = match from_oid {
            Some(from) => self.position(from)? + 1,
            None => 0,
        };

        if start > end {
            return Ok(Vec::new());
        }

        Ok(self.commits[start..=end]
            .iter()
            .map(|(_, info)| info.clone())
            .collect())
    }

    fn is_shallow(&self) -> bool {
        self.shallow
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        Ok(self.remotes.get(remote).cloned())
    }
}
