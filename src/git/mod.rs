//! Git operations abstraction layer
//!
//! The release pipeline reads history through the [Repository] trait so the
//! changelog stage can run against a real repository or an in-memory one.
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: A linear in-memory history for testing
//!
//! ```rust
//! # use git_release::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> git_release::Result<()> {
//! let head = repo.head_oid()?;
//! let previous = repo.latest_tag_before(head, &|name| name.starts_with('v'))?;
//! let commits = repo.get_commits_between(previous.map(|(_, oid)| oid), head)?;
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;
use git2::Oid;

/// Commit information used for release notes
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    /// The full commit hash
    pub hash: String,
    /// The commit message
    pub message: String,
    /// The commit author
    pub author: String,
    /// Commit time in seconds since the Unix epoch
    pub time: i64,
}

impl CommitInfo {
    /// First seven characters of the hash
    pub fn short_hash(&self) -> &str {
        if self.hash.len() > 7 {
            &self.hash[..7]
        } else {
            &self.hash
        }
    }
}

/// Read access to the history a release is cut from.
///
/// All methods return [crate::error::Result<T>]; implementations map
/// `git2::Error` into [crate::error::ReleaseError::Git] or a more specific variant.
pub trait Repository {
    /// Commit currently checked out at HEAD
    fn head_oid(&self) -> Result<Oid>;

    /// Commit a tag points to, or `None` if the tag does not exist.
    ///
    /// Annotated tags are peeled to the commit they annotate.
    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>>;

    /// Nearest tag on an ancestor of `to` whose name passes `accept`.
    ///
    /// History is walked from the parents of `to` towards the root; tags on
    /// `to` itself never count. The first commit carrying an accepted tag wins.
    ///
    /// # Returns
    /// * `Ok(Some((name, oid)))` - The tag and the commit it points to
    /// * `Ok(None)` - No accepted tag is reachable
    fn latest_tag_before(
        &self,
        to: Oid,
        accept: &dyn Fn(&str) -> bool,
    ) -> Result<Option<(String, Oid)>>;

    /// Commits reachable from `to_oid` but not from `from_oid`, oldest first.
    ///
    /// With `from_oid = None` the whole history up to `to_oid` is returned.
    fn get_commits_between(&self, from_oid: Option<Oid>, to_oid: Oid) -> Result<Vec<CommitInfo>>;

    /// Whether the history is truncated (shallow clone)
    fn is_shallow(&self) -> bool;

    /// URL of a configured remote, `None` if the remote does not exist
    fn remote_url(&self, remote: &str) -> Result<Option<String>>;
}
