//! Version-control abstraction layer
//!
//! The release pipeline only needs a handful of history and publishing operations.
//! They are expressed by the [VersionControl] trait so steps can run against a real
//! repository or a recording mock.
//!
//! - [repository::Git2Repository]: implementation using the `git2` crate
//! - [mock::MockRepository]: in-memory implementation that records every call
//!
//! ```rust
//! # use mod_release::git::VersionControl;
//! # fn example<R: VersionControl>(repo: &R) -> mod_release::Result<()> {
//! let tag = repo.latest_tag()?;
//! let lines = repo.log_since(tag.as_deref())?;
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;

/// Delimiter between the fields of a raw log line.
pub const LOG_FIELD_DELIMITER: &str = "||";

/// Commit count and subjects for one author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorSummary {
    pub name: String,
    pub commits: usize,
    pub subjects: Vec<String>,
}

/// State of the working tree relative to its upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    /// Paths with uncommitted changes
    pub dirty: Vec<String>,
    /// Local commits not yet on the upstream branch
    pub unpushed: usize,
}

impl WorkingTreeStatus {
    pub fn is_clean(&self) -> bool {
        self.dirty.is_empty() && self.unpushed == 0
    }
}

/// Version-control operations consumed by the release pipeline.
///
/// Every call may fail; failures surface to the pipeline as step errors.
pub trait VersionControl: Send + Sync {
    /// Most recent tag reachable from HEAD, `None` if the history has no tags.
    fn latest_tag(&self) -> Result<Option<String>>;

    /// Raw log lines for commits after `tag` (exclusive) up to HEAD (inclusive),
    /// newest first, merges excluded.
    ///
    /// Each line reads `hash || committer-timestamp || author || subject` with the
    /// timestamp in RFC 3339 form carrying the committer's offset.
    fn log_since(&self, tag: Option<&str>) -> Result<Vec<String>>;

    /// Authors reachable from HEAD, most commits first.
    fn authors(&self) -> Result<Vec<AuthorSummary>>;

    /// URL of a remote, `None` if it is not configured.
    fn remote_url(&self, remote: &str) -> Result<Option<String>>;

    /// Point a remote at a new URL.
    fn set_remote_url(&self, remote: &str, url: &str) -> Result<()>;

    /// Uncommitted paths and unpushed commit count.
    fn status(&self, remote: &str) -> Result<WorkingTreeStatus>;

    /// Commit every tracked change (`git commit -a`).
    fn commit_all(&self, message: &str) -> Result<()>;

    /// Push the current branch.
    fn push(&self, remote: &str) -> Result<()>;

    /// Fetch remote tags, pruning local tags the remote no longer has.
    fn fetch_tags(&self, remote: &str) -> Result<()>;

    /// Branch names of the form `<major>.<minor>`, oldest first.
    fn version_branches(&self) -> Result<Vec<String>>;
}
