use crate::error::{ReleaseError, Result};
use crate::git::{AuthorSummary, VersionControl, WorkingTreeStatus};
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock repository for testing without actual git operations.
///
/// Every trait call is appended to [MockRepository::calls]; operations named in
/// `failing` return an error instead.
#[derive(Default)]
pub struct MockRepository {
    pub latest_tag: Option<String>,
    pub log_lines: Vec<String>,
    pub authors: Vec<AuthorSummary>,
    pub remotes: Mutex<HashMap<String, String>>,
    pub status: WorkingTreeStatus,
    pub version_branches: Vec<String>,
    pub failing: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tag returned by `latest_tag`
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.latest_tag = Some(tag.into());
        self
    }

    /// Add a raw log line returned by `log_since`
    pub fn with_log_line(mut self, line: impl Into<String>) -> Self {
        self.log_lines.push(line.into());
        self
    }

    /// Add an author summary
    pub fn with_author(mut self, name: &str, subjects: &[&str]) -> Self {
        self.authors.push(AuthorSummary {
            name: name.to_string(),
            commits: subjects.len(),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Configure a remote URL
    pub fn with_remote(self, name: &str, url: &str) -> Self {
        if let Ok(mut remotes) = self.remotes.lock() {
            remotes.insert(name.to_string(), url.to_string());
        }
        self
    }

    /// Make an operation fail
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing.push(operation);
        self
    }

    /// Names of the operations invoked so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, operation: &'static str) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(operation.to_string());
        }
        if self.failing.contains(&operation) {
            return Err(ReleaseError::vcs(format!("mock failure in {}", operation)));
        }
        Ok(())
    }
}

impl VersionControl for MockRepository {
    fn latest_tag(&self) -> Result<Option<String>> {
        self.record("latest_tag")?;
        Ok(self.latest_tag.clone())
    }

    fn log_since(&self, _tag: Option<&str>) -> Result<Vec<String>> {
        self.record("log_since")?;
        Ok(self.log_lines.clone())
    }

    fn authors(&self) -> Result<Vec<AuthorSummary>> {
        self.record("authors")?;
        Ok(self.authors.clone())
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        self.record("remote_url")?;
        Ok(self
            .remotes
            .lock()
            .ok()
            .and_then(|remotes| remotes.get(remote).cloned()))
    }

    fn set_remote_url(&self, remote: &str, url: &str) -> Result<()> {
        self.record("set_remote_url")?;
        if let Ok(mut remotes) = self.remotes.lock() {
            remotes.insert(remote.to_string(), url.to_string());
        }
        Ok(())
    }

    fn status(&self, _remote: &str) -> Result<WorkingTreeStatus> {
        self.record("status")?;
        Ok(self.status.clone())
    }

    fn commit_all(&self, _message: &str) -> Result<()> {
        self.record("commit_all")
    }

    fn push(&self, _remote: &str) -> Result<()> {
        self.record("push")
    }

    fn fetch_tags(&self, _remote: &str) -> Result<()> {
        self.record("fetch_tags")
    }

    fn version_branches(&self) -> Result<Vec<String>> {
        self.record("version_branches")?;
        Ok(self.version_branches.clone())
    }
}
