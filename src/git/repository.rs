use crate::error::{ReleaseError, Result};
use crate::git::{AuthorSummary, VersionControl, WorkingTreeStatus, LOG_FIELD_DELIMITER};
use chrono::{DateTime, FixedOffset};
use git2::{
    BranchType, Commit, DescribeFormatOptions, DescribeOptions, ErrorCode, FetchOptions,
    FetchPrune, Oid, PushOptions, RemoteCallbacks, Repository as Git2Repo, Sort, Status,
    StatusOptions,
};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        Ok(Git2Repository::from_git2(repo))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
        }
    }

    fn with_repo<T>(&self, f: impl FnOnce(&Git2Repo) -> Result<T>) -> Result<T> {
        let repo = self
            .repo
            .lock()
            .map_err(|_| ReleaseError::vcs("repository lock poisoned"))?;
        f(&repo)
    }
}

/// Format one commit as a raw log line.
fn log_line(commit: &Commit<'_>) -> Option<String> {
    let when = commit.committer().when();
    let offset = FixedOffset::east_opt(when.offset_minutes() * 60)?;
    let timestamp = DateTime::from_timestamp(when.seconds(), 0)?
        .with_timezone(&offset)
        .to_rfc3339();
    let author = commit.author().name().unwrap_or("unknown").to_string();
    let subject = commit.summary().unwrap_or("").to_string();

    Some(format!(
        "{} {d} {} {d} {} {d} {}",
        commit.id(),
        timestamp,
        author,
        subject,
        d = LOG_FIELD_DELIMITER
    ))
}

/// Credentials from the SSH agent, falling back to default credentials.
fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            if let Ok(cred) = git2::Cred::ssh_key_from_agent(username_from_url.unwrap_or("git")) {
                return Ok(cred);
            }
        }
        git2::Cred::default()
    });
    callbacks
}

fn tag_commit(repo: &Git2Repo, tag: &str) -> Result<Oid> {
    let object = repo
        .revparse_single(&format!("refs/tags/{}", tag))
        .map_err(|e| ReleaseError::vcs(format!("Cannot find tag '{}': {}", tag, e)))?;
    Ok(object.peel_to_commit()?.id())
}

fn current_branch(repo: &Git2Repo) -> Result<String> {
    let head = repo.head()?;
    head.shorthand()
        .map(str::to_string)
        .ok_or_else(|| ReleaseError::vcs("HEAD is detached or invalid"))
}

impl VersionControl for Git2Repository {
    fn latest_tag(&self) -> Result<Option<String>> {
        self.with_repo(|repo| {
            let mut options = DescribeOptions::new();
            options.describe_tags();
            let describe = match repo.describe(&options) {
                Ok(describe) => describe,
                Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let mut format = DescribeFormatOptions::new();
            format.abbreviated_size(0);
            Ok(Some(describe.format(Some(&format))?))
        })
    }

    fn log_since(&self, tag: Option<&str>) -> Result<Vec<String>> {
        self.with_repo(|repo| {
            let mut revwalk = repo.revwalk()?;
            revwalk.set_sorting(Sort::TIME)?;
            revwalk.push_head()?;
            if let Some(tag) = tag {
                revwalk.hide(tag_commit(repo, tag)?)?;
            }

            let mut lines = Vec::new();
            for oid in revwalk {
                let commit = repo.find_commit(oid?)?;
                if commit.parent_count() > 1 {
                    continue;
                }
                if let Some(line) = log_line(&commit) {
                    lines.push(line);
                }
            }
            Ok(lines)
        })
    }

    fn authors(&self) -> Result<Vec<AuthorSummary>> {
        self.with_repo(|repo| {
            let mut revwalk = repo.revwalk()?;
            revwalk.push_head()?;

            let mut by_author: HashMap<String, AuthorSummary> = HashMap::new();
            for oid in revwalk {
                let commit = repo.find_commit(oid?)?;
                let name = commit.author().name().unwrap_or("unknown").to_string();
                let entry = by_author.entry(name.clone()).or_insert_with(|| AuthorSummary {
                    name,
                    commits: 0,
                    subjects: Vec::new(),
                });
                entry.commits += 1;
                if let Some(subject) = commit.summary() {
                    entry.subjects.push(subject.to_string());
                }
            }

            let mut authors: Vec<AuthorSummary> = by_author.into_values().collect();
            authors.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.name.cmp(&b.name)));
            Ok(authors)
        })
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        self.with_repo(|repo| match repo.find_remote(remote) {
            Ok(found) => Ok(found.url().map(str::to_string)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        })
    }

    fn set_remote_url(&self, remote: &str, url: &str) -> Result<()> {
        self.with_repo(|repo| {
            repo.remote_set_url(remote, url)?;
            Ok(())
        })
    }

    fn status(&self, remote: &str) -> Result<WorkingTreeStatus> {
        self.with_repo(|repo| {
            let mut options = StatusOptions::new();
            options.include_untracked(false).include_ignored(false);

            let dirty = repo
                .statuses(Some(&mut options))?
                .iter()
                .filter(|entry| entry.status() != Status::CURRENT)
                .filter_map(|entry| entry.path().map(str::to_string))
                .collect();

            let branch = current_branch(repo)?;
            let local = repo.refname_to_id("HEAD")?;
            let unpushed = match repo.refname_to_id(&format!("refs/remotes/{}/{}", remote, branch)) {
                Ok(upstream) => repo.graph_ahead_behind(local, upstream)?.0,
                Err(e) if e.code() == ErrorCode::NotFound => 0,
                Err(e) => return Err(e.into()),
            };

            Ok(WorkingTreeStatus { dirty, unpushed })
        })
    }

    fn commit_all(&self, message: &str) -> Result<()> {
        self.with_repo(|repo| {
            let mut index = repo.index()?;
            index.update_all(["*"], None)?;
            index.write()?;

            let tree = repo.find_tree(index.write_tree()?)?;
            let signature = repo.signature()?;
            let parent = repo.head()?.peel_to_commit()?;
            repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])?;
            Ok(())
        })
    }

    fn push(&self, remote: &str) -> Result<()> {
        self.with_repo(|repo| {
            let branch = current_branch(repo)?;
            let mut found = repo
                .find_remote(remote)
                .map_err(|e| ReleaseError::vcs(format!("Cannot find remote '{}': {}", remote, e)))?;

            let mut options = PushOptions::new();
            options.remote_callbacks(remote_callbacks());

            let refspec = format!("refs/heads/{b}:refs/heads/{b}", b = branch);
            found
                .push(&[refspec.as_str()], Some(&mut options))
                .map_err(|e| ReleaseError::vcs(format!("Push to '{}' failed: {}", remote, e)))
        })
    }

    fn fetch_tags(&self, remote: &str) -> Result<()> {
        self.with_repo(|repo| {
            let mut found = repo
                .find_remote(remote)
                .map_err(|e| ReleaseError::vcs(format!("Cannot find remote '{}': {}", remote, e)))?;

            let mut options = FetchOptions::new();
            options.remote_callbacks(remote_callbacks());
            options.prune(FetchPrune::On);

            found
                .fetch(&["+refs/tags/*:refs/tags/*"], Some(&mut options), None)
                .map_err(|e| ReleaseError::vcs(format!("Fetch from '{}' failed: {}", remote, e)))
        })
    }

    fn version_branches(&self) -> Result<Vec<String>> {
        let pattern = Regex::new(r"^\d+\.\d+$").map_err(|e| ReleaseError::vcs(e.to_string()))?;
        self.with_repo(|repo| {
            let mut versions: Vec<(u64, u64, String)> = Vec::new();
            for entry in repo.branches(None)? {
                let (branch, kind) = entry?;
                let Some(name) = branch.name()? else {
                    continue;
                };
                let short = match kind {
                    BranchType::Remote => name.split_once('/').map(|(_, b)| b).unwrap_or(name),
                    BranchType::Local => name,
                };
                if !pattern.is_match(short) || versions.iter().any(|(_, _, v)| v == short) {
                    continue;
                }
                if let Some((major, minor)) = short.split_once('.') {
                    let major = major.parse().unwrap_or(0);
                    let minor = minor.parse().unwrap_or(0);
                    versions.push((major, minor, short.to_string()));
                }
            }
            versions.sort();
            Ok(versions.into_iter().map(|(_, _, name)| name).collect())
        })
    }
}
