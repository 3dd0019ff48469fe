use crate::boundary::BoundaryWarning;
use crate::domain::contributors::Contributors;
use crate::domain::note::ChangeNote;
use crate::domain::version::Version;
use crate::error::{ReleaseError, Result};
use crate::persist::write_atomic;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Owner/repository pair on the source host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCoordinates {
    pub user: String,
    pub repo: String,
}

impl GitCoordinates {
    /// Parse an `https://github.com/user/repo.git` or `git@github.com:user/repo.git` URL.
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let pattern = Regex::new(r"^(?:https://|git@)github\.com(?::|/)(.+?)/(.+?)\.git$").ok()?;
        let captures = pattern.captures(url.trim())?;
        Some(GitCoordinates {
            user: captures.get(1)?.as_str().to_string(),
            repo: captures.get(2)?.as_str().to_string(),
        })
    }

    pub fn https_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.user, self.repo)
    }

    /// Raw content URL of `path` on `branch`.
    pub fn raw_url(&self, branch: &str, path: &str) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}",
            self.user, self.repo, branch, path
        )
    }

    pub fn release_url(&self, tag: &str) -> String {
        format!("https://github.com/{}/{}/releases/{}", self.user, self.repo, tag)
    }
}

/// The mod being released, persisted as `ModConfig.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModDescriptor {
    pub name: String,

    #[serde(rename = "packageId", default)]
    pub package_id: String,

    pub version: Version,

    #[serde(default)]
    pub visibility: u32,

    #[serde(rename = "publishedfileid", default, skip_serializing_if = "Option::is_none")]
    pub published_file_id: Option<String>,

    #[serde(default)]
    pub git_user: String,

    #[serde(default)]
    pub git_repo: String,

    #[serde(default)]
    pub contributors: Contributors,

    /// Change notes of the current run as `date :: author :: message` lines
    #[serde(default)]
    pub changenote: String,

    /// Change notes of the current run
    #[serde(default)]
    pub changenotes: Vec<ChangeNote>,

    /// Compatibility tags (supported host versions)
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ModDescriptor {
    /// Fresh descriptor for a mod released for the first time.
    pub fn bootstrap(name: &str, alpha: u32, git: Option<GitCoordinates>, tags: Vec<String>) -> Self {
        let git = git.unwrap_or(GitCoordinates {
            user: String::new(),
            repo: String::new(),
        });
        ModDescriptor {
            name: name.to_string(),
            package_id: String::new(),
            version: Version::new(0, 0, 0).with_alpha(alpha),
            visibility: 0,
            published_file_id: None,
            git_user: git.user,
            git_repo: git.repo,
            contributors: Contributors::default(),
            changenote: String::new(),
            changenotes: Vec::new(),
            tags,
        }
    }

    /// Read a descriptor from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Read a descriptor, reporting why it could not be read instead of failing.
    pub fn try_load(path: &Path) -> std::result::Result<Self, BoundaryWarning> {
        Self::load(path).map_err(|e| BoundaryWarning::UnreadableDescriptor {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Overwrite the descriptor file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, &json)
    }

    /// Replace a missing or malformed package id with `<author>.<name>`.
    pub fn normalize_package_id(&mut self, author: &str) -> Result<()> {
        let valid = Regex::new(r"(?i)^[a-z]+(?:\.[a-z]+)+$")
            .map_err(|e| ReleaseError::config(e.to_string()))?;
        if valid.is_match(&self.package_id) {
            return Ok(());
        }
        let word = |s: &str| -> String {
            s.trim()
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect::<String>()
                .to_lowercase()
        };
        self.package_id = format!("{}.{}", word(author), word(&self.name));
        Ok(())
    }

    pub fn version_string(&self) -> String {
        self.version.to_string()
    }

    pub fn git_coordinates(&self) -> Option<GitCoordinates> {
        if self.git_user.is_empty() || self.git_repo.is_empty() {
            return None;
        }
        Some(GitCoordinates {
            user: self.git_user.clone(),
            repo: self.git_repo.clone(),
        })
    }
}
