use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Mod version: a `major.minor.build` triple plus the host alpha it was built against.
///
/// The alpha marker is carried along but takes no part in ordering or equality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Version {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<u32>,
    pub major: u32,
    pub minor: u32,
    #[serde(default)]
    pub build: u32,
}

/// Version bump directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
    /// major += 1, minor = 0, build += 1
    Major,
    /// Full release: minor += 1, build += 1
    Standard,
    /// Intermediate update: build += 1
    Build,
}

impl VersionBump {
    /// Pick the directive for a run.
    pub fn from_flags(major: bool, release: bool) -> Self {
        if major {
            VersionBump::Major
        } else if release {
            VersionBump::Standard
        } else {
            VersionBump::Build
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VersionBump::Major => "major",
            VersionBump::Standard => "standard",
            VersionBump::Build => "none",
        }
    }
}

impl Version {
    /// Create a new version without an alpha marker
    pub fn new(major: u32, minor: u32, build: u32) -> Self {
        Version {
            alpha: None,
            major,
            minor,
            build,
        }
    }

    /// Attach the host alpha marker
    pub fn with_alpha(mut self, alpha: u32) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Bump version according to the directive.
    ///
    /// The build number increments on every bump, a major bump resets minor but not build.
    /// `no_bump` returns the version unchanged whatever the directive.
    pub fn bump(&self, directive: VersionBump, no_bump: bool) -> Self {
        if no_bump {
            return *self;
        }
        let mut next = *self;
        match directive {
            VersionBump::Major => {
                next.major += 1;
                next.minor = 0;
                next.build += 1;
            }
            VersionBump::Standard => {
                next.minor += 1;
                next.build += 1;
            }
            VersionBump::Build => {
                next.build += 1;
            }
        }
        next
    }

    fn key(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.build)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Version of the host application the mod targets, read from its version file
/// (e.g. `1.4.3704 rev1012`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostVersion(pub semver::Version);

impl HostVersion {
    /// Parse the first whitespace-separated token of the version file contents.
    pub fn parse(raw: &str) -> Result<Self> {
        let token = raw
            .split_whitespace()
            .next()
            .ok_or_else(|| ReleaseError::version("host version file is empty"))?;
        semver::Version::parse(token)
            .map(HostVersion)
            .map_err(|e| ReleaseError::version(format!("Invalid host version '{}': {}", token, e)))
    }

    /// `major.minor`, the form used for compatibility tags and badges.
    pub fn main(&self) -> String {
        format!("{}.{}", self.0.major, self.0.minor)
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
