use std::fmt;
use std::path::PathBuf;

/// Recoverable problems met while reading history and persisted state.
/// These never abort a run; they are logged and reported to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// A raw log line did not carry hash, timestamp, author and message
    MalformedLogLine { line: String },
    /// A commit timestamp could not be read as an RFC 3339 date
    UnparsableTimestamp { hash: String, timestamp: String },
    /// The persisted change-note store was missing or corrupt
    UnreadableNoteStore { path: PathBuf, reason: String },
    /// The persisted mod descriptor was missing or corrupt
    UnreadableDescriptor { path: PathBuf, reason: String },
    /// An optional template file could not be read
    MissingTemplate { path: PathBuf },
    /// No release tag exists yet, so the whole history is collected
    NoReleaseTag,
    /// The workshop item id file was missing or unreadable
    MissingPublishedFileId { path: PathBuf, reason: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::MalformedLogLine { line } => {
                write!(f, "Skipping malformed log line '{}'", line)
            }
            BoundaryWarning::UnparsableTimestamp { hash, timestamp } => {
                let short_hash = if hash.len() > 7 { &hash[..7] } else { hash.as_str() };
                write!(
                    f,
                    "Dropping commit {}: cannot parse timestamp '{}'",
                    short_hash, timestamp
                )
            }
            BoundaryWarning::UnreadableNoteStore { path, reason } => {
                write!(
                    f,
                    "Cannot read change notes at '{}' ({}); starting with an empty list",
                    path.display(),
                    reason
                )
            }
            BoundaryWarning::UnreadableDescriptor { path, reason } => {
                write!(
                    f,
                    "Cannot read mod descriptor at '{}' ({}); creating a new one",
                    path.display(),
                    reason
                )
            }
            BoundaryWarning::MissingTemplate { path } => {
                write!(f, "Template '{}' not found; section omitted", path.display())
            }
            BoundaryWarning::NoReleaseTag => {
                write!(f, "No release tag found; collecting the full history")
            }
            BoundaryWarning::MissingPublishedFileId { path, reason } => {
                write!(
                    f,
                    "No published file id at '{}' ({}); the workshop upload creates a new item",
                    path.display(),
                    reason
                )
            }
        }
    }
}

impl BoundaryWarning {
    /// Log the warning through tracing.
    pub fn emit(&self) {
        tracing::warn!("{}", self);
    }
}
