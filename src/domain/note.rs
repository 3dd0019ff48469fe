use serde::{Deserialize, Serialize};

/// Marker that keeps a commit out of every change log.
pub const DEFAULT_NO_LOG_MARKER: &str = "[nolog]";

/// One entry of the change log, derived from a single commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNote {
    /// Commit id; unique within a store
    pub hash: String,
    /// Calendar date (`YYYY-MM-DD`) in the committer's offset
    pub date: String,
    pub author: String,
    pub message: String,
    #[serde(default)]
    pub repo: String,
}

impl ChangeNote {
    /// `date :: repo :: author :: message`, the line used in forum change logs
    pub fn format_note(&self) -> String {
        format!(
            "{} :: {} :: {} :: {}",
            self.date, self.repo, self.author, self.message
        )
    }

    /// `date :: author :: message`, the line used in per-mod change notes
    pub fn summary_line(&self) -> String {
        format!("{} :: {} :: {}", self.date, self.author, self.message)
    }

    /// Whether the message carries the no-log marker, in any letter case.
    pub fn is_excluded(&self, marker: &str) -> bool {
        is_no_log(&self.message, marker)
    }
}

/// Case-insensitive search for the no-log marker.
pub fn is_no_log(message: &str, marker: &str) -> bool {
    !marker.is_empty() && message.to_lowercase().contains(&marker.to_lowercase())
}

/// Join notes into the multi-line changenote used as a release body.
pub fn changenote_text(notes: &[ChangeNote], marker: &str) -> String {
    notes
        .iter()
        .filter(|n| !n.is_excluded(marker))
        .map(ChangeNote::summary_line)
        .collect::<Vec<_>>()
        .join("\n")
}
