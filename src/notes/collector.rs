//! Turns raw version-control log lines into change notes.

use crate::boundary::BoundaryWarning;
use crate::domain::note::{is_no_log, ChangeNote};
use crate::git::LOG_FIELD_DELIMITER;
use chrono::DateTime;

/// Notes extracted from a batch of log lines, plus what was dropped on the way.
#[derive(Debug, Default)]
pub struct Collected {
    pub notes: Vec<ChangeNote>,
    pub warnings: Vec<BoundaryWarning>,
    pub excluded: usize,
}

/// Parses log lines of the form `hash || timestamp || author || subject`.
pub struct Collector<'a> {
    repo: &'a str,
    no_log_marker: &'a str,
}

impl<'a> Collector<'a> {
    pub fn new(repo: &'a str, no_log_marker: &'a str) -> Self {
        Collector { repo, no_log_marker }
    }

    /// Convert every line that parses; bad lines are reported, never fatal.
    ///
    /// Notes carrying the no-log marker are counted in `excluded` and dropped.
    pub fn collect<S: AsRef<str>>(&self, lines: &[S]) -> Collected {
        let mut collected = Collected::default();

        for line in lines {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            match self.parse_line(line) {
                Ok(note) if is_no_log(&note.message, self.no_log_marker) => {
                    tracing::debug!(hash = %note.hash, "excluding no-log commit");
                    collected.excluded += 1;
                }
                Ok(note) => collected.notes.push(note),
                Err(warning) => {
                    warning.emit();
                    collected.warnings.push(warning);
                }
            }
        }

        collected
    }

    fn parse_line(&self, line: &str) -> Result<ChangeNote, BoundaryWarning> {
        let malformed = || BoundaryWarning::MalformedLogLine {
            line: line.to_string(),
        };

        // Double quotes break the downstream markup; the log used single quotes instead.
        let cleaned = line.replace('"', "'");
        let fields: Vec<&str> = cleaned.splitn(4, LOG_FIELD_DELIMITER).map(str::trim).collect();
        if fields.len() != 4 {
            return Err(malformed());
        }
        let (hash, timestamp, author, message) = (fields[0], fields[1], fields[2], fields[3]);
        if hash.is_empty() || message.is_empty() {
            return Err(malformed());
        }

        let date = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| BoundaryWarning::UnparsableTimestamp {
                hash: hash.to_string(),
                timestamp: timestamp.to_string(),
            })?
            .format("%Y-%m-%d")
            .to_string();

        Ok(ChangeNote {
            hash: hash.to_string(),
            date,
            author: author.to_string(),
            message: message.to_string(),
            repo: self.repo.to_string(),
        })
    }
}
