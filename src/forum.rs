//! Size-bounded forum post composition.

use crate::domain::note::ChangeNote;
use crate::notes::ChangeNoteStore;
use chrono::{DateTime, TimeZone};

/// Bodies within this many bytes of the limit get no change-note section.
pub const NOTES_THRESHOLD: usize = 1000;

/// Bytes kept free below the limit when filling in change notes.
pub const NOTES_RESERVE: usize = 500;

const SECTION_OPEN: &str = "\n\nChangenotes:\n[code]\n";
const SECTION_CLOSE: &str = "\n[/code]";

/// Merge `new_notes` into `store`, then append as many of the newest notes to
/// `body` as fit under `max_bytes`.
///
/// Notes are taken newest first and the first one that does not fit ends the
/// section; later, smaller notes are not tried. Lengths are UTF-8 bytes and
/// each line costs its length plus one for the terminator.
pub fn compose(
    store: &mut ChangeNoteStore,
    new_notes: &[ChangeNote],
    body: &str,
    max_bytes: usize,
    no_log_marker: &str,
) -> String {
    let added = store.merge(new_notes.iter().cloned(), no_log_marker);
    tracing::debug!(added, total = store.len(), "merged change notes for forum post");

    if body.len() >= max_bytes.saturating_sub(NOTES_THRESHOLD) {
        tracing::info!(bytes = body.len(), max_bytes, "forum body leaves no room for change notes");
        return body.to_string();
    }

    let available = max_bytes.saturating_sub(NOTES_RESERVE).saturating_sub(body.len());
    let mut notes = String::new();
    let mut included = 0;
    for note in store.iter() {
        let line = note.format_note();
        if notes.len() + line.len() + 1 > available {
            break;
        }
        if !notes.is_empty() {
            notes.push('\n');
        }
        notes.push_str(&line);
        included += 1;
    }
    tracing::debug!(included, available, "selected change notes for forum post");

    format!("{}{}{}{}", body, SECTION_OPEN, notes, SECTION_CLOSE)
}

/// `<prefix> - <custom title>` or `<prefix> - last updated <Mon d>`.
pub fn post_title<Tz: TimeZone>(prefix: &str, custom: Option<&str>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match custom.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => format!("{} - {}", prefix, title),
        None => format!("{} - last updated {}", prefix, now.format("%b %e")),
    }
}
