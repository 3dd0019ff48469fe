//! Durable, deduplicated change-note history.

use crate::boundary::BoundaryWarning;
use crate::domain::note::ChangeNote;
use crate::error::Result;
use crate::persist::write_atomic;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Change notes sorted newest first, unique by commit hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeNoteStore {
    notes: Vec<ChangeNote>,
}

impl ChangeNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from arbitrary notes; duplicates after the first are dropped.
    pub fn from_notes(notes: Vec<ChangeNote>, no_log_marker: &str) -> Self {
        let mut store = Self::new();
        store.merge(notes, no_log_marker);
        store
    }

    /// Read the persisted store. A missing or corrupt file yields an empty store
    /// together with the warning describing why.
    pub fn load(path: &Path) -> (Self, Option<BoundaryWarning>) {
        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<Vec<ChangeNote>>(&raw).map_err(|e| e.to_string()));

        match parsed {
            Ok(notes) => {
                let mut store = ChangeNoteStore { notes };
                store.sort();
                (store, None)
            }
            Err(reason) => {
                let warning = BoundaryWarning::UnreadableNoteStore {
                    path: path.to_path_buf(),
                    reason,
                };
                warning.emit();
                (Self::new(), Some(warning))
            }
        }
    }

    /// Overwrite the persisted store with the current contents.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.notes)?;
        write_atomic(path, &json)
    }

    /// Append notes whose hash is not yet present, then re-sort by date (newest first).
    ///
    /// Notes carrying the no-log marker are never admitted. Returns how many were added.
    pub fn merge<I>(&mut self, incoming: I, no_log_marker: &str) -> usize
    where
        I: IntoIterator<Item = ChangeNote>,
    {
        let mut known: HashSet<String> = self.notes.iter().map(|n| n.hash.clone()).collect();
        let mut added = 0;

        for note in incoming {
            if note.is_excluded(no_log_marker) || known.contains(&note.hash) {
                continue;
            }
            known.insert(note.hash.clone());
            self.notes.push(note);
            added += 1;
        }

        self.sort();
        added
    }

    // Stable: notes sharing a date keep their relative order.
    fn sort(&mut self) {
        self.notes.sort_by(|a, b| b.date.cmp(&a.date));
    }

    pub fn notes(&self) -> &[ChangeNote] {
        &self.notes
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeNote> {
        self.notes.iter()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.notes.iter().any(|n| n.hash == hash)
    }
}
