use serde::{Deserialize, Serialize};

use crate::note::{timestamp_now, Note, NoteId};

pub const INITIAL_LABEL: &str = "Initial state";

/// A full, independent copy of the note collection at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub label: String,
    pub time: String,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Snapshot {
    pub fn capture(notes: &[Note], label: &str) -> Self {
        Self {
            label: label.to_string(),
            time: timestamp_now(),
            notes: notes.to_vec(),
        }
    }
}

/// One line of the history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub index: usize,
    pub label: String,
    pub time: String,
    pub current: bool,
}

/// Linear undo/redo over whole-collection snapshots.
///
/// Always holds at least one snapshot, and `cursor` always indexes an existing one. A commit made
/// while the cursor is behind the tip discards everything after the cursor first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    snapshots: Vec<Snapshot>,
    cursor: usize,
}

impl History {
    /// Starts a history whose only entry is an "Initial state" snapshot of `notes`.
    pub fn seeded(notes: &[Note]) -> Self {
        Self {
            snapshots: vec![Snapshot::capture(notes, INITIAL_LABEL)],
            cursor: 0,
        }
    }

    /// Rebuilds a history from persisted snapshots with the cursor at the tip. Returns `None` for
    /// an empty sequence.
    pub fn from_snapshots(snapshots: Vec<Snapshot>) -> Option<Self> {
        if snapshots.is_empty() {
            return None;
        }
        let cursor = snapshots.len() - 1;
        Some(Self { snapshots, cursor })
    }

    /// Moves the cursor to the last snapshot holding exactly `notes`. Leaves it alone when no
    /// snapshot matches. Returns whether a match was found.
    pub fn settle_on(&mut self, notes: &[Note]) -> bool {
        match self.snapshots.iter().rposition(|s| s.notes == notes) {
            Some(index) => {
                self.cursor = index;
                true
            }
            None => false,
        }
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn current(&self) -> &Snapshot {
        &self.snapshots[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn commit(&mut self, notes: &[Note], label: &str) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(Snapshot::capture(notes, label));
        self.cursor = self.snapshots.len() - 1;
    }

    /// Steps back one snapshot and returns a copy of its notes.
    pub fn undo(&mut self) -> Option<Vec<Note>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current().notes.clone())
    }

    /// Steps forward one snapshot and returns a copy of its notes.
    pub fn redo(&mut self) -> Option<Vec<Note>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.current().notes.clone())
    }

    /// Moves the cursor straight to `index` without discarding anything.
    pub fn jump_to(&mut self, index: usize) -> Option<Vec<Note>> {
        if index >= self.snapshots.len() {
            return None;
        }
        self.cursor = index;
        Some(self.current().notes.clone())
    }

    /// Strips the note from every snapshot, past and future. The cursor does not move, so the
    /// removal cannot be undone. Returns how many snapshots contained the note.
    pub fn purge_everywhere(&mut self, id: &NoteId) -> usize {
        let mut touched = 0;
        for snapshot in &mut self.snapshots {
            let before = snapshot.notes.len();
            snapshot.notes.retain(|note| &note.id != id);
            if snapshot.notes.len() != before {
                touched += 1;
            }
        }
        touched
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.snapshots
            .iter()
            .enumerate()
            .map(|(index, snapshot)| HistoryEntry {
                index,
                label: snapshot.label.clone(),
                time: snapshot.time.clone(),
                current: index == self.cursor,
            })
            .collect()
    }
}

pub fn format_history(entries: &[HistoryEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let marker = if entry.current { " <- current" } else { "" };
            format!("{}: {} @ {}{marker}", entry.index, entry.label, entry.time)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NoteStore;

    fn store_with(texts: &[&str]) -> NoteStore {
        let mut store = NoteStore::default();
        for text in texts {
            store.add(text);
        }
        store
    }

    #[test]
    fn seeded_history_has_single_initial_snapshot() {
        let history = History::seeded(&[]);
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.current().label, INITIAL_LABEL);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_then_redo_restores_same_content() {
        let mut store = store_with(&["one"]);
        let mut history = History::seeded(&[]);
        history.commit(store.notes(), "Add note");
        store.add("two");
        history.commit(store.notes(), "Add note");

        let before = store.notes().to_vec();
        let undone = history.undo().expect("undo");
        assert_eq!(undone.len(), 1);
        let redone = history.redo().expect("redo");
        assert_eq!(redone, before);
        assert_eq!(history.cursor(), 2);
    }

    #[test]
    fn commit_after_undo_discards_redo_branch() {
        let mut history = History::seeded(&[]);
        let store = store_with(&["a"]);
        history.commit(store.notes(), "Add note");
        history.commit(store.notes(), "Toggle pin");
        history.undo();
        history.undo();
        assert!(history.can_redo());

        history.commit(store.notes(), "Edit note");
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        let labels: Vec<_> = history.snapshots().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec![INITIAL_LABEL, "Edit note"]);
    }

    #[test]
    fn undo_and_redo_stop_at_the_ends() {
        let mut history = History::seeded(&[]);
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn snapshots_do_not_alias_live_state() {
        let mut store = store_with(&["original"]);
        let mut history = History::seeded(&[]);
        history.commit(store.notes(), "Add note");
        let id = store.notes()[0].id.clone();
        store.edit(&id, "changed");
        assert_eq!(history.current().notes[0].text, "original");
    }

    #[test]
    fn purge_everywhere_rewrites_every_snapshot() {
        let mut store = store_with(&["keep", "drop"]);
        let drop_id = store.notes()[1].id.clone();
        let mut history = History::seeded(store.notes());
        store.set_deleted(&drop_id, true);
        history.commit(store.notes(), "Deleted note");
        history.undo();

        assert_eq!(history.purge_everywhere(&drop_id), 2);
        assert_eq!(history.cursor(), 0);
        for snapshot in history.snapshots() {
            assert!(snapshot.notes.iter().all(|note| note.id != drop_id));
            assert_eq!(snapshot.notes.len(), 1);
        }
        let redone = history.redo().expect("redo");
        assert!(redone.iter().all(|note| note.id != drop_id));
    }

    #[test]
    fn jump_to_moves_cursor_without_truncating() {
        let store = store_with(&["a"]);
        let mut history = History::seeded(&[]);
        history.commit(store.notes(), "Add note");
        history.commit(store.notes(), "Toggle pin");

        assert_eq!(history.jump_to(0), Some(Vec::new()));
        assert_eq!(history.len(), 3);
        assert!(history.can_redo());
        assert!(history.jump_to(3).is_none());
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn from_snapshots_places_cursor_at_tip() {
        let mut seeded = History::seeded(&[]);
        seeded.commit(&[], "Add note");
        let restored = History::from_snapshots(seeded.snapshots().to_vec()).expect("history");
        assert_eq!(restored.cursor(), 1);
        assert!(History::from_snapshots(Vec::new()).is_none());
    }

    #[test]
    fn format_history_marks_current_entry() {
        let entries = vec![
            HistoryEntry {
                index: 0,
                label: INITIAL_LABEL.into(),
                time: "2024-01-01 09:00:00".into(),
                current: false,
            },
            HistoryEntry {
                index: 1,
                label: "Add note".into(),
                time: "2024-01-01 09:05:00".into(),
                current: true,
            },
        ];
        insta::assert_snapshot!(format_history(&entries), @r"
        0: Initial state @ 2024-01-01 09:00:00
        1: Add note @ 2024-01-01 09:05:00 <- current
        ");
    }
}
