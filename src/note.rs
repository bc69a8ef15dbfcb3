use std::fmt;

use serde::{Deserialize, Serialize};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::tags::extract_tags;

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Opaque note identifier. Freshly created notes get a v4 UUID, but persisted ids are kept
/// verbatim whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub text: String,
    /// Human-readable creation time. Edits leave it untouched.
    pub time: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Note {
    pub fn new(text: &str) -> Self {
        Self {
            id: NoteId::generate(),
            text: text.to_string(),
            time: timestamp_now(),
            pinned: false,
            deleted: false,
            tags: extract_tags(text),
        }
    }

    /// Replaces the body and recomputes the tags from it.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.tags = extract_tags(text);
    }
}

/// Current wall-clock time in the format stored on notes and snapshots.
pub fn timestamp_now() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Ordered in-memory collection of notes. Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteStore {
    notes: Vec<Note>,
}

impl NoteStore {
    pub fn from_notes(notes: Vec<Note>) -> Self {
        Self { notes }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Swaps in a whole collection, e.g. a snapshot chosen by undo/redo.
    pub fn replace(&mut self, notes: Vec<Note>) {
        self.notes = notes;
    }

    pub fn create(text: &str) -> Note {
        Note::new(text)
    }

    pub fn add(&mut self, text: &str) -> &Note {
        self.notes.push(Self::create(text));
        let last = self.notes.len() - 1;
        &self.notes[last]
    }

    pub fn find(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == id)
    }

    pub fn find_mut(&mut self, id: &NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|note| &note.id == id)
    }

    /// Returns `None` when the note does not exist, otherwise whether the text changed.
    pub fn edit(&mut self, id: &NoteId, text: &str) -> Option<bool> {
        let note = self.find_mut(id)?;
        if note.text == text {
            return Some(false);
        }
        note.set_text(text);
        Some(true)
    }

    /// Returns `None` when the note does not exist, otherwise whether the flag changed.
    pub fn set_deleted(&mut self, id: &NoteId, deleted: bool) -> Option<bool> {
        let note = self.find_mut(id)?;
        if note.deleted == deleted {
            return Some(false);
        }
        note.deleted = deleted;
        Some(true)
    }

    /// Flips `pinned` and returns the new value.
    pub fn toggle_pinned(&mut self, id: &NoteId) -> Option<bool> {
        let note = self.find_mut(id)?;
        note.pinned = !note.pinned;
        Some(note.pinned)
    }

    /// Removes the note outright. Returns whether anything was removed.
    pub fn purge(&mut self, id: &NoteId) -> bool {
        let before = self.notes.len();
        self.notes.retain(|note| &note.id != id);
        self.notes.len() != before
    }

    /// Ids whose string form starts with `prefix`.
    pub fn ids_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a NoteId> {
        self.notes
            .iter()
            .map(|note| &note.id)
            .filter(move |id| id.as_str().starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_note_has_defaults_and_tags() {
        let note = Note::new("buy milk #errand");
        assert!(!note.pinned);
        assert!(!note.deleted);
        assert_eq!(note.tags, vec!["errand"]);
        assert!(!note.time.is_empty());
        assert_eq!(note.id.as_str().len(), 36);
    }

    #[test]
    fn ids_are_unique() {
        let mut store = NoteStore::default();
        let a = store.add("a").id.clone();
        let b = store.add("b").id.clone();
        assert_ne!(a, b);
    }

    #[test]
    fn edit_recomputes_tags_and_keeps_time() {
        let mut store = NoteStore::default();
        let id = store.add("old #one").id.clone();
        let time = store.find(&id).expect("note").time.clone();

        assert_eq!(store.edit(&id, "new #two #three"), Some(true));
        let note = store.find(&id).expect("note");
        assert_eq!(note.text, "new #two #three");
        assert_eq!(note.tags, vec!["two", "three"]);
        assert_eq!(note.time, time);

        assert_eq!(store.edit(&id, "new #two #three"), Some(false));
    }

    #[test]
    fn mutators_report_missing_ids() {
        let mut store = NoteStore::default();
        let ghost = NoteId::from("ghost");
        assert_eq!(store.edit(&ghost, "x"), None);
        assert_eq!(store.set_deleted(&ghost, true), None);
        assert_eq!(store.toggle_pinned(&ghost), None);
        assert!(!store.purge(&ghost));
    }

    #[test]
    fn toggle_and_purge() {
        let mut store = NoteStore::default();
        let id = store.add("pin me").id.clone();
        assert_eq!(store.toggle_pinned(&id), Some(true));
        assert_eq!(store.toggle_pinned(&id), Some(false));
        assert_eq!(store.set_deleted(&id, true), Some(true));
        assert_eq!(store.set_deleted(&id, true), Some(false));
        assert!(store.purge(&id));
        assert!(store.is_empty());
    }

    #[test]
    fn deserializes_records_without_optional_fields() -> anyhow::Result<()> {
        let note: Note = serde_json::from_str(r#"{"id":"n1","text":"hi","time":"yesterday"}"#)?;
        assert_eq!(note.id, NoteId::from("n1"));
        assert!(!note.pinned && !note.deleted);
        assert!(note.tags.is_empty());
        Ok(())
    }
}
