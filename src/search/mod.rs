use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::note::Note;

/// Which half of the collection is on screen. The two modes never overlap.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ViewMode {
    #[default]
    Active,
    Trash,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Active => ViewMode::Trash,
            ViewMode::Trash => ViewMode::Active,
        }
    }

    pub fn admits(self, note: &Note) -> bool {
        match self {
            ViewMode::Active => !note.deleted,
            ViewMode::Trash => note.deleted,
        }
    }
}

/// A lowercased substring query. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    needle: String,
}

impl SearchQuery {
    pub fn new(input: &str) -> Self {
        Self {
            needle: input.to_lowercase(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, note: &Note) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        note.text.to_lowercase().contains(&self.needle)
            || note
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&self.needle))
    }
}

/// Notes for `mode` that match `query`, pinned first. Order within the pinned and unpinned groups
/// follows collection order.
pub fn compute_visible<'a>(
    notes: &'a [Note],
    mode: ViewMode,
    query: &SearchQuery,
) -> Vec<&'a Note> {
    let (mut pinned, unpinned): (Vec<&Note>, Vec<&Note>) = notes
        .iter()
        .filter(|note| mode.admits(note))
        .filter(|note| query.matches(note))
        .partition(|note| note.pinned);
    pinned.extend(unpinned);
    pinned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NoteStore;

    fn texts<'a>(notes: &[&'a Note]) -> Vec<&'a str> {
        notes.iter().map(|note| note.text.as_str()).collect()
    }

    #[test]
    fn view_mode_partitions_deleted_flag() {
        let mut store = NoteStore::default();
        store.add("live");
        let gone = store.add("gone").id.clone();
        store.set_deleted(&gone, true);

        let query = SearchQuery::default();
        let active = compute_visible(store.notes(), ViewMode::Active, &query);
        assert!(active.iter().all(|note| !note.deleted));
        assert_eq!(texts(&active), vec!["live"]);

        let trash = compute_visible(store.notes(), ViewMode::Trash, &query);
        assert!(trash.iter().all(|note| note.deleted));
        assert_eq!(texts(&trash), vec!["gone"]);
    }

    #[test]
    fn pinned_notes_come_first_in_stable_order() {
        let mut store = NoteStore::default();
        for text in ["A", "B", "C", "D"] {
            store.add(text);
        }
        let b = store.notes()[1].id.clone();
        let d = store.notes()[3].id.clone();
        store.toggle_pinned(&b);
        store.toggle_pinned(&d);

        let visible = compute_visible(store.notes(), ViewMode::Active, &SearchQuery::default());
        assert_eq!(texts(&visible), vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn query_matches_text_or_tags_case_insensitively() {
        let mut store = NoteStore::default();
        store.add("Buy MILK");
        store.add("call mom #Family");
        store.add("unrelated");

        let visible = compute_visible(store.notes(), ViewMode::Active, &SearchQuery::new("milk"));
        assert_eq!(texts(&visible), vec!["Buy MILK"]);

        let visible = compute_visible(store.notes(), ViewMode::Active, &SearchQuery::new("FAM"));
        assert_eq!(texts(&visible), vec!["call mom #Family"]);
    }

    #[test]
    fn tag_substring_matches_even_when_text_differs() {
        let mut store = NoteStore::default();
        let id = store.add("plain").id.clone();
        if let Some(note) = store.find_mut(&id) {
            note.tags = vec!["javascript".into()];
        }
        let visible = compute_visible(store.notes(), ViewMode::Active, &SearchQuery::new("script"));
        assert_eq!(visible.len(), 1);
    }

    #[test]
    fn view_mode_parses_and_displays() -> anyhow::Result<()> {
        assert_eq!("trash".parse::<ViewMode>()?, ViewMode::Trash);
        assert_eq!("Active".parse::<ViewMode>()?, ViewMode::Active);
        assert_eq!(ViewMode::Trash.to_string(), "trash");
        assert_eq!(ViewMode::Active.toggled(), ViewMode::Trash);
        Ok(())
    }
}
