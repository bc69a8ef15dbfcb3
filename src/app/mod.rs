use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::config::{AppConfig, HighlightOptions};
use crate::error::StoreResult;
use crate::highlight::highlight_with;
use crate::history::{History, HistoryEntry};
use crate::note::{Note, NoteId, NoteStore};
use crate::search::{compute_visible, SearchQuery, ViewMode};
use crate::storage::{self, KeyValueStore, StorageHandle};

mod undo_window;

pub use undo_window::UndoWindow;

pub const ADD_LABEL: &str = "Add note";
pub const EDIT_LABEL: &str = "Edit note";
pub const DELETE_LABEL: &str = "Deleted note";
pub const RESTORE_LABEL: &str = "Restore note";
pub const UNDO_DELETE_LABEL: &str = "Undo delete";
pub const PIN_LABEL: &str = "Toggle pin";

/// What a notebook operation did. Guard failures are reported here rather than as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    NotFound,
    Unchanged,
    Expired,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

/// Broadcast to subscribers after anything that should trigger a re-render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Committed { label: &'static str },
    Undone { cursor: usize },
    Redone { cursor: usize },
    Checkout { cursor: usize },
    Purged { id: NoteId },
    ViewChanged,
}

#[derive(Debug, Clone)]
pub struct NotebookOptions {
    pub undo_window: Duration,
    pub default_view: ViewMode,
    pub highlight: HighlightOptions,
}

impl Default for NotebookOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for NotebookOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            undo_window: config.undo_window(),
            default_view: config.default_view,
            highlight: config.highlight.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ViewState {
    mode: ViewMode,
    query: SearchQuery,
}

/// Owns the live notes, their history and the current view, and writes through to a store after
/// every change.
///
/// Every mutation except [`Notebook::permanently_delete`] goes through a single commit step that
/// snapshots the collection, persists, and notifies subscribers. If the write fails the in-memory
/// state is still updated and the error is returned; [`Notebook::flush`] retries it.
pub struct Notebook<S: KeyValueStore = StorageHandle> {
    store: S,
    notes: NoteStore,
    history: History,
    view: ViewState,
    options: NotebookOptions,
    subscribers: Vec<Sender<StateChange>>,
}

impl<S: KeyValueStore> Notebook<S> {
    pub fn open(store: S) -> StoreResult<Self> {
        Self::open_with(store, NotebookOptions::default())
    }

    pub fn open_with(store: S, options: NotebookOptions) -> StoreResult<Self> {
        let loaded = storage::load_state(&store)?;
        let notebook = Self {
            store,
            notes: NoteStore::from_notes(loaded.notes),
            history: loaded.history,
            view: ViewState {
                mode: options.default_view,
                query: SearchQuery::default(),
            },
            options,
            subscribers: Vec::new(),
        };
        if loaded.seeded {
            tracing::debug!("no usable history found, seeded initial state");
            notebook.flush()?;
        }
        Ok(notebook)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notes(&self) -> &[Note] {
        self.notes.notes()
    }

    pub fn note_store(&self) -> &NoteStore {
        &self.notes
    }

    pub fn find(&self, id: &NoteId) -> Option<&Note> {
        self.notes.find(id)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view.mode
    }

    pub fn search_query(&self) -> &str {
        self.view.query.as_str()
    }

    pub fn subscribe(&mut self) -> Receiver<StateChange> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Trims `text` and appends a new note. Returns `None` when nothing is left after trimming.
    pub fn add_note(&mut self, text: &str) -> StoreResult<Option<NoteId>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let id = self.notes.add(text).id.clone();
        self.commit(ADD_LABEL)?;
        Ok(Some(id))
    }

    /// Replaces the note's text. Blank text is treated as a delete.
    pub fn edit_note(&mut self, id: &NoteId, text: &str) -> StoreResult<Outcome> {
        if self.notes.find(id).is_none() {
            return Ok(Outcome::NotFound);
        }
        let text = text.trim();
        if text.is_empty() {
            return self.delete_note(id);
        }
        match self.notes.edit(id, text) {
            None => Ok(Outcome::NotFound),
            Some(false) => Ok(Outcome::Unchanged),
            Some(true) => {
                self.commit(EDIT_LABEL)?;
                Ok(Outcome::Applied)
            }
        }
    }

    /// Moves the note to the trash.
    pub fn delete_note(&mut self, id: &NoteId) -> StoreResult<Outcome> {
        self.set_deleted(id, true, DELETE_LABEL)
    }

    /// Brings a note back out of the trash.
    pub fn restore_note(&mut self, id: &NoteId) -> StoreResult<Outcome> {
        self.set_deleted(id, false, RESTORE_LABEL)
    }

    /// Opens a window during which [`Notebook::undo_delete`] may reverse a delete of `id`.
    pub fn undo_window(&self, id: &NoteId) -> UndoWindow {
        UndoWindow::open(id.clone(), self.options.undo_window)
    }

    /// Reverses a delete while `window` is still open. Ignored while the trash is being viewed.
    pub fn undo_delete(&mut self, window: &UndoWindow) -> StoreResult<Outcome> {
        if !window.is_live() {
            return Ok(Outcome::Expired);
        }
        if self.view.mode == ViewMode::Trash {
            return Ok(Outcome::Unchanged);
        }
        self.set_deleted(window.note_id(), false, UNDO_DELETE_LABEL)
    }

    pub fn toggle_pin(&mut self, id: &NoteId) -> StoreResult<Outcome> {
        if self.notes.toggle_pinned(id).is_none() {
            return Ok(Outcome::NotFound);
        }
        self.commit(PIN_LABEL)?;
        Ok(Outcome::Applied)
    }

    /// Removes the note from live state and from every snapshot, without recording a snapshot
    /// of its own. Undo can never bring it back.
    pub fn permanently_delete(&mut self, id: &NoteId) -> StoreResult<Outcome> {
        let live = self.notes.purge(id);
        let snapshots = self.history.purge_everywhere(id);
        if !live && snapshots == 0 {
            return Ok(Outcome::NotFound);
        }
        tracing::info!(%id, snapshots, "purged note from live state and history");
        self.flush()?;
        self.notify(StateChange::Purged { id: id.clone() });
        Ok(Outcome::Applied)
    }

    pub fn undo(&mut self) -> StoreResult<Outcome> {
        let Some(notes) = self.history.undo() else {
            return Ok(Outcome::Unchanged);
        };
        self.notes.replace(notes);
        tracing::debug!(cursor = self.history.cursor(), "undo");
        self.flush()?;
        self.notify(StateChange::Undone {
            cursor: self.history.cursor(),
        });
        Ok(Outcome::Applied)
    }

    pub fn redo(&mut self) -> StoreResult<Outcome> {
        let Some(notes) = self.history.redo() else {
            return Ok(Outcome::Unchanged);
        };
        self.notes.replace(notes);
        tracing::debug!(cursor = self.history.cursor(), "redo");
        self.flush()?;
        self.notify(StateChange::Redone {
            cursor: self.history.cursor(),
        });
        Ok(Outcome::Applied)
    }

    /// Jumps directly to snapshot `index`. Later snapshots stay available for redo.
    pub fn restore_version(&mut self, index: usize) -> StoreResult<Outcome> {
        let Some(notes) = self.history.jump_to(index) else {
            return Ok(Outcome::NotFound);
        };
        self.notes.replace(notes);
        tracing::debug!(cursor = index, "checked out snapshot");
        self.flush()?;
        self.notify(StateChange::Checkout { cursor: index });
        Ok(Outcome::Applied)
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.view.query = SearchQuery::new(query);
        self.notify(StateChange::ViewChanged);
    }

    /// Searches for a tag, as when a tag chip is clicked.
    pub fn search_tag(&mut self, tag: &str) {
        self.set_search_query(tag.trim_start_matches('#'));
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if self.view.mode == mode {
            return;
        }
        self.view.mode = mode;
        self.notify(StateChange::ViewChanged);
    }

    pub fn toggle_view_mode(&mut self) -> ViewMode {
        self.set_view_mode(self.view.mode.toggled());
        self.view.mode
    }

    /// Notes for the current view and query, pinned first.
    pub fn visible(&self) -> Vec<&Note> {
        compute_visible(self.notes.notes(), self.view.mode, &self.view.query)
    }

    /// Marks occurrences of the current query in `text` with the configured markers.
    pub fn highlight(&self, text: &str) -> String {
        highlight_with(
            text,
            self.view.query.as_str(),
            &self.options.highlight.open,
            &self.options.highlight.close,
        )
    }

    pub fn history_entries(&self) -> Vec<HistoryEntry> {
        self.history.entries()
    }

    /// Writes the live notes and the full history to the store.
    pub fn flush(&self) -> StoreResult<()> {
        storage::save_state(&self.store, self.notes.notes(), &self.history)
    }

    fn set_deleted(
        &mut self,
        id: &NoteId,
        deleted: bool,
        label: &'static str,
    ) -> StoreResult<Outcome> {
        match self.notes.set_deleted(id, deleted) {
            None => Ok(Outcome::NotFound),
            Some(false) => Ok(Outcome::Unchanged),
            Some(true) => {
                self.commit(label)?;
                Ok(Outcome::Applied)
            }
        }
    }

    fn commit(&mut self, label: &'static str) -> StoreResult<()> {
        self.history.commit(self.notes.notes(), label);
        tracing::debug!(
            label,
            cursor = self.history.cursor(),
            snapshots = self.history.len(),
            "committed snapshot"
        );
        let written = self.flush();
        self.notify(StateChange::Committed { label });
        written
    }

    fn notify(&mut self, change: StateChange) {
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}
