use anyhow::{bail, Context, Result};
use clap::Args;

use crate::app::{Notebook, Outcome};
use crate::config::HighlightOptions;
use crate::highlight::highlight_with;
use crate::history::format_history;
use crate::note::{Note, NoteId};
use crate::search::ViewMode;
use crate::storage::KeyValueStore;

use super::Commands;

const SHORT_ID_LEN: usize = 8;

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    /// Note id or a unique prefix of it
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Note id or a unique prefix of it
    pub id: String,
    /// New text; leave empty to move the note to the trash
    pub text: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Show the trash instead of active notes
    #[arg(long)]
    pub trash: bool,
    /// Only notes whose text or tags contain this (case-insensitive)
    #[arg(long, short)]
    pub query: Option<String>,
    /// Only notes carrying this tag (with or without the leading #)
    #[arg(long, conflicts_with = "query")]
    pub tag: Option<String>,
}

/// Strings wrapped around search hits when printing.
#[derive(Debug, Clone)]
pub struct Markers {
    pub open: String,
    pub close: String,
}

impl Markers {
    pub fn ansi() -> Self {
        Self {
            open: "\x1b[7m".into(),
            close: "\x1b[0m".into(),
        }
    }
}

impl From<&HighlightOptions> for Markers {
    fn from(options: &HighlightOptions) -> Self {
        Self {
            open: options.open.clone(),
            close: options.close.clone(),
        }
    }
}

pub fn execute<S: KeyValueStore>(
    notebook: &mut Notebook<S>,
    command: Commands,
    markers: &Markers,
) -> Result<String> {
    match command {
        Commands::Add { text } => {
            let Some(id) = notebook.add_note(&text.join(" ")).context("saving note")? else {
                bail!("note text cannot be empty");
            };
            Ok(format!("Added note {}", short_id(&id)))
        }
        Commands::Edit(args) => {
            let id = resolve_id(notebook, &args.id)?;
            let text = args.text.join(" ");
            let outcome = notebook.edit_note(&id, &text).context("editing note")?;
            let verb = if text.trim().is_empty() {
                "Moved to trash"
            } else {
                "Updated"
            };
            Ok(describe(outcome, verb, &id))
        }
        Commands::Delete(args) => {
            let id = resolve_id(notebook, &args.id)?;
            let outcome = notebook.delete_note(&id).context("deleting note")?;
            Ok(describe(outcome, "Moved to trash", &id))
        }
        Commands::Restore(args) => {
            let id = resolve_id(notebook, &args.id)?;
            let outcome = notebook.restore_note(&id).context("restoring note")?;
            Ok(describe(outcome, "Restored", &id))
        }
        Commands::Purge(args) => {
            let id = resolve_id(notebook, &args.id)?;
            let outcome = notebook.permanently_delete(&id).context("purging note")?;
            Ok(describe(outcome, "Purged", &id))
        }
        Commands::Pin(args) => {
            let id = resolve_id(notebook, &args.id)?;
            let outcome = notebook.toggle_pin(&id).context("toggling pin")?;
            let verb = match notebook.find(&id) {
                Some(note) if note.pinned => "Pinned",
                _ => "Unpinned",
            };
            Ok(describe(outcome, verb, &id))
        }
        Commands::List(args) => {
            notebook.set_view_mode(if args.trash {
                ViewMode::Trash
            } else {
                ViewMode::Active
            });
            if let Some(tag) = args.tag.as_deref() {
                notebook.search_tag(tag);
            } else {
                notebook.set_search_query(args.query.as_deref().unwrap_or_default());
            }
            Ok(format_notes(
                &notebook.visible(),
                notebook.view_mode(),
                notebook.search_query(),
                markers,
            ))
        }
        Commands::Undo => {
            let undone = notebook.history().current().label.clone();
            match notebook.undo().context("undoing")? {
                Outcome::Applied => Ok(format!("Undid: {undone}")),
                _ => Ok("Nothing to undo".into()),
            }
        }
        Commands::Redo => match notebook.redo().context("redoing")? {
            Outcome::Applied => Ok(format!("Redid: {}", notebook.history().current().label)),
            _ => Ok("Nothing to redo".into()),
        },
        Commands::History => Ok(format_history(&notebook.history_entries())),
        Commands::Checkout { index } => {
            match notebook.restore_version(index).context("checking out history")? {
                Outcome::Applied => Ok(format!(
                    "Checked out {index}: {}",
                    notebook.history().current().label
                )),
                _ => bail!(
                    "no history entry {index} (history has {} entries)",
                    notebook.history().len()
                ),
            }
        }
    }
}

/// Resolves a full id or unique prefix against live notes. An unknown id is passed through so
/// the operation itself can report it.
fn resolve_id<S: KeyValueStore>(notebook: &Notebook<S>, raw: &str) -> Result<NoteId> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("note id cannot be empty");
    }
    let candidates: Vec<&NoteId> = notebook.note_store().ids_with_prefix(raw).collect();
    match candidates.as_slice() {
        [] => Ok(NoteId::from(raw)),
        [single] => Ok((*single).clone()),
        many => {
            if let Some(exact) = many.iter().find(|id| id.as_str() == raw) {
                return Ok((*exact).clone());
            }
            bail!("id prefix {raw:?} matches {} notes", many.len())
        }
    }
}

fn describe(outcome: Outcome, verb: &str, id: &NoteId) -> String {
    let short = short_id(id);
    match outcome {
        Outcome::Applied => format!("{verb} note {short}"),
        Outcome::NotFound => format!("Note {short} not found"),
        Outcome::Unchanged => format!("Note {short} unchanged"),
        Outcome::Expired => "Undo window has closed".to_string(),
    }
}

fn short_id(id: &NoteId) -> String {
    id.as_str().chars().take(SHORT_ID_LEN).collect()
}

fn format_notes(notes: &[&Note], mode: ViewMode, query: &str, markers: &Markers) -> String {
    if notes.is_empty() {
        return match (mode, query.is_empty()) {
            (_, false) => format!("No notes match {query:?}"),
            (ViewMode::Active, true) => "Your mind is clear".to_string(),
            (ViewMode::Trash, true) => "Trash is empty".to_string(),
        };
    }
    notes
        .iter()
        .map(|note| {
            let pin = if note.pinned { '*' } else { '-' };
            let text = highlight_with(&note.text, query, &markers.open, &markers.close);
            format!("{} {pin} {text} ({})", short_id(&note.id), note.time)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
