pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod highlight;
pub mod history;
pub mod note;
pub mod search;
pub mod storage;
pub mod tags;

pub use app::{Notebook, NotebookOptions, Outcome, StateChange, UndoWindow};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use error::{StoreError, StoreResult};
