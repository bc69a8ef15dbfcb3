use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::{Notebook, NotebookOptions};
use crate::config::ConfigLoader;
use crate::storage;

pub mod commands;

use self::commands::{EditArgs, IdArgs, ListArgs, Markers};

#[derive(Parser, Debug)]
#[command(
    name = "mindful",
    version,
    about = "Notes with tags, pinning, trash and full undo history"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file location (takes precedence over MINDFUL_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over MINDFUL_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a note; #words in the text become tags
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Replace a note's text (blank text moves it to the trash)
    Edit(EditArgs),
    /// Move a note to the trash
    Delete(IdArgs),
    /// Bring a note back from the trash
    Restore(IdArgs),
    /// Remove a note forever, including from history
    Purge(IdArgs),
    /// Toggle a note's pin
    Pin(IdArgs),
    /// List notes, pinned first
    List(ListArgs),
    /// Step back one change
    Undo,
    /// Step forward one change
    Redo,
    /// Show every recorded change
    History,
    /// Jump to a recorded change by index
    Checkout { index: usize },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("MINDFUL_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("MINDFUL_DATA", path);
    }

    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let loader = ConfigLoader::discover()?;
    let config = loader.load_or_init()?;
    let storage = storage::init(&config.storage).context("opening note store")?;
    let mut notebook = Notebook::open_with(storage, NotebookOptions::from(&config))
        .context("loading notes")?;

    let markers = if atty::is(atty::Stream::Stdout) {
        Markers::ansi()
    } else {
        Markers::from(&config.highlight)
    };
    let output = commands::execute(&mut notebook, cli.command, &markers)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn log_level_defaults_to_info() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["mindful", "history"])?;
        assert_eq!(cli.log_level, "info");
        let cli = Cli::try_parse_from(["mindful", "--log-level", "debug", "undo"])?;
        assert_eq!(cli.log_level, "debug");
        Ok(())
    }

    #[test]
    fn purge_help_does_not_require_trash() {
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("Remove a note forever"), "{help}");
    }
}
