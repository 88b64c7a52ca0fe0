use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage;

pub mod commands;

use self::commands::{DeleteArgs, EditArgs, NewArgs, ShowArgs, ThemeArgs};

const LOG_FILE: &str = "twopane.log";

#[derive(Parser, Debug)]
#[command(
    name = "twopane",
    version,
    about = "Two-pane terminal notes with light and dark themes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over TWOPANE_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over TWOPANE_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Create a new note from the command line
    New(NewArgs),
    /// Print every note, newest first
    List,
    /// Print a single note
    Show(ShowArgs),
    /// Change the title or content of a note
    Edit(EditArgs),
    /// Delete a note
    Delete(DeleteArgs),
    /// Show or toggle the colour theme
    Theme(ThemeArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    init_tracing(&cli.log_level, &paths.log_dir)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let storage = storage::init(&paths, &config.storage)?;

    let config = Arc::new(config);
    let command = cli.command.unwrap_or(Commands::Tui);
    match command {
        Commands::Tui => {
            let mut app = App::new(config.clone(), storage.clone())?;
            commands::run_tui(&mut app)
        }
        Commands::New(args) => commands::new_note(config, storage, args),
        Commands::List => commands::list_notes(config, storage),
        Commands::Show(args) => commands::show_note(config, storage, args),
        Commands::Edit(args) => commands::edit_note(config, storage, args),
        Commands::Delete(args) => commands::delete_note(config, storage, args),
        Commands::Theme(args) => commands::handle_theme_command(config, storage, args),
    }
}

/// Logs go to a file; the TUI owns the terminal while it runs.
fn init_tracing(level: &str, log_dir: &Path) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("creating log directory {}", log_dir.display()))?;
        let log_path = log_dir.join(LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("opening log file {}", log_path.display()))?;
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(|err| anyhow::anyhow!("installing tracing subscriber: {err}"))?;
        Ok(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_defaults_to_tui_and_parses_subcommands() {
        let cli = Cli::try_parse_from(["twopane"]).expect("parse bare invocation");
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");

        let cli = Cli::try_parse_from([
            "twopane",
            "--data-dir",
            "/tmp/notes",
            "edit",
            "abc",
            "--title",
            "Plan",
        ])
        .expect("parse edit");
        assert_eq!(cli.data_dir.as_deref(), Some(Path::new("/tmp/notes")));
        match cli.command {
            Some(Commands::Edit(args)) => {
                assert_eq!(args.id, "abc");
                assert_eq!(args.title.as_deref(), Some("Plan"));
                assert!(args.content.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
