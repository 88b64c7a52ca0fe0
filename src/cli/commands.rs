use std::fmt::Write as _;
use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::app::{self, App};
use crate::config::AppConfig;
use crate::storage::{KeyValueStore, StorageHandle};
use crate::store::{Note, NoteId, NotePatch, NoteStore, ThemeSource, ThemeStore};
use crate::ui::{format_timestamp, note_preview};

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Title for the note (prompted if omitted on a terminal)
    #[arg()]
    pub title: Option<String>,
    /// Provide the note content inline. If omitted, reads from stdin.
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Note identifier
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Note identifier
    pub id: String,
    /// Replace the title
    #[arg(long)]
    pub title: Option<String>,
    /// Replace the content
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note identifier
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct ThemeArgs {
    #[command(subcommand)]
    pub command: Option<ThemeCommand>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ThemeCommand {
    /// Print the active theme and where it came from (default)
    Show,
    /// Switch between light and dark and remember the choice
    Toggle,
}

pub fn run_tui(app: &mut App<StorageHandle>) -> Result<()> {
    app.run()
}

pub fn new_note(config: Arc<AppConfig>, storage: StorageHandle, args: NewArgs) -> Result<()> {
    let title = match args.title {
        Some(title) => Some(title),
        None if atty::is(atty::Stream::Stdin) => Some(prompt("Title")?),
        None => None,
    };
    let content = match args.content {
        Some(content) => content,
        None => read_stdin()?.unwrap_or_default(),
    };

    let mut notes = open_notes(&config, storage);
    let output = create_note(&mut notes, title, content, config.ui.title_max_len)?;
    print!("{output}");
    Ok(())
}

pub fn list_notes(config: Arc<AppConfig>, storage: StorageHandle) -> Result<()> {
    let notes = open_notes(&config, storage);
    print!("{}", format_note_list(notes.notes(), config.ui.preview_chars));
    Ok(())
}

pub fn show_note(config: Arc<AppConfig>, storage: StorageHandle, args: ShowArgs) -> Result<()> {
    let notes = open_notes(&config, storage);
    let note = find_note(&notes, &args.id)?;
    print!("{}", format_note(note));
    Ok(())
}

pub fn edit_note(config: Arc<AppConfig>, storage: StorageHandle, args: EditArgs) -> Result<()> {
    let mut notes = open_notes(&config, storage);
    let output = apply_edit(&mut notes, args, config.ui.title_max_len)?;
    print!("{output}");
    Ok(())
}

pub fn delete_note(config: Arc<AppConfig>, storage: StorageHandle, args: DeleteArgs) -> Result<()> {
    let mut notes = open_notes(&config, storage);
    let output = remove_note(&mut notes, &args.id)?;
    print!("{output}");
    Ok(())
}

pub fn handle_theme_command(
    config: Arc<AppConfig>,
    storage: StorageHandle,
    args: ThemeArgs,
) -> Result<()> {
    let mut theme = ThemeStore::load(
        storage,
        config.storage.theme_key.clone(),
        app::system_appearance(&config),
    );
    let output = match args.command.unwrap_or(ThemeCommand::Show) {
        ThemeCommand::Show => describe_theme(&theme),
        ThemeCommand::Toggle => toggle_theme(&mut theme)?,
    };
    print!("{output}");
    Ok(())
}

fn open_notes(config: &AppConfig, storage: StorageHandle) -> NoteStore<StorageHandle> {
    NoteStore::load(storage, config.storage.notes_key.clone())
}

fn create_note<S: KeyValueStore>(
    notes: &mut NoteStore<S>,
    title: Option<String>,
    content: String,
    title_max_len: usize,
) -> Result<String> {
    let mut patch = NotePatch::content(content);
    if let Some(title) = title.filter(|title| !title.trim().is_empty()) {
        patch = patch.with_title(cap_title(&title, title_max_len));
    }
    let id = notes.try_create(patch).context("saving new note")?;
    Ok(format!("Created note {id}\n"))
}

fn apply_edit<S: KeyValueStore>(
    notes: &mut NoteStore<S>,
    args: EditArgs,
    title_max_len: usize,
) -> Result<String> {
    let id = find_note(notes, &args.id)?.id().clone();
    let patch = NotePatch {
        title: args.title.map(|title| cap_title(&title, title_max_len)),
        content: args.content,
    };
    if patch.is_empty() {
        bail!("nothing to change: pass --title and/or --content");
    }
    notes.try_update(&id, patch).context("saving edited note")?;
    Ok(format!("Updated note {id}\n"))
}

fn remove_note<S: KeyValueStore>(notes: &mut NoteStore<S>, id: &str) -> Result<String> {
    let id = find_note(notes, id)?.id().clone();
    notes.try_delete(&id).context("saving notes after delete")?;
    Ok(format!("Deleted note {id}\n"))
}

fn cap_title(title: &str, max_chars: usize) -> String {
    title.chars().take(max_chars).collect()
}

fn find_note<'a, S: KeyValueStore>(notes: &'a NoteStore<S>, id: &str) -> Result<&'a Note> {
    match notes.get(&NoteId::from(id)) {
        Some(note) => Ok(note),
        None => bail!("note {id} not found"),
    }
}

fn describe_theme<S: KeyValueStore>(theme: &ThemeStore<S>) -> String {
    let (current, source) = theme.resolve();
    let origin = match source {
        ThemeSource::Persisted => "saved preference",
        ThemeSource::System => "terminal colours",
        ThemeSource::Default => "default",
    };
    format!("{current} ({origin})\n")
}

fn toggle_theme<S: KeyValueStore>(theme: &mut ThemeStore<S>) -> Result<String> {
    let next = theme.try_toggle().context("saving theme preference")?;
    Ok(format!("Theme set to {next}\n"))
}

fn format_note_list(notes: &[Note], preview_chars: usize) -> String {
    if notes.is_empty() {
        return "No notes yet.\n".to_string();
    }
    let mut out = String::new();
    for note in notes {
        let _ = writeln!(&mut out, "{}  {}", note.id(), note.display_title());
        let _ = writeln!(&mut out, "    updated {}", format_timestamp(note.updated()));
        let preview = note_preview(note, preview_chars);
        if !preview.trim().is_empty() {
            let _ = writeln!(&mut out, "    {}", preview.trim());
        }
        out.push('\n');
    }
    out
}

fn format_note(note: &Note) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", note.display_title());
    let _ = writeln!(&mut out, "id      {}", note.id());
    let _ = writeln!(&mut out, "created {}", format_timestamp(note.created()));
    let _ = writeln!(&mut out, "updated {}", format_timestamp(note.updated()));
    out.push('\n');
    out.push_str(note.content());
    if !note.content().ends_with('\n') {
        out.push('\n');
    }
    out
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}
