use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::AppConfig;
use crate::storage::{KeyValueStore, StorageHandle};
use crate::store::{
    ColorFgBg, FixedAppearance, NoteId, NoteStore, SystemAppearance, ThemeStore,
};
use crate::ui::{self, View};

mod actions;
pub mod state;

pub use actions::{ActionDispatcher, Intent, Outcome};
pub use state::{EditField, EditorState, FocusPane, ShellState};

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    OpenHighlighted,
    NewNote,
    DeleteHighlighted,
    DeleteCurrent,
    ToggleSidebar,
    ToggleTheme,
    CycleFocus,
    FocusSidebar,
}

pub struct App<S> {
    pub config: Arc<AppConfig>,
    notes: NoteStore<S>,
    theme: ThemeStore<S>,
    state: ShellState,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App<StorageHandle> {
    pub fn new(config: Arc<AppConfig>, storage: StorageHandle) -> Result<Self> {
        let notes = NoteStore::load(storage.clone(), config.storage.notes_key.clone());
        let theme = ThemeStore::load(
            storage,
            config.storage.theme_key.clone(),
            system_appearance(&config),
        );
        let size = crossterm::terminal::size().context("querying terminal size")?;
        Ok(Self::with_stores(config, notes, theme, size))
    }
}

impl<S: KeyValueStore> App<S> {
    pub fn with_stores(
        config: Arc<AppConfig>,
        notes: NoteStore<S>,
        theme: ThemeStore<S>,
        (width, height): (u16, u16),
    ) -> Self {
        let state = ShellState::new(width, height, config.ui.sidebar_breakpoint);
        let tick_rate = config.ui.tick_rate();
        Self {
            config,
            notes,
            theme,
            state,
            list_state: ListState::default(),
            should_quit: false,
            tick_rate,
        }
    }

    pub fn notes(&self) -> &NoteStore<S> {
        &self.notes
    }

    pub fn theme(&self) -> &ThemeStore<S> {
        &self.theme
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    pub fn view(&self) -> View<'_> {
        View {
            notes: self.notes.notes(),
            current: self.notes.current_note(),
            theme: self.theme.current(),
            shell: &self.state,
            ui: &self.config.ui,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal
                .draw(|frame| {
                    if self.notes.is_empty() {
                        self.list_state.select(None);
                    } else {
                        self.list_state.select(Some(self.state.highlighted));
                    }
                    let view = View {
                        notes: self.notes.notes(),
                        current: self.notes.current_note(),
                        theme: self.theme.current(),
                        shell: &self.state,
                        ui: &self.config.ui,
                    };
                    ui::draw_app(frame, &view, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            if event::poll(self.tick_rate).context("polling for terminal events")? {
                let event = event::read().context("reading terminal event")?;
                self.handle_event(event);
            }
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize(width, height) => self.state.on_resize(width, height),
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let global = match key.code {
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => Some(Action::Quit),
            KeyCode::Char('n') if ctrl => Some(Action::NewNote),
            KeyCode::Char('d') if ctrl => Some(Action::DeleteCurrent),
            KeyCode::Char('b') if ctrl => Some(Action::ToggleSidebar),
            KeyCode::Char('t') if ctrl => Some(Action::ToggleTheme),
            KeyCode::Tab => Some(Action::CycleFocus),
            KeyCode::Esc => Some(Action::FocusSidebar),
            _ => None,
        };
        if let Some(action) = global {
            self.handle_action(action);
            return;
        }

        match self.state.focus {
            FocusPane::Sidebar => self.handle_sidebar_key(key),
            FocusPane::Title | FocusPane::Content => self.handle_editor_key(key),
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
        {
            return;
        }
        if !self.state.sidebar_open {
            // The list is hidden: only actions that do not target a row.
            match key.code {
                KeyCode::Char('q') => self.handle_action(Action::Quit),
                KeyCode::Char('a') | KeyCode::Char('n') => self.handle_action(Action::NewNote),
                _ => self.state.sidebar_open = true,
            }
            return;
        }
        let action = match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Enter => Some(Action::OpenHighlighted),
            KeyCode::Char('a') | KeyCode::Char('n') => Some(Action::NewNote),
            KeyCode::Char('d') => Some(Action::DeleteHighlighted),
            _ => None,
        };
        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let edit = {
            let Some(editor) = self.state.editor_mut() else {
                return;
            };
            let changed = match key.code {
                KeyCode::Char(ch) if plain => editor.insert_char(ch),
                KeyCode::Enter if editor.field() == EditField::Title => {
                    self.state.focus = FocusPane::Content;
                    self.sync_editor();
                    return;
                }
                KeyCode::Enter => editor.insert_newline(),
                KeyCode::Backspace => editor.backspace(),
                KeyCode::Delete => editor.delete(),
                KeyCode::Left => {
                    editor.move_left();
                    false
                }
                KeyCode::Right => {
                    editor.move_right();
                    false
                }
                KeyCode::Up => {
                    editor.move_up();
                    false
                }
                KeyCode::Down => {
                    editor.move_down();
                    false
                }
                KeyCode::Home => {
                    editor.move_home();
                    false
                }
                KeyCode::End => {
                    editor.move_end();
                    false
                }
                _ => false,
            };
            if changed {
                Some((editor.note_id().clone(), editor.patch()))
            } else {
                None
            }
        };

        if let Some((id, patch)) = edit {
            if let Outcome::Updated(false) = self.dispatch(Intent::UpdateNote(id, patch)) {
                self.state.close_editor();
                self.state.focus = FocusPane::Sidebar;
                self.state.set_status_message(Some("Note no longer exists"));
            }
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.state.move_highlight(1, self.notes.len()),
            Action::SelectPrevious => self.state.move_highlight(-1, self.notes.len()),
            Action::OpenHighlighted => {
                if let Some(id) = self.highlighted_id() {
                    self.dispatch(Intent::SelectNote(id));
                    self.state.focus = FocusPane::Content;
                    self.state.clear_status_message();
                    self.sync_editor();
                }
            }
            Action::NewNote => {
                if let Outcome::Created(_) = self.dispatch(Intent::CreateNote) {
                    self.state.highlighted = 0;
                    self.state.focus = FocusPane::Title;
                    self.state.set_status_message(Some("New note created; type a title"));
                    self.sync_editor();
                }
            }
            Action::DeleteHighlighted => {
                if let Some(id) = self.highlighted_id() {
                    self.delete_note(id);
                }
            }
            Action::DeleteCurrent => {
                if let Some(id) = self.notes.current_note().map(|note| note.id().clone()) {
                    self.delete_note(id);
                }
            }
            Action::ToggleSidebar => {
                let open = self.state.toggle_sidebar();
                let has_note = self.notes.current_note().is_some();
                if !open && self.state.focus == FocusPane::Sidebar && has_note {
                    self.state.focus = FocusPane::Content;
                    self.sync_editor();
                }
            }
            Action::ToggleTheme => {
                if let Outcome::ThemeChanged(theme) = self.dispatch(Intent::ToggleTheme) {
                    self.state.set_status_message(Some(format!("Theme: {theme}")));
                }
            }
            Action::CycleFocus => {
                let next = match self.state.focus {
                    FocusPane::Sidebar => FocusPane::Title,
                    FocusPane::Title => FocusPane::Content,
                    FocusPane::Content => FocusPane::Sidebar,
                };
                if next != FocusPane::Sidebar && self.notes.current_note().is_none() {
                    self.state.set_status_message(Some("Select a note first (Enter)"));
                    return;
                }
                self.state.focus = next;
                if next == FocusPane::Sidebar {
                    self.state.sidebar_open = true;
                }
                self.sync_editor();
            }
            Action::FocusSidebar => {
                self.state.focus = FocusPane::Sidebar;
                self.state.sidebar_open = true;
                self.sync_editor();
            }
        }
    }

    fn dispatch(&mut self, intent: Intent) -> Outcome {
        ActionDispatcher::new(&mut self.notes, &mut self.theme).dispatch(intent)
    }

    fn delete_note(&mut self, id: NoteId) {
        let title = self
            .notes
            .get(&id)
            .map(|note| note.display_title().to_string())
            .unwrap_or_default();
        if let Outcome::Deleted(true) = self.dispatch(Intent::DeleteNote(id)) {
            self.state.clamp_highlight(self.notes.len());
            if self.notes.current_note().is_none() {
                self.state.focus = FocusPane::Sidebar;
            }
            self.state.set_status_message(Some(format!("Deleted \"{title}\"")));
            self.sync_editor();
        }
    }

    fn highlighted_id(&self) -> Option<NoteId> {
        self.notes
            .notes()
            .get(self.state.highlighted)
            .map(|note| note.id().clone())
    }

    /// Rebuilds the editor so it always mirrors the current note and the
    /// focused field.
    fn sync_editor(&mut self) {
        let Some(field) = self.state.focus.edit_field() else {
            self.state.close_editor();
            return;
        };
        let Some(note) = self.notes.current_note() else {
            self.state.close_editor();
            self.state.focus = FocusPane::Sidebar;
            return;
        };
        if let Some(position) = self.notes.position(note.id()) {
            self.state.highlighted = position;
        }
        let up_to_date = self
            .state
            .editor()
            .map(|editor| editor.note_id() == note.id() && editor.field() == field)
            .unwrap_or(false);
        if !up_to_date {
            let max_chars = match field {
                EditField::Title => Some(self.config.ui.title_max_len),
                EditField::Content => None,
            };
            self.state.begin_editor(EditorState::new(note, field, max_chars));
        }
    }
}

pub fn system_appearance(config: &AppConfig) -> Box<dyn SystemAppearance> {
    match config.ui.system_theme {
        Some(theme) => Box::new(FixedAppearance(Some(theme))),
        None => Box::new(ColorFgBg::from_env()),
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("entering alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("creating terminal backend")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("leaving alternate screen")?;
    terminal.show_cursor().context("restoring cursor")?;
    Ok(())
}
