use unicode_segmentation::UnicodeSegmentation;

use crate::store::{Note, NoteId, NotePatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    Title,
    Content,
}

impl FocusPane {
    pub fn edit_field(self) -> Option<EditField> {
        match self {
            FocusPane::Sidebar => None,
            FocusPane::Title => Some(EditField::Title),
            FocusPane::Content => Some(EditField::Content),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Title,
    Content,
}

/// Working copy of one field of one note. Every accepted edit is pushed back
/// to the note store as a patch, so the buffer never drifts from the store.
#[derive(Debug, Clone)]
pub struct EditorState {
    note_id: NoteId,
    field: EditField,
    buffer: String,
    cursor: usize,
    max_chars: Option<usize>,
    preferred_column: Option<usize>,
}

impl EditorState {
    pub fn new(note: &Note, field: EditField, max_chars: Option<usize>) -> Self {
        let buffer = match field {
            EditField::Title => note.title().to_string(),
            EditField::Content => note.content().to_string(),
        };
        let cursor = buffer.len();
        Self {
            note_id: note.id().clone(),
            field,
            buffer,
            cursor,
            max_chars,
            preferred_column: None,
        }
    }

    pub fn note_id(&self) -> &NoteId {
        &self.note_id
    }

    pub fn field(&self) -> EditField {
        self.field
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn patch(&self) -> NotePatch {
        match self.field {
            EditField::Title => NotePatch::title(self.buffer.clone()),
            EditField::Content => NotePatch::content(self.buffer.clone()),
        }
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        if let Some(max) = self.max_chars {
            if self.buffer.chars().count() >= max {
                return false;
            }
        }
        let mut scratch = [0u8; 4];
        let encoded = ch.encode_utf8(&mut scratch);
        self.buffer.insert_str(self.cursor, encoded);
        self.cursor += encoded.len();
        self.preferred_column = None;
        true
    }

    /// Titles are single-line; only content accepts newlines.
    pub fn insert_newline(&mut self) -> bool {
        if self.field == EditField::Title {
            return false;
        }
        self.buffer.insert(self.cursor, '\n');
        self.cursor += 1;
        self.preferred_column = Some(0);
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(prev..self.cursor);
        self.cursor = prev;
        self.preferred_column = None;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.buffer.drain(self.cursor..next);
        self.preferred_column = None;
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.preferred_column = None;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.cursor = next;
        self.preferred_column = None;
        true
    }

    pub fn move_home(&mut self) -> bool {
        let line_start = line_start(&self.buffer, self.cursor);
        if self.cursor == line_start {
            return false;
        }
        self.cursor = line_start;
        self.preferred_column = Some(0);
        true
    }

    pub fn move_end(&mut self) -> bool {
        let line_end = line_end(&self.buffer, self.cursor);
        if self.cursor == line_end {
            return false;
        }
        self.cursor = line_end;
        self.preferred_column = Some(column_at(
            &self.buffer,
            line_start(&self.buffer, self.cursor),
            self.cursor,
        ));
        true
    }

    pub fn move_up(&mut self) -> bool {
        let current_line_start = line_start(&self.buffer, self.cursor);
        let current_column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.buffer, current_line_start, self.cursor));
        if current_line_start == 0 {
            if self.cursor == 0 {
                return false;
            }
            self.cursor = 0;
            self.preferred_column = Some(current_column);
            return true;
        }
        let prev_line_start = line_start(&self.buffer, current_line_start - 1);
        let target = position_for_column(&self.buffer, prev_line_start, current_column);
        self.cursor = target;
        self.preferred_column = Some(current_column);
        true
    }

    pub fn move_down(&mut self) -> bool {
        let current_line_start = line_start(&self.buffer, self.cursor);
        let current_column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.buffer, current_line_start, self.cursor));
        let current_line_end = line_end(&self.buffer, self.cursor);
        if current_line_end == self.buffer.len() {
            if self.cursor == self.buffer.len() {
                return false;
            }
            self.cursor = self.buffer.len();
            self.preferred_column = Some(current_column);
            return true;
        }
        let target = position_for_column(&self.buffer, current_line_end + 1, current_column);
        self.cursor = target;
        self.preferred_column = Some(current_column);
        true
    }
}

/// Presentation-only state: focus, sidebar visibility, list cursor, editor.
#[derive(Debug, Clone)]
pub struct ShellState {
    pub focus: FocusPane,
    pub sidebar_open: bool,
    pub highlighted: usize,
    width: u16,
    height: u16,
    breakpoint: u16,
    editor: Option<EditorState>,
    status_message: Option<String>,
}

impl ShellState {
    pub fn new(width: u16, height: u16, breakpoint: u16) -> Self {
        Self {
            focus: FocusPane::Sidebar,
            sidebar_open: width >= breakpoint,
            highlighted: 0,
            width,
            height,
            breakpoint,
            editor: None,
            status_message: None,
        }
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Every resize re-derives sidebar visibility from the breakpoint,
    /// discarding a manual toggle.
    pub fn on_resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.sidebar_open = width >= self.breakpoint;
    }

    pub fn is_wide(&self) -> bool {
        self.width >= self.breakpoint
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_open = !self.sidebar_open;
        self.sidebar_open
    }

    pub fn sidebar_overlays_editor(&self) -> bool {
        self.sidebar_open && !self.is_wide()
    }

    pub fn move_highlight(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.highlighted = 0;
            return;
        }
        let next = (self.highlighted as isize + delta).clamp(0, len as isize - 1);
        self.highlighted = next as usize;
    }

    pub fn clamp_highlight(&mut self, len: usize) {
        if len == 0 {
            self.highlighted = 0;
        } else if self.highlighted >= len {
            self.highlighted = len - 1;
        }
    }

    pub fn editor(&self) -> Option<&EditorState> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorState> {
        self.editor.as_mut()
    }

    pub fn begin_editor(&mut self, editor: EditorState) {
        self.editor = Some(editor);
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn clear_status_message(&mut self) {
        self.status_message = None;
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[..cursor]
        .grapheme_indices(true)
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .graphemes(true)
        .next()
        .map(|g| cursor + g.len())
        .unwrap_or(cursor)
}

fn line_start(text: &str, cursor: usize) -> usize {
    text[..cursor].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn line_end(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .find('\n')
        .map(|idx| cursor + idx)
        .unwrap_or(text.len())
}

fn column_at(text: &str, line_start: usize, cursor: usize) -> usize {
    text[line_start..cursor].graphemes(true).count()
}

fn position_for_column(text: &str, line_start: usize, column: usize) -> usize {
    let line_end = line_end(text, line_start);
    text[line_start..line_end]
        .grapheme_indices(true)
        .nth(column)
        .map(|(idx, _)| line_start + idx)
        .unwrap_or(line_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::store::NoteStore;

    fn seeded_note(content: &str) -> (NoteStore<MemoryStore>, NoteId) {
        let mut store = NoteStore::load(MemoryStore::new(), "notes");
        let id = store.create();
        store.update(&id, NotePatch::content(content));
        (store, id)
    }

    #[test]
    fn editor_starts_at_end_of_field() {
        let (store, id) = seeded_note("alpha\nbeta");
        let note = store.get(&id).expect("note");
        let editor = EditorState::new(note, EditField::Content, None);
        assert_eq!(editor.cursor(), "alpha\nbeta".len());
        assert_eq!(editor.patch(), NotePatch::content("alpha\nbeta"));
    }

    #[test]
    fn editor_moves_between_lines_keeping_column() {
        let (store, id) = seeded_note("alpha\nbe\ngamma");
        let mut editor = EditorState::new(store.get(&id).expect("note"), EditField::Content, None);
        assert!(editor.move_up());
        assert_eq!(editor.cursor(), "alpha\nbe".len());
        assert!(editor.move_up());
        assert_eq!(editor.cursor(), "alpha".len());
        assert!(editor.move_down());
        assert!(editor.move_down());
        assert_eq!(editor.cursor(), "alpha\nbe\ngamma".len());
    }

    #[test]
    fn backspace_removes_whole_graphemes() {
        let (store, id) = seeded_note("né");
        let mut editor = EditorState::new(store.get(&id).expect("note"), EditField::Content, None);
        assert!(editor.backspace());
        assert_eq!(editor.buffer(), "n");
        assert!(editor.move_home());
        assert!(!editor.backspace());
        assert!(editor.delete());
        assert_eq!(editor.buffer(), "");
    }

    #[test]
    fn title_is_single_line_and_capped() {
        let (store, id) = seeded_note("");
        let mut editor = EditorState::new(store.get(&id).expect("note"), EditField::Title, Some(10));
        assert_eq!(editor.buffer(), "Untitled");
        assert!(!editor.insert_newline());
        assert!(editor.insert_char('!'));
        assert!(editor.insert_char('?'));
        assert!(!editor.insert_char('x'));
        assert_eq!(editor.patch(), NotePatch::title("Untitled!?"));
    }

    #[test]
    fn resize_rederives_sidebar_visibility() {
        let mut shell = ShellState::new(120, 40, 100);
        assert!(shell.sidebar_open);
        assert!(!shell.toggle_sidebar());

        shell.on_resize(80, 40);
        assert!(!shell.sidebar_open);
        assert!(shell.toggle_sidebar());
        assert!(shell.sidebar_overlays_editor());

        shell.on_resize(100, 40);
        assert!(shell.sidebar_open);
        assert!(!shell.sidebar_overlays_editor());
    }

    #[test]
    fn highlight_stays_in_bounds() {
        let mut shell = ShellState::new(120, 40, 100);
        shell.move_highlight(5, 3);
        assert_eq!(shell.highlighted, 2);
        shell.move_highlight(-10, 3);
        assert_eq!(shell.highlighted, 0);
        shell.highlighted = 7;
        shell.clamp_highlight(2);
        assert_eq!(shell.highlighted, 1);
        shell.clamp_highlight(0);
        assert_eq!(shell.highlighted, 0);
    }
}
