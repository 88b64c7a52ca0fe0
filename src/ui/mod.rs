use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::Frame;
use time::{macros::format_description, OffsetDateTime, UtcOffset};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{EditField, FocusPane, ShellState};
use crate::config::{Palette, Theme, UiOptions};
use crate::store::Note;

/// Everything the renderer reads. The UI never touches the stores directly.
pub struct View<'a> {
    pub notes: &'a [Note],
    pub current: Option<&'a Note>,
    pub theme: Theme,
    pub shell: &'a ShellState,
    pub ui: &'a UiOptions,
}

pub fn draw_app(frame: &mut Frame, view: &View<'_>, list_state: &mut ListState) {
    let palette = view.theme.palette();
    let area = frame.size();
    frame.render_widget(Block::default().style(palette.base()), area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    draw_top_bar(frame, view, &palette, vertical[0]);

    let body = vertical[1];
    let sidebar_width = view.ui.sidebar_width.min(body.width);
    if view.shell.sidebar_open && !view.shell.sidebar_overlays_editor() {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(sidebar_width), Constraint::Min(1)])
            .split(body);
        draw_sidebar(frame, view, &palette, columns[0], list_state);
        draw_main(frame, view, &palette, columns[1]);
    } else {
        draw_main(frame, view, &palette, body);
        if view.shell.sidebar_overlays_editor() {
            let overlay = Rect {
                width: sidebar_width,
                ..body
            };
            frame.render_widget(Clear, overlay);
            draw_sidebar(frame, view, &palette, overlay, list_state);
        }
    }

    draw_status_line(frame, view, &palette, vertical[2]);
}

fn draw_top_bar(frame: &mut Frame, view: &View<'_>, palette: &Palette, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" ☰ ", Style::default().fg(palette.primary)),
        Span::styled(
            "Personal Notes",
            Style::default()
                .fg(palette.primary)
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    let label = format!("{} theme · Ctrl-t ", view.theme);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(label.width() as u16),
        ])
        .split(area);
    let style = Style::default().bg(palette.sidebar);
    frame.render_widget(Paragraph::new(line).style(style), columns[0]);
    frame.render_widget(
        Paragraph::new(Span::styled(label, palette.muted())).style(style),
        columns[1],
    );
}

fn draw_sidebar(
    frame: &mut Frame,
    view: &View<'_>,
    palette: &Palette,
    area: Rect,
    list_state: &mut ListState,
) {
    let focused = view.shell.focus == FocusPane::Sidebar;
    let block = Block::default()
        .title(Span::styled(
            " Notes  [a] new ",
            Style::default()
                .fg(palette.primary)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(palette.primary)
        } else {
            palette.border()
        })
        .style(palette.sidebar_base());

    if view.notes.is_empty() {
        let hint = Paragraph::new(Text::from(vec![
            Line::from(""),
            Line::from("No notes yet."),
            Line::from(vec![
                Span::raw("Press "),
                Span::styled(
                    "a",
                    Style::default()
                        .fg(palette.primary)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" to create."),
            ]),
        ]))
        .style(palette.muted())
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let inner_width = area.width.saturating_sub(4) as usize;
    let current_id = view.current.map(Note::id);
    let items: Vec<ListItem> = view
        .notes
        .iter()
        .map(|note| {
            let is_current = current_id == Some(note.id());
            let title_style = if is_current {
                Style::default()
                    .fg(palette.primary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.text)
            };
            let preview = note_preview(note, view.ui.preview_chars);
            ListItem::new(vec![
                Line::from(Span::styled(
                    truncate_to_width(note.display_title(), inner_width),
                    title_style,
                )),
                Line::from(Span::styled(
                    truncate_to_width(&preview, inner_width),
                    palette.muted(),
                )),
            ])
        })
        .collect();

    let highlight = if focused {
        Style::default()
            .bg(palette.selection)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let list = List::new(items)
        .block(block)
        .highlight_style(highlight)
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn draw_main(frame: &mut Frame, view: &View<'_>, palette: &Palette, area: Rect) {
    let Some(note) = view.current else {
        let lines = if view.notes.is_empty() {
            vec![
                Line::from(Span::styled(
                    "Welcome to Notes",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Press Ctrl-n to create your first note",
                    Style::default().fg(palette.primary),
                )),
            ]
        } else {
            vec![
                Line::from("Select a note"),
                Line::from(Span::styled(
                    "Choose an item from the sidebar",
                    palette.muted(),
                )),
            ]
        };
        let top_padding = area.height.saturating_sub(lines.len() as u16) / 2;
        let mut padded = vec![Line::from(""); top_padding as usize];
        padded.extend(lines);
        frame.render_widget(
            Paragraph::new(padded)
                .alignment(Alignment::Center)
                .style(palette.base()),
            area,
        );
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area.inner(Margin {
            horizontal: 2,
            vertical: 1,
        }));

    let editor = view
        .shell
        .editor()
        .filter(|editor| editor.note_id() == note.id());

    let title_field = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(palette.primary));
    let title_text = editor
        .filter(|editor| editor.field() == EditField::Title)
        .map(|editor| editor.buffer())
        .unwrap_or_else(|| note.title());
    let title_line = if title_text.is_empty() {
        Line::from(Span::styled("Title", palette.muted()))
    } else {
        Line::from(Span::styled(
            title_text.to_string(),
            Style::default()
                .fg(palette.text)
                .add_modifier(Modifier::BOLD),
        ))
    };
    let title_scroll = editor
        .filter(|editor| editor.field() == EditField::Title)
        .map(|editor| {
            let (_, col) = cursor_line_col(editor.buffer(), editor.cursor());
            horizontal_offset(col, rows[0].width)
        })
        .unwrap_or(0);
    frame.render_widget(
        Paragraph::new(title_line)
            .block(title_field)
            .scroll((0, title_scroll)),
        rows[0],
    );

    let content_text = editor
        .filter(|editor| editor.field() == EditField::Content)
        .map(|editor| editor.buffer())
        .unwrap_or_else(|| note.content());
    let content_area = rows[1];
    let (scroll_y, scroll_x) = editor
        .filter(|editor| editor.field() == EditField::Content)
        .map(|editor| {
            let (line, col) = cursor_line_col(editor.buffer(), editor.cursor());
            (
                vertical_offset(line, content_area.height),
                horizontal_offset(col, content_area.width),
            )
        })
        .unwrap_or((0, 0));
    let content = if content_text.is_empty() {
        Paragraph::new(Span::styled("Write your note here…", palette.muted()))
    } else {
        Paragraph::new(content_text.to_string()).style(Style::default().fg(palette.text))
    };
    frame.render_widget(content.scroll((scroll_y, scroll_x)), content_area);

    let footer = Line::from(vec![
        Span::raw(format!("Created {}", format_timestamp(note.created()))),
        Span::styled(" • ", Style::default().fg(palette.accent)),
        Span::raw(format!("Updated {}", format_timestamp(note.updated()))),
    ]);
    frame.render_widget(Paragraph::new(footer).style(palette.muted()), rows[2]);

    if let Some(editor) = editor {
        let (line, col) = cursor_line_col(editor.buffer(), editor.cursor());
        match (view.shell.focus, editor.field()) {
            (FocusPane::Title, EditField::Title) => {
                let x = rows[0].x + (col as u16).saturating_sub(title_scroll);
                frame.set_cursor(x.min(rows[0].right().saturating_sub(1)), rows[0].y);
            }
            (FocusPane::Content, EditField::Content) => {
                let x = content_area.x + (col as u16).saturating_sub(scroll_x);
                let y = content_area.y + (line as u16).saturating_sub(scroll_y);
                frame.set_cursor(
                    x.min(content_area.right().saturating_sub(1)),
                    y.min(content_area.bottom().saturating_sub(1)),
                );
            }
            _ => {}
        }
    }
}

fn draw_status_line(frame: &mut Frame, view: &View<'_>, palette: &Palette, area: Rect) {
    let text = match view.shell.status_message() {
        Some(message) => Span::styled(format!(" {message}"), Style::default().fg(palette.accent)),
        None => Span::styled(
            match view.shell.focus {
                FocusPane::Sidebar => {
                    " j/k move · Enter open · a new · d delete · Tab edit · Ctrl-b sidebar · q quit"
                }
                FocusPane::Title | FocusPane::Content => {
                    " Esc sidebar · Tab next field · Ctrl-n new · Ctrl-d delete · Ctrl-q quit"
                }
            },
            palette.muted(),
        ),
    };
    frame.render_widget(
        Paragraph::new(Line::from(text)).style(Style::default().bg(palette.sidebar)),
        area,
    );
}

/// First line of the note's content, cut to `max_chars` characters.
pub fn note_preview(note: &Note, max_chars: usize) -> String {
    note.first_line().chars().take(max_chars).collect()
}

pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let w = grapheme.width();
        if used + w + 1 > width {
            break;
        }
        out.push_str(grapheme);
        used += w;
    }
    out.push('…');
    out
}

/// (line index, display column) of a byte cursor.
pub fn cursor_line_col(buffer: &str, cursor: usize) -> (usize, usize) {
    let before = &buffer[..cursor];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    (line, before[line_start..].width())
}

fn vertical_offset(line: usize, height: u16) -> u16 {
    let height = height.max(1) as usize;
    line.saturating_sub(height - 1) as u16
}

fn horizontal_offset(col: usize, width: u16) -> u16 {
    let width = width.max(1) as usize;
    col.saturating_sub(width - 1) as u16
}

pub fn format_timestamp(dt: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute] UTC");
    let dt = dt.to_offset(UtcOffset::UTC);
    dt.format(&format)
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}
