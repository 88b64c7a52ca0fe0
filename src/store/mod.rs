//! Application state owned outside the UI: the note collection with its
//! selection, and the theme preference. Both persist through an injected
//! [`KeyValueStore`](crate::storage::KeyValueStore).

mod note;
mod notes;
mod theme;

pub use note::{Note, NoteId, NotePatch, PLACEHOLDER_TITLE};
pub use notes::{current_note, NoteStore};
pub use theme::{
    parse_colorfgbg, resolve_theme, ColorFgBg, FixedAppearance, SystemAppearance, ThemeSource,
    ThemeStore, FALLBACK_CHAIN,
};
