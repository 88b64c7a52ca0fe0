use crate::config::Theme;
use crate::storage::KeyValueStore;
use crate::store::{NoteId, NotePatch, NoteStore, ThemeStore};

/// Requests the shell may make of the stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    CreateNote,
    SelectNote(NoteId),
    UpdateNote(NoteId, NotePatch),
    DeleteNote(NoteId),
    ToggleTheme,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(NoteId),
    Selected,
    Updated(bool),
    Deleted(bool),
    ThemeChanged(Theme),
}

pub struct ActionDispatcher<'a, S> {
    notes: &'a mut NoteStore<S>,
    theme: &'a mut ThemeStore<S>,
}

impl<'a, S: KeyValueStore> ActionDispatcher<'a, S> {
    pub fn new(notes: &'a mut NoteStore<S>, theme: &'a mut ThemeStore<S>) -> Self {
        Self { notes, theme }
    }

    pub fn dispatch(&mut self, intent: Intent) -> Outcome {
        match intent {
            Intent::CreateNote => Outcome::Created(self.notes.create()),
            Intent::SelectNote(id) => {
                self.notes.select(id);
                Outcome::Selected
            }
            Intent::UpdateNote(id, patch) => Outcome::Updated(self.notes.update(&id, patch)),
            Intent::DeleteNote(id) => Outcome::Deleted(self.notes.delete(&id)),
            Intent::ToggleTheme => Outcome::ThemeChanged(self.theme.toggle()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::storage::MemoryStore;
    use crate::store::FixedAppearance;

    #[test]
    fn intents_route_to_the_owning_store() {
        let backend = MemoryStore::new();
        let mut notes = NoteStore::load(backend.clone(), "notes");
        let mut theme = ThemeStore::load(backend.clone(), "theme", Box::new(FixedAppearance(None)));
        let mut dispatcher = ActionDispatcher::new(&mut notes, &mut theme);

        let id = assert_matches!(dispatcher.dispatch(Intent::CreateNote), Outcome::Created(id) => id);
        assert_eq!(
            dispatcher.dispatch(Intent::UpdateNote(id.clone(), NotePatch::title("Plan"))),
            Outcome::Updated(true)
        );
        assert_eq!(
            dispatcher.dispatch(Intent::ToggleTheme),
            Outcome::ThemeChanged(Theme::Dark)
        );
        assert_eq!(
            dispatcher.dispatch(Intent::DeleteNote(id.clone())),
            Outcome::Deleted(true)
        );
        assert_eq!(
            dispatcher.dispatch(Intent::DeleteNote(id)),
            Outcome::Deleted(false)
        );

        assert!(notes.is_empty());
        assert_eq!(backend.raw("theme").as_deref(), Some("dark"));
    }
}
