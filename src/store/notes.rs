use std::collections::HashSet;

use time::OffsetDateTime;

use super::note::{Note, NoteId, NotePatch};
use crate::storage::{KeyValueStore, StorageError};

/// Sole owner of the note collection and the current selection.
///
/// Every mutating operation persists the full collection under `key` before
/// returning. Persist failures are logged and swallowed; the in-memory
/// collection stays authoritative for the rest of the session.
pub struct NoteStore<S> {
    backend: S,
    key: String,
    notes: Vec<Note>,
    selection: Option<NoteId>,
}

impl<S: KeyValueStore> NoteStore<S> {
    /// Rehydrates the collection. Absent or unreadable data yields an empty
    /// store; this never fails.
    pub fn load(backend: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let notes = match backend.get(&key) {
            Ok(Some(raw)) => decode_collection(&key, &raw),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(%key, error = %err, "reading notes failed, starting empty");
                Vec::new()
            }
        };
        tracing::debug!(%key, count = notes.len(), "notes loaded");
        Self {
            backend,
            key,
            notes,
            selection: None,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id() == id)
    }

    pub fn position(&self, id: &NoteId) -> Option<usize> {
        self.notes.iter().position(|note| note.id() == id)
    }

    pub fn selection(&self) -> Option<&NoteId> {
        self.selection.as_ref()
    }

    pub fn current_note(&self) -> Option<&Note> {
        current_note(&self.notes, self.selection.as_ref())
    }

    pub fn create(&mut self) -> NoteId {
        let id = self.insert(NotePatch::default());
        self.persist_best_effort();
        id
    }

    /// Creates a note with `patch` already applied and writes the collection
    /// once. On a write failure the note stays in memory and the error is
    /// returned.
    pub fn try_create(&mut self, patch: NotePatch) -> Result<NoteId, StorageError> {
        let id = self.insert(patch);
        self.persist()?;
        Ok(id)
    }

    /// Applies `patch` to the note with `id`. Returns `false` and leaves the
    /// collection untouched when no such note exists.
    pub fn update(&mut self, id: &NoteId, patch: NotePatch) -> bool {
        let updated = self.apply_update(id, patch);
        if updated {
            self.persist_best_effort();
        }
        updated
    }

    pub fn try_update(&mut self, id: &NoteId, patch: NotePatch) -> Result<bool, StorageError> {
        if !self.apply_update(id, patch) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn delete(&mut self, id: &NoteId) -> bool {
        let removed = self.remove(id);
        if removed {
            self.persist_best_effort();
        }
        removed
    }

    pub fn try_delete(&mut self, id: &NoteId) -> Result<bool, StorageError> {
        if !self.remove(id) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Sets the selection without checking that `id` exists; a stale id simply
    /// yields no current note. Selection is never persisted.
    pub fn select(&mut self, id: NoteId) {
        self.selection = Some(id);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn persist(&self) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(&self.notes).map_err(|source| StorageError::Encode {
            key: self.key.clone(),
            source,
        })?;
        self.backend.set(&self.key, &encoded)
    }

    fn insert(&mut self, patch: NotePatch) -> NoteId {
        let now = OffsetDateTime::now_utc();
        let mut note = Note::new(now);
        note.apply(patch, now);
        let id = note.id().clone();
        self.notes.insert(0, note);
        self.selection = Some(id.clone());
        tracing::info!(%id, "note created");
        id
    }

    fn apply_update(&mut self, id: &NoteId, patch: NotePatch) -> bool {
        let Some(note) = self.notes.iter_mut().find(|note| note.id() == id) else {
            tracing::debug!(%id, "update for unknown note ignored");
            return false;
        };
        note.apply(patch, OffsetDateTime::now_utc());
        true
    }

    fn remove(&mut self, id: &NoteId) -> bool {
        let Some(idx) = self.position(id) else {
            tracing::debug!(%id, "delete for unknown note ignored");
            return false;
        };
        self.notes.remove(idx);
        if self.selection.as_ref() == Some(id) {
            self.selection = None;
        }
        tracing::info!(%id, "note deleted");
        true
    }

    fn persist_best_effort(&self) {
        if let Err(err) = self.persist() {
            tracing::warn!(key = %self.key, error = %err, "persisting notes failed");
        }
    }
}

/// The note whose id equals `selection`, if any.
pub fn current_note<'a>(notes: &'a [Note], selection: Option<&NoteId>) -> Option<&'a Note> {
    let selection = selection?;
    notes.iter().find(|note| note.id() == selection)
}

fn decode_collection(key: &str, raw: &str) -> Vec<Note> {
    let decoded: Vec<Note> = match serde_json::from_str(raw) {
        Ok(notes) => notes,
        Err(err) => {
            tracing::warn!(%key, error = %err, "stored notes are malformed, starting empty");
            return Vec::new();
        }
    };
    let mut seen = HashSet::with_capacity(decoded.len());
    let mut notes = Vec::with_capacity(decoded.len());
    for mut note in decoded {
        if !seen.insert(note.id().clone()) {
            tracing::warn!(%key, id = %note.id(), "dropping note with duplicate id");
            continue;
        }
        if note.updated() < note.created() {
            let created = note.created();
            note.touch(created);
        }
        notes.push(note);
    }
    notes
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::storage::MemoryStore;
    use crate::store::PLACEHOLDER_TITLE;

    const KEY: &str = "notes";

    fn empty_store() -> (MemoryStore, NoteStore<MemoryStore>) {
        let backend = MemoryStore::new();
        let store = NoteStore::load(backend.clone(), KEY);
        (backend, store)
    }

    #[test]
    fn creates_produce_distinct_ids_newest_first() {
        let (_backend, mut store) = empty_store();
        let ids: Vec<NoteId> = (0..25).map(|_| store.create()).collect();

        assert_eq!(store.len(), 25);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(store.notes()[0].id(), ids.last().expect("created ids"));
        assert_eq!(store.selection(), ids.last());
    }

    #[test]
    fn update_touches_only_the_target_note() {
        let (_backend, mut store) = empty_store();
        let first = store.create();
        let second = store.create();
        let untouched = store.get(&first).cloned().expect("first note");
        let before = store.get(&second).map(Note::updated).expect("second note");

        assert!(store.update(&second, NotePatch::title("x")));

        let note = store.get(&second).expect("second note");
        assert_eq!(note.title(), "x");
        assert!(note.updated() >= before);
        assert!(note.created() <= note.updated());
        assert_eq!(store.get(&first), Some(&untouched));
    }

    #[test]
    fn update_unknown_id_is_a_no_op() {
        let (backend, mut store) = empty_store();
        store.create();
        let persisted = backend.raw(KEY);
        let snapshot = store.notes().to_vec();

        assert!(!store.update(&NoteId::from("missing"), NotePatch::content("nope")));
        assert_eq!(store.notes(), snapshot.as_slice());
        assert_eq!(backend.raw(KEY), persisted);
    }

    #[test]
    fn delete_current_note_clears_selection() {
        let (_backend, mut store) = empty_store();
        let keep = store.create();
        let doomed = store.create();

        assert!(store.delete(&doomed));
        assert_eq!(store.len(), 1);
        assert!(store.get(&doomed).is_none());
        assert!(store.get(&keep).is_some());
        assert_eq!(store.selection(), None);
        assert!(!store.delete(&doomed));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_other_note_keeps_selection() {
        let (_backend, mut store) = empty_store();
        let other = store.create();
        let current = store.create();

        assert!(store.delete(&other));
        assert_eq!(store.selection(), Some(&current));
        assert_eq!(store.current_note().map(Note::id), Some(&current));
    }

    #[test]
    fn stale_selection_yields_no_current_note() {
        let (_backend, mut store) = empty_store();
        store.create();
        store.select(NoteId::from("gone"));
        assert_eq!(store.selection(), Some(&NoteId::from("gone")));
        assert!(store.current_note().is_none());
    }

    #[test]
    fn persisted_collection_round_trips() {
        let (backend, mut store) = empty_store();
        let a = store.create();
        let b = store.create();
        store.update(&a, NotePatch::title("alpha").with_content("first\nsecond"));
        store.update(&b, NotePatch::content("beta body"));

        let reloaded = NoteStore::load(backend, KEY);
        assert_eq!(reloaded.notes(), store.notes());
        assert_eq!(reloaded.selection(), None);
    }

    #[test]
    fn select_does_not_persist() {
        let (backend, mut store) = empty_store();
        let id = store.create();
        let persisted = backend.raw(KEY);
        store.clear_selection();
        store.select(id);
        assert_eq!(backend.raw(KEY), persisted);
    }

    #[test]
    fn corrupted_or_absent_data_loads_empty() {
        for raw in ["{not json", "{\"id\":1}", "[{\"title\":\"no id\"}]", ""] {
            let store = NoteStore::load(MemoryStore::with_entry(KEY, raw), KEY);
            assert!(store.is_empty(), "expected empty store for {raw:?}");
        }
        assert!(NoteStore::load(MemoryStore::new(), KEY).is_empty());
    }

    #[test]
    fn load_drops_duplicate_ids_and_repairs_timestamps() {
        let raw = r#"[
            {"id":"a","title":"first","content":"","created":"2024-01-02T00:00:00Z","updated":"2024-01-01T00:00:00Z"},
            {"id":"a","title":"second","content":"","created":"2024-01-01T00:00:00Z","updated":"2024-01-01T00:00:00Z"},
            {"id":"b","title":"third","content":"","created":"2024-01-01T00:00:00Z","updated":"2024-01-03T00:00:00Z"}
        ]"#;
        let store = NoteStore::load(MemoryStore::with_entry(KEY, raw), KEY);
        assert_eq!(store.len(), 2);
        let first = &store.notes()[0];
        assert_eq!(first.title(), "first");
        assert_eq!(first.updated(), first.created());
        assert_eq!(store.notes()[1].id().as_str(), "b");
    }

    #[test]
    fn write_failures_keep_state_in_memory() {
        let (backend, mut store) = empty_store();
        backend.set_fail_writes(true);

        let id = store.create();
        assert!(store.update(&id, NotePatch::content("kept")));
        assert_eq!(store.current_note().map(Note::content), Some("kept"));
        assert_eq!(backend.raw(KEY), None);
        assert_matches!(store.persist(), Err(StorageError::Unavailable(_)));
    }

    #[test]
    fn create_update_delete_scenario() {
        let (backend, mut store) = empty_store();
        let id = store.create();
        assert_eq!(store.len(), 1);
        let note = store.current_note().expect("current note");
        assert_eq!(note.title(), PLACEHOLDER_TITLE);
        assert_eq!(note.content(), "");

        store.update(&id, NotePatch::content("hello"));
        let note = store.get(&id).expect("note");
        assert_eq!(note.content(), "hello");
        assert_eq!(note.title(), PLACEHOLDER_TITLE);

        store.delete(&id);
        assert!(store.is_empty());
        assert_eq!(store.selection(), None);
        assert_eq!(backend.raw(KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn fallible_mutations_write_once_and_report_failures() {
        let (backend, mut store) = empty_store();
        let id = store
            .try_create(NotePatch::title("Plan").with_content("ship"))
            .expect("create persists");
        assert_eq!(backend.write_count(), 1);
        assert_eq!(store.current_note().map(Note::title), Some("Plan"));

        assert_matches!(store.try_update(&id, NotePatch::content("ship it")), Ok(true));
        let missing = NoteId::from("missing");
        assert_matches!(store.try_update(&missing, NotePatch::content("x")), Ok(false));
        assert_eq!(backend.write_count(), 2);

        backend.set_fail_writes(true);
        assert_matches!(store.try_delete(&id), Err(StorageError::Unavailable(_)));
        assert!(store.is_empty());
        backend.set_fail_writes(false);
        assert_matches!(store.try_delete(&id), Ok(false));
    }

    #[test]
    fn current_note_is_a_pure_lookup() {
        let (_backend, mut store) = empty_store();
        let id = store.create();
        assert_eq!(current_note(store.notes(), None), None);
        assert_eq!(
            current_note(store.notes(), Some(&id)).map(Note::id),
            Some(&id)
        );
    }
}
