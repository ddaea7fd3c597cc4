//! Library registry
//!
//! Single owner of the client-side library collection. Everything that
//! changes the collection (the bulk fetch, push events, local fallbacks)
//! goes through [`RegistryCommand`]s applied by [`LibraryRegistry::apply`];
//! consumers only ever see cloned [`RegistryState`] snapshots.
//!
//! The state lives in a `watch` channel. Each command runs to completion
//! inside one `send_if_modified` call, so commands never interleave, and
//! subscribers are only woken when a command actually changed something.

use std::collections::HashSet;
use std::sync::Arc;

use marquee_model::{Library, LibraryId};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::LibraryError;

/// Where the collection stands with respect to the bulk fetch.
///
/// `Idle → Fetching → {Ready, Errored}`, and both `Ready` and `Errored` may
/// go back to `Fetching`; no state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Fetching,
    Ready,
    Errored,
}

/// Snapshot of the collection as consumers see it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryState {
    status: FetchStatus,
    items: Vec<Library>,
    error: Option<LibraryError>,
}

impl RegistryState {
    pub fn status(&self) -> FetchStatus {
        self.status
    }

    /// Libraries in server order for the last fetch, followed by anything
    /// added since, in arrival order.
    pub fn items(&self) -> &[Library] {
        &self.items
    }

    /// The last fetch failure; only present while `status` is `Errored`.
    pub fn error(&self) -> Option<&LibraryError> {
        self.error.as_ref()
    }

    pub fn get(&self, id: LibraryId) -> Option<&Library> {
        self.items.iter().find(|library| library.id == id)
    }

    pub fn contains(&self, id: LibraryId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Apply one command, returning whether anything changed.
    fn apply(&mut self, command: RegistryCommand) -> bool {
        match command {
            RegistryCommand::ReplaceAll(records) => {
                let records = dedup_by_id(records);
                let changed = self.status != FetchStatus::Ready
                    || self.error.is_some()
                    || self.items != records;
                self.items = records;
                self.status = FetchStatus::Ready;
                self.error = None;
                changed
            }
            RegistryCommand::Add(record) => {
                if self.contains(record.id) {
                    return false;
                }
                self.items.push(record);
                true
            }
            RegistryCommand::Remove(id) => {
                let before = self.items.len();
                self.items.retain(|library| library.id != id);
                self.items.len() != before
            }
            RegistryCommand::MarkFetching => {
                let changed = self.status != FetchStatus::Fetching
                    || self.error.is_some();
                self.status = FetchStatus::Fetching;
                self.error = None;
                changed
            }
            RegistryCommand::MarkErrored(error) => {
                // Items stay: a failed refetch must not blank a populated view.
                self.status = FetchStatus::Errored;
                self.error = Some(error);
                true
            }
        }
    }
}

/// The closed vocabulary of registry mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryCommand {
    /// Authoritative reconciliation after a fetch: overwrite, not merge.
    ReplaceAll(Vec<Library>),
    /// Append unless a record with the same id is already present.
    Add(Library),
    /// Drop the record with this id, if any.
    Remove(LibraryId),
    MarkFetching,
    MarkErrored(LibraryError),
}

impl RegistryCommand {
    fn label(&self) -> &'static str {
        match self {
            RegistryCommand::ReplaceAll(_) => "replace_all",
            RegistryCommand::Add(_) => "add",
            RegistryCommand::Remove(_) => "remove",
            RegistryCommand::MarkFetching => "mark_fetching",
            RegistryCommand::MarkErrored(_) => "mark_errored",
        }
    }
}

fn dedup_by_id(records: Vec<Library>) -> Vec<Library> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|library| seen.insert(library.id))
        .collect()
}

/// Shared handle to the registry. Cloning is cheap; all clones see and
/// mutate the same collection.
#[derive(Clone)]
pub struct LibraryRegistry {
    state: Arc<watch::Sender<RegistryState>>,
}

impl std::fmt::Debug for LibraryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LibraryRegistry")
            .field("status", &state.status)
            .field("items", &state.items.len())
            .field("subscribers", &self.state.receiver_count())
            .finish()
    }
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryRegistry {
    /// Empty registry in the `Idle` state.
    pub fn new() -> Self {
        let (state, _) = watch::channel(RegistryState::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Apply a command. Returns `true` if the collection or status changed
    /// (and subscribers were notified).
    pub fn apply(&self, command: RegistryCommand) -> bool {
        let label = command.label();
        let changed = self.state.send_if_modified(|state| state.apply(command));
        if changed {
            debug!(command = label, "registry updated");
        } else {
            trace!(command = label, "registry command was a no-op");
        }
        changed
    }

    pub fn replace_all(&self, records: Vec<Library>) -> bool {
        self.apply(RegistryCommand::ReplaceAll(records))
    }

    pub fn add(&self, record: Library) -> bool {
        self.apply(RegistryCommand::Add(record))
    }

    pub fn remove(&self, id: LibraryId) -> bool {
        self.apply(RegistryCommand::Remove(id))
    }

    pub fn mark_fetching(&self) -> bool {
        self.apply(RegistryCommand::MarkFetching)
    }

    pub fn mark_errored(&self, error: LibraryError) -> bool {
        self.apply(RegistryCommand::MarkErrored(error))
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> RegistryState {
        self.state.borrow().clone()
    }

    /// Change notifications. The receiver starts with the current state
    /// marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<RegistryState> {
        self.state.subscribe()
    }

    pub fn status(&self) -> FetchStatus {
        self.state.borrow().status
    }

    pub fn contains(&self, id: LibraryId) -> bool {
        self.state.borrow().contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_model::MediaType;

    fn lib(id: i64, name: &str) -> Library {
        Library {
            id: LibraryId(id),
            name: name.to_string(),
            location: format!("/media/{id}"),
            media_type: MediaType::Movie,
        }
    }

    fn ids(state: &RegistryState) -> Vec<i64> {
        state.items().iter().map(|l| l.id.get()).collect()
    }

    #[test]
    fn starts_idle_and_empty() {
        let state = RegistryState::default();
        assert_eq!(state.status(), FetchStatus::Idle);
        assert!(state.is_empty());
        assert!(state.error().is_none());
    }

    #[test]
    fn add_is_idempotent_per_id() {
        let mut state = RegistryState::default();
        assert!(state.apply(RegistryCommand::Add(lib(1, "a"))));
        assert!(!state.apply(RegistryCommand::Add(lib(1, "a"))));
        // Same id with different details is still the same library.
        assert!(!state.apply(RegistryCommand::Add(lib(1, "renamed"))));
        assert_eq!(ids(&state), vec![1]);
        assert_eq!(state.get(LibraryId(1)).unwrap().name, "a");
    }

    #[test]
    fn remove_of_absent_id_is_a_noop() {
        let mut state = RegistryState::default();
        state.apply(RegistryCommand::Add(lib(1, "a")));
        let before = state.clone();
        assert!(!state.apply(RegistryCommand::Remove(LibraryId(9))));
        assert_eq!(state, before);
    }

    #[test]
    fn add_appends_in_arrival_order() {
        let mut state = RegistryState::default();
        state.apply(RegistryCommand::ReplaceAll(vec![lib(3, "c"), lib(1, "a")]));
        state.apply(RegistryCommand::Add(lib(2, "b")));
        assert_eq!(ids(&state), vec![3, 1, 2]);
    }

    #[test]
    fn replace_all_overwrites_local_changes() {
        let mut state = RegistryState::default();
        state.apply(RegistryCommand::ReplaceAll(vec![lib(1, "a"), lib(2, "b")]));
        state.apply(RegistryCommand::Remove(LibraryId(1)));
        state.apply(RegistryCommand::ReplaceAll(vec![
            lib(1, "a"),
            lib(2, "b"),
            lib(3, "c"),
        ]));
        assert_eq!(ids(&state), vec![1, 2, 3]);
        assert_eq!(state.status(), FetchStatus::Ready);
    }

    #[test]
    fn replace_all_drops_duplicate_ids_from_server() {
        let mut state = RegistryState::default();
        state.apply(RegistryCommand::ReplaceAll(vec![
            lib(1, "a"),
            lib(1, "dup"),
            lib(2, "b"),
        ]));
        assert_eq!(ids(&state), vec![1, 2]);
        assert_eq!(state.get(LibraryId(1)).unwrap().name, "a");
    }

    #[test]
    fn errored_keeps_items_and_refetch_clears_error() {
        let mut state = RegistryState::default();
        state.apply(RegistryCommand::MarkFetching);
        state.apply(RegistryCommand::ReplaceAll(vec![lib(1, "a")]));
        state.apply(RegistryCommand::MarkFetching);
        state.apply(RegistryCommand::MarkErrored(LibraryError::Network(
            "offline".into(),
        )));

        assert_eq!(state.status(), FetchStatus::Errored);
        assert_eq!(ids(&state), vec![1]);
        assert!(matches!(state.error(), Some(LibraryError::Network(_))));

        assert!(state.apply(RegistryCommand::MarkFetching));
        assert_eq!(state.status(), FetchStatus::Fetching);
        assert!(state.error().is_none());
        assert_eq!(ids(&state), vec![1]);
    }

    #[test]
    fn identical_replace_all_on_ready_is_not_a_change() {
        let mut state = RegistryState::default();
        state.apply(RegistryCommand::ReplaceAll(vec![lib(1, "a")]));
        assert!(!state.apply(RegistryCommand::ReplaceAll(vec![lib(1, "a")])));
    }

    #[tokio::test]
    async fn subscribers_only_see_real_changes() {
        let registry = LibraryRegistry::new();
        let mut rx = registry.subscribe();

        assert!(registry.add(lib(1, "a")));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        assert!(!registry.add(lib(1, "a")));
        assert!(!registry.remove(LibraryId(5)));
        assert!(!rx.has_changed().unwrap());

        assert!(registry.remove(LibraryId(1)));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_empty());
    }

    #[test]
    fn clones_share_one_collection() {
        let registry = LibraryRegistry::new();
        let other = registry.clone();
        other.add(lib(4, "d"));
        assert!(registry.contains(LibraryId(4)));
        assert_eq!(registry.snapshot().len(), 1);
    }
}
