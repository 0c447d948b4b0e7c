//! Change notifications emitted by a surfel store.
//!
//! Consumers (selection tools, renderers) rebuild their own caches from these
//! two events only; the store never pushes per-surfel diffs. Bulk operations
//! take a [`Notify`] argument so a caller can batch many mutations behind one
//! event and flush it with `SurfelStore::notify_collection_changed`.

use crate::attribute::AttributeSet;

/// Event delivered synchronously to every subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// The stored attribute set changed. Emitted once per `set_schema` call.
    SchemaChanged { old: AttributeSet, new: AttributeSet },
    /// Surfels were added, removed or replaced.
    CollectionChanged { len: usize },
}

/// Whether a mutation emits its event immediately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notify {
    #[default]
    Emit,
    Suppress,
}

impl Notify {
    #[inline]
    pub fn is_emit(self) -> bool {
        self == Notify::Emit
    }
}

/// Subscription token returned by `SurfelStore::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback = Box<dyn FnMut(&StoreEvent) + Send>;

/// Ordered list of subscriber callbacks
#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: Vec<(ObserverId, Callback)>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, callback: Callback) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn emit(&mut self, event: StoreEvent) {
        for (_, callback) in &mut self.entries {
            callback(&event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}
