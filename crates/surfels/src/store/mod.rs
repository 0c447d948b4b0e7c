//! Columnar surfel store
//!
//! The store owns one growable array per stored attribute
//! (structure-of-arrays). Surfels are created and destroyed only through the
//! store; [`SurfelId`] handles index into it.
//!
//! Removal is O(1): the last surfel is swapped into the hole. The moved
//! surfel changes index, which invalidates any outstanding id of it. See
//! [`crate::handle`] for how stale ids are detected.

mod access;
mod bulk;
mod columns;
mod relations;
mod schema_change;

use stipple_config::StoreConfig;
use tracing::trace;

use crate::attribute::AttributeSet;
use crate::error::StoreError;
use crate::events::{Notify, ObserverId, Observers, StoreEvent};
use crate::handle::{Relocation, SurfelId, SurfelMut, SurfelRef};
use crate::record::SurfelRecord;
use crate::schema::DispatchTable;

use columns::Columns;

pub use access::{normal_from_tangent_axes, radius_from_tangent_axes, tangent_axes_from_normal};

/// Structure-of-arrays surfel collection with a runtime-selectable schema
#[derive(Debug)]
pub struct SurfelStore {
    config: StoreConfig,
    table: DispatchTable,
    pub(crate) columns: Columns,
    len: usize,
    capacity: usize,
    /// Per-slot generation; never shrinks so vacated slots stay invalidated
    generations: Vec<u32>,
    cursor: Option<usize>,
    observers: Observers,
}

impl Default for SurfelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfelStore {
    /// Create an empty store that stores no attributes
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let mut store = Self {
            config,
            table: DispatchTable::default(),
            columns: Columns::default(),
            len: 0,
            capacity: 0,
            generations: Vec::new(),
            cursor: None,
            observers: Observers::default(),
        };
        store.reserve(config.initial_capacity);
        store
    }

    /// Create an empty store with the given stored attributes
    pub fn with_schema(schema: AttributeSet) -> Self {
        let mut store = Self::new();
        store.set_schema(schema, Notify::Suppress);
        store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Attributes with physical storage
    #[inline]
    pub fn schema(&self) -> AttributeSet {
        self.table.stored()
    }

    /// Read routes resolved for the current schema
    #[inline]
    pub fn dispatch(&self) -> &DispatchTable {
        &self.table
    }

    /// Ensure room for at least `capacity` surfels without further growth
    pub fn reserve(&mut self, capacity: usize) {
        if capacity > self.capacity {
            self.grow_to(capacity);
        }
    }

    fn grow_to(&mut self, capacity: usize) {
        trace!("SurfelStore: capacity {} -> {}", self.capacity, capacity);
        for column in self.columns.stored_columns_mut() {
            column.reserve_total(capacity);
        }
        self.capacity = capacity;
    }

    /// Append a surfel holding default values for every stored attribute
    pub fn add_surfel(&mut self, notify: Notify) -> SurfelId {
        self.push_surfel(&SurfelRecord::default(), notify)
    }

    /// Append a surfel initialized from `record` (stored attributes only)
    pub fn add_surfel_from(&mut self, record: &SurfelRecord, notify: Notify) -> SurfelId {
        self.push_surfel(record, notify)
    }

    fn push_surfel(&mut self, record: &SurfelRecord, notify: Notify) -> SurfelId {
        if self.len == self.capacity {
            let grown = self.config.grown_capacity(self.capacity);
            self.grow_to(grown);
        }
        let index = self.len;
        self.push_record(record);
        self.len += 1;
        if self.generations.len() <= index {
            self.generations.push(0);
        }
        if notify.is_emit() {
            self.notify_collection_changed();
        }
        self.id_unchecked(index)
    }

    /// Remove a surfel by swapping the last surfel into its slot
    ///
    /// Returns the relocation of the moved surfel, if any. Its previous id is
    /// stale afterwards. Associated-surfel lists are re-stamped to the moved
    /// surfel's new id and drop the removed one.
    pub fn remove_surfel(
        &mut self,
        id: SurfelId,
        notify: Notify,
    ) -> Result<Option<Relocation>, StoreError> {
        let index = self.resolve(id)?;
        let relocation = self.remove_index(index);
        if notify.is_emit() {
            self.notify_collection_changed();
        }
        Ok(relocation)
    }

    pub(crate) fn remove_index(&mut self, index: usize) -> Option<Relocation> {
        let last = self.len - 1;
        let removed = self.id_unchecked(index);
        for column in self.columns.stored_columns_mut() {
            column.swap_remove_at(index);
        }
        self.len -= 1;

        self.cursor = match self.cursor {
            Some(cursor) if cursor == index => None,
            Some(cursor) if cursor == last => Some(index),
            other => other,
        };

        let relocation = if index == last {
            self.bump_generation(last);
            None
        } else {
            let from = self.id_unchecked(last);
            self.bump_generation(index);
            self.bump_generation(last);
            Some(Relocation {
                from,
                to: self.id_unchecked(index),
            })
        };
        self.restamp_associations(removed, relocation);
        relocation
    }

    /// Grow with default surfels or truncate to `len`
    pub fn resize(&mut self, len: usize, notify: Notify) {
        if len > self.len {
            self.reserve(len);
            let defaults = SurfelRecord::default();
            while self.len < len {
                self.push_surfel(&defaults, Notify::Suppress);
            }
        } else if len < self.len {
            for column in self.columns.stored_columns_mut() {
                column.truncate_to(len);
            }
            for index in len..self.len {
                self.bump_generation(index);
            }
            self.len = len;
            if self.cursor.is_some_and(|cursor| cursor >= len) {
                self.cursor = None;
            }
        } else {
            return;
        }
        if notify.is_emit() {
            self.notify_collection_changed();
        }
    }

    /// Remove every surfel, keeping the schema
    pub fn clear(&mut self, notify: Notify) {
        self.resize(0, notify);
    }

    #[inline]
    fn bump_generation(&mut self, index: usize) {
        self.generations[index] = self.generations[index].wrapping_add(1);
    }

    #[inline]
    pub(crate) fn id_unchecked(&self, index: usize) -> SurfelId {
        SurfelId::new(index as u32, self.generations[index])
    }

    /// Id a surfel appended at slot `index` would receive
    pub(crate) fn id_for_new_slot(&self, index: usize) -> SurfelId {
        SurfelId::new(index as u32, self.generations.get(index).copied().unwrap_or(0))
    }

    /// Slot index of a live id
    pub fn resolve(&self, id: SurfelId) -> Result<usize, StoreError> {
        let index = id.index();
        if index < self.len && self.generations[index] == id.generation() {
            Ok(index)
        } else {
            Err(StoreError::StaleHandle(id))
        }
    }

    /// Whether `id` refers to a live surfel
    pub fn contains(&self, id: SurfelId) -> bool {
        self.resolve(id).is_ok()
    }

    /// Id of the surfel currently at `index`
    pub fn id_at(&self, index: usize) -> Option<SurfelId> {
        (index < self.len).then(|| self.id_unchecked(index))
    }

    pub fn get(&self, id: SurfelId) -> Option<SurfelRef<'_>> {
        let index = self.resolve(id).ok()?;
        Some(SurfelRef { store: self, index })
    }

    pub fn get_mut(&mut self, id: SurfelId) -> Option<SurfelMut<'_>> {
        let index = self.resolve(id).ok()?;
        Some(SurfelMut { store: self, index })
    }

    /// View of the surfel at `index`
    pub fn at(&self, index: usize) -> Option<SurfelRef<'_>> {
        (index < self.len).then_some(SurfelRef { store: self, index })
    }

    pub fn at_mut(&mut self, index: usize) -> Option<SurfelMut<'_>> {
        if index < self.len {
            Some(SurfelMut { store: self, index })
        } else {
            None
        }
    }

    /// Iterate every live surfel in index order
    pub fn iter(&self) -> impl Iterator<Item = SurfelRef<'_>> + '_ {
        (0..self.len).map(move |index| SurfelRef { store: self, index })
    }

    /// Ids of every live surfel in index order
    pub fn ids(&self) -> Vec<SurfelId> {
        (0..self.len).map(|index| self.id_unchecked(index)).collect()
    }

    /// Position the cursor on the first surfel
    pub fn reset_cursor(&mut self) -> Option<SurfelId> {
        self.cursor = (self.len > 0).then_some(0);
        self.cursor()
    }

    /// Move the cursor to the next surfel; `None` once past the end
    pub fn advance_cursor(&mut self) -> Option<SurfelId> {
        self.cursor = match self.cursor {
            Some(index) if index + 1 < self.len => Some(index + 1),
            _ => None,
        };
        self.cursor()
    }

    /// Surfel under the cursor
    pub fn cursor(&self) -> Option<SurfelId> {
        self.cursor.map(|index| self.id_unchecked(index))
    }

    /// Register a callback for store events
    pub fn subscribe(&mut self, callback: impl FnMut(&StoreEvent) + Send + 'static) -> ObserverId {
        self.observers.subscribe(Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Emit a collection-changed event, e.g. after a suppressed batch
    pub fn notify_collection_changed(&mut self) {
        let len = self.len;
        self.observers.emit(StoreEvent::CollectionChanged { len });
    }

    pub(crate) fn emit(&mut self, event: StoreEvent) {
        self.observers.emit(event);
    }
}
