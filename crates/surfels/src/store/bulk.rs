//! Whole-store operations: copy, merge and batch removal

use tracing::debug;

use super::SurfelStore;
use crate::events::Notify;
use crate::handle::SurfelId;

impl SurfelStore {
    /// Replace the contents with a deep value copy of `other`
    ///
    /// Adopts `other`'s schema first. Associations are re-stamped to this
    /// store's ids; observers are not copied.
    pub fn copy_from(&mut self, other: &SurfelStore, notify: Notify) {
        self.clear(Notify::Suppress);
        self.set_schema(other.schema(), notify);

        self.columns = other.columns.clone();
        self.len = other.len;
        while self.generations.len() < self.len {
            self.generations.push(0);
        }
        let capacity = self.capacity.max(self.len);
        self.capacity = 0;
        self.grow_to(capacity);

        if let Some(column) = &mut self.columns.associated {
            let generations = &self.generations;
            for associated in column.iter_mut() {
                associated.retain_map(|id| {
                    let index = other.resolve(id).ok()?;
                    Some(SurfelId::new(index as u32, generations[index]))
                });
            }
        }
        self.cursor = None;

        debug!("SurfelStore::copy_from: copied {} surfels", self.len);
        if notify.is_emit() {
            self.notify_collection_changed();
        }
    }

    /// Move every surfel of `other` into this store by value, emptying `other`
    ///
    /// The schema becomes the union of both schemas so no stored value is lost.
    pub fn merge(&mut self, other: &mut SurfelStore, notify: Notify) {
        self.set_schema(self.schema() | other.schema(), notify);

        let base = self.len;
        self.reserve(base + other.len);
        for index in 0..other.len {
            let mut record = other.record_at(index);
            record.associated.retain_map(|id| {
                let source = other.resolve(id).ok()?;
                Some(self.id_for_new_slot(base + source))
            });
            self.push_surfel(&record, Notify::Suppress);
        }

        debug!(
            "SurfelStore::merge: merged {} surfels (now {})",
            other.len, self.len
        );
        other.clear(notify);
        if notify.is_emit() {
            self.notify_collection_changed();
        }
    }

    /// Remove several surfels, skipping stale ids
    ///
    /// Removal runs in descending index order, so a surfel swapped into a hole
    /// is never one still waiting to be removed. Returns the number removed.
    pub fn remove_surfels(&mut self, ids: &[SurfelId], notify: Notify) -> usize {
        let mut indices: Vec<usize> = ids.iter().filter_map(|&id| self.resolve(id).ok()).collect();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();

        for &index in &indices {
            self.remove_index(index);
        }

        if notify.is_emit() && !indices.is_empty() {
            self.notify_collection_changed();
        }
        indices.len()
    }
}
