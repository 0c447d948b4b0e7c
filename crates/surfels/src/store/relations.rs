//! Associated-surfel references and selection queries

use super::SurfelStore;
use crate::error::StoreError;
use crate::events::Notify;
use crate::handle::{Relocation, SurfelId, SurfelMut};
use crate::values::SelectionChannel;

impl SurfelStore {
    /// Record `to` in the associated-surfel list of `from`
    ///
    /// Stores `ASSOCIATED_SURFELS` if it is not stored yet. Associating twice
    /// is a no-op.
    pub fn associate(&mut self, from: SurfelId, to: SurfelId) -> Result<(), StoreError> {
        let index = self.resolve(from)?;
        SurfelMut { store: self, index }.associate(to)
    }

    /// Drop `to` from the associated-surfel list of `from`. Returns true if it was present.
    pub fn dissociate(&mut self, from: SurfelId, to: SurfelId) -> Result<bool, StoreError> {
        let index = self.resolve(from)?;
        let mut associated = self.associated_at(index);
        if !associated.remove(to) {
            return Ok(false);
        }
        self.set_associated_at(index, associated);
        Ok(true)
    }

    /// Live surfels associated with `id`; references to removed surfels are skipped
    pub fn associated(&self, id: SurfelId) -> Result<Vec<SurfelId>, StoreError> {
        let index = self.resolve(id)?;
        Ok(self
            .associated_at(index)
            .iter()
            .filter(|&other| self.contains(other))
            .collect())
    }

    /// Follow a swap-remove in every stored association list
    pub(crate) fn restamp_associations(&mut self, removed: SurfelId, relocation: Option<Relocation>) {
        let Some(column) = &mut self.columns.associated else {
            return;
        };
        for associated in column.iter_mut() {
            associated.remove(removed);
            if let Some(relocation) = relocation {
                associated.replace(relocation.from, relocation.to);
            }
        }
    }

    /// Ids of every surfel whose `channel` selection bit is set
    pub fn selected(&self, channel: SelectionChannel) -> Vec<SurfelId> {
        let flag = channel.flag();
        (0..self.len)
            .filter(|&index| self.flags_at(index).contains(flag))
            .map(|index| self.id_unchecked(index))
            .collect()
    }

    /// Clear the `channel` selection bit on every surfel
    pub fn clear_selection(&mut self, channel: SelectionChannel, notify: Notify) {
        let flag = channel.flag();
        if let Some(flags) = &mut self.columns.flags {
            for value in flags.iter_mut() {
                value.remove(flag);
            }
        }
        if notify.is_emit() {
            self.notify_collection_changed();
        }
    }
}
