//! Surfel handles
//!
//! A [`SurfelId`] is the index of a surfel in its store plus the generation of
//! that slot. Removal swaps the last surfel into the hole, so the moved surfel
//! changes index: the store bumps both slot generations and reports the move as
//! a [`Relocation`]. Ids held elsewhere are not rewritten; they turn stale and
//! every lookup through them fails instead of aliasing another surfel.
//!
//! [`SurfelRef`] and [`SurfelMut`] are short-lived borrowed views exposing
//! typed accessors that go through the store's dispatch table.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::attribute::AttributeSet;
use crate::error::StoreError;
use crate::record::SurfelRecord;
use crate::store::SurfelStore;
use crate::values::{AssociatedSurfels, Color, Detail, SelectionChannel, SurfelFlags};

/// Generation-checked index of a surfel inside one store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfelId {
    index: u32,
    generation: u32,
}

impl SurfelId {
    /// Placeholder that never resolves
    pub const INVALID: SurfelId = SurfelId {
        index: u32::MAX,
        generation: u32::MAX,
    };

    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// The surfel formerly at `from` now lives at `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub from: SurfelId,
    pub to: SurfelId,
}

/// Read-only view of one surfel
#[derive(Clone, Copy)]
pub struct SurfelRef<'a> {
    pub(crate) store: &'a SurfelStore,
    pub(crate) index: usize,
}

impl<'a> SurfelRef<'a> {
    pub fn id(&self) -> SurfelId {
        self.store.id_unchecked(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn position(&self) -> Vec3 {
        self.store.position_at(self.index)
    }

    pub fn normal(&self) -> Vec3 {
        self.store.normal_at(self.index)
    }

    pub fn tangent_axes(&self) -> [Vec3; 2] {
        self.store.tangent_axes_at(self.index)
    }

    pub fn radius(&self) -> f32 {
        self.store.radius_at(self.index)
    }

    pub fn diffuse_color(&self) -> Color {
        self.store.diffuse_color_at(self.index)
    }

    pub fn specular_color(&self) -> Color {
        self.store.specular_color_at(self.index)
    }

    pub fn ambient_coefficient(&self) -> f32 {
        self.store.ambient_coefficient_at(self.index)
    }

    pub fn diffuse_coefficient(&self) -> f32 {
        self.store.diffuse_coefficient_at(self.index)
    }

    pub fn specular_coefficient(&self) -> f32 {
        self.store.specular_coefficient_at(self.index)
    }

    pub fn shininess(&self) -> f32 {
        self.store.shininess_at(self.index)
    }

    pub fn texture_coordinate(&self) -> Vec2 {
        self.store.texture_coordinate_at(self.index)
    }

    pub fn flags(&self) -> SurfelFlags {
        self.store.flags_at(self.index)
    }

    pub fn is_selected(&self, channel: SelectionChannel) -> bool {
        self.flags().contains(channel.flag())
    }

    pub fn associated(&self) -> AssociatedSurfels {
        self.store.associated_at(self.index)
    }

    pub fn detail(&self) -> Detail {
        self.store.detail_at(self.index)
    }

    /// Snapshot of every attribute as currently visible
    pub fn record(&self) -> SurfelRecord {
        self.store.record_at(self.index)
    }
}

impl std::fmt::Debug for SurfelRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfelRef")
            .field("index", &self.index)
            .field("position", &self.position())
            .finish()
    }
}

/// Mutable view of one surfel
///
/// Writing an attribute the schema does not store first upgrades the schema
/// to store it (emitting one schema-changed event), then performs the write.
pub struct SurfelMut<'a> {
    pub(crate) store: &'a mut SurfelStore,
    pub(crate) index: usize,
}

impl<'a> SurfelMut<'a> {
    /// Reborrow as a read-only view
    pub fn as_ref(&self) -> SurfelRef<'_> {
        SurfelRef {
            store: &*self.store,
            index: self.index,
        }
    }

    pub fn id(&self) -> SurfelId {
        self.store.id_unchecked(self.index)
    }

    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.store.set_position_at(self.index, position);
        self
    }

    pub fn set_normal(&mut self, normal: Vec3) -> &mut Self {
        self.store.set_normal_at(self.index, normal);
        self
    }

    pub fn set_tangent_axes(&mut self, axes: [Vec3; 2]) -> &mut Self {
        self.store.set_tangent_axes_at(self.index, axes);
        self
    }

    pub fn set_radius(&mut self, radius: f32) -> &mut Self {
        self.store.set_radius_at(self.index, radius);
        self
    }

    pub fn set_diffuse_color(&mut self, color: Color) -> &mut Self {
        self.store.set_diffuse_color_at(self.index, color);
        self
    }

    pub fn set_specular_color(&mut self, color: Color) -> &mut Self {
        self.store.set_specular_color_at(self.index, color);
        self
    }

    pub fn set_ambient_coefficient(&mut self, value: f32) -> &mut Self {
        self.store.set_ambient_coefficient_at(self.index, value);
        self
    }

    pub fn set_diffuse_coefficient(&mut self, value: f32) -> &mut Self {
        self.store.set_diffuse_coefficient_at(self.index, value);
        self
    }

    pub fn set_specular_coefficient(&mut self, value: f32) -> &mut Self {
        self.store.set_specular_coefficient_at(self.index, value);
        self
    }

    pub fn set_shininess(&mut self, value: f32) -> &mut Self {
        self.store.set_shininess_at(self.index, value);
        self
    }

    pub fn set_texture_coordinate(&mut self, uv: Vec2) -> &mut Self {
        self.store.set_texture_coordinate_at(self.index, uv);
        self
    }

    pub fn set_flags(&mut self, flags: SurfelFlags) -> &mut Self {
        self.store.set_flags_at(self.index, flags);
        self
    }

    /// Set or clear a single flag, leaving the others untouched
    pub fn set_flag(&mut self, flag: SurfelFlags, value: bool) -> &mut Self {
        let mut flags = self.store.flags_at(self.index);
        flags.set(flag, value);
        self.set_flags(flags)
    }

    pub fn set_selected(&mut self, channel: SelectionChannel, value: bool) -> &mut Self {
        self.set_flag(channel.flag(), value)
    }

    pub fn set_associated(&mut self, associated: AssociatedSurfels) -> &mut Self {
        self.store.set_associated_at(self.index, associated);
        self
    }

    pub fn set_detail(&mut self, detail: Detail) -> &mut Self {
        self.store.set_detail_at(self.index, detail);
        self
    }

    /// Write the attributes of `record` selected by `attributes`
    ///
    /// Attributes outside the current schema are skipped rather than upgraded.
    pub fn write_record(&mut self, record: &SurfelRecord, attributes: AttributeSet) -> &mut Self {
        self.store.write_record_at(self.index, record, attributes);
        self
    }

    /// Add a back-reference to another surfel of the same store
    pub fn associate(&mut self, other: SurfelId) -> Result<(), StoreError> {
        if other == self.id() {
            return Err(StoreError::SelfAssociation);
        }
        if !self.store.contains(other) {
            return Err(StoreError::StaleHandle(other));
        }
        let mut associated = self.store.associated_at(self.index);
        associated.push(other)?;
        self.store.set_associated_at(self.index, associated);
        Ok(())
    }
}
