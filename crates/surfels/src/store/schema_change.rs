//! Schema changes
//!
//! Newly stored attributes are populated for every existing surfel from the
//! *old* dispatch table before any column is dropped, so a value that was
//! only reachable through an attribute being cleared is baked into its new
//! home first. Each surfel is converted exactly once per call.

use tracing::debug;

use super::SurfelStore;
use super::columns::Columns;
use crate::attribute::{Attribute, AttributeSet};
use crate::events::{Notify, StoreEvent};
use crate::schema::DispatchTable;

impl SurfelStore {
    /// Change which attributes are physically stored
    ///
    /// Returns false if the schema was already `schema`. Emits exactly one
    /// `SchemaChanged` event per effective call when `notify` is `Emit`.
    pub fn set_schema(&mut self, schema: AttributeSet, notify: Notify) -> bool {
        let schema = schema & AttributeSet::all();
        let old = self.table.stored();
        if schema == old {
            return false;
        }

        let added = schema.difference(old);
        let removed = old.difference(schema);

        let mut pending = Columns::default();
        for attribute in added.attributes() {
            self.materialize(attribute, &mut pending);
        }
        self.columns.adopt(pending);
        for attribute in removed.attributes() {
            self.columns.free(attribute);
        }
        self.table = DispatchTable::resolve(schema);

        debug!(
            "SurfelStore::set_schema: {:?} -> {:?} (added {:?}, removed {:?}, {} surfels converted)",
            old, schema, added, removed, self.len
        );

        if notify.is_emit() {
            self.emit(StoreEvent::SchemaChanged { old, new: schema });
        }
        true
    }

    /// Store `attributes` in addition to the current schema
    pub fn enable(&mut self, attributes: AttributeSet, notify: Notify) -> bool {
        self.set_schema(self.schema() | attributes, notify)
    }

    /// Stop storing `attributes`
    pub fn disable(&mut self, attributes: AttributeSet, notify: Notify) -> bool {
        self.set_schema(self.schema().difference(attributes), notify)
    }

    /// Fill the column of `attribute` in `pending` with values read through the current table
    fn materialize(&self, attribute: Attribute, pending: &mut Columns) {
        match attribute {
            Attribute::Position => pending.position = Some(self.collect_column(Self::position_at)),
            Attribute::Normal => pending.normal = Some(self.collect_column(Self::normal_at)),
            Attribute::TangentAxes => {
                pending.tangent_axes = Some(self.collect_column(Self::tangent_axes_at))
            }
            Attribute::Radius => pending.radius = Some(self.collect_column(Self::radius_at)),
            Attribute::DiffuseColor => {
                pending.diffuse_color = Some(self.collect_column(Self::diffuse_color_at))
            }
            Attribute::SpecularColor => {
                pending.specular_color = Some(self.collect_column(Self::specular_color_at))
            }
            Attribute::AmbientCoefficient => {
                pending.ambient_coefficient = Some(self.collect_column(Self::ambient_coefficient_at))
            }
            Attribute::DiffuseCoefficient => {
                pending.diffuse_coefficient = Some(self.collect_column(Self::diffuse_coefficient_at))
            }
            Attribute::SpecularCoefficient => {
                pending.specular_coefficient =
                    Some(self.collect_column(Self::specular_coefficient_at))
            }
            Attribute::Shininess => pending.shininess = Some(self.collect_column(Self::shininess_at)),
            Attribute::TextureCoordinate => {
                pending.texture_coordinate = Some(self.collect_column(Self::texture_coordinate_at))
            }
            Attribute::Flags => pending.flags = Some(self.collect_column(Self::flags_at)),
            Attribute::AssociatedSurfels => {
                pending.associated = Some(self.collect_column(Self::associated_at))
            }
            Attribute::Detail => pending.detail = Some(self.collect_column(Self::detail_at)),
        }
    }

    fn collect_column<T>(&self, read: impl Fn(&Self, usize) -> T) -> Vec<T> {
        let mut column = Vec::with_capacity(self.capacity.max(self.len));
        column.extend((0..self.len).map(|index| read(self, index)));
        column
    }
}
