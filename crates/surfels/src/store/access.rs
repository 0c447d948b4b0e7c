//! Typed attribute access routed through the dispatch table

use glam::{Quat, Vec2, Vec3};
use tracing::debug;

use super::SurfelStore;
use super::columns::{stored, stored_mut};
use crate::attribute::{Attribute, AttributeSet};
use crate::events::Notify;
use crate::frame::LocalFrame;
use crate::record::SurfelRecord;
use crate::schema::Route;
use crate::values::{
    AssociatedSurfels, Color, Detail, SurfelFlags, DEFAULT_AMBIENT_COEFFICIENT,
    DEFAULT_DIFFUSE_COEFFICIENT, DEFAULT_DIFFUSE_COLOR, DEFAULT_NORMAL, DEFAULT_POSITION,
    DEFAULT_RADIUS, DEFAULT_SHININESS, DEFAULT_SPECULAR_COEFFICIENT, DEFAULT_SPECULAR_COLOR,
    DEFAULT_TEXTURE_COORDINATE,
};

/// Normal implied by two tangent axes
pub fn normal_from_tangent_axes(axes: [Vec3; 2]) -> Vec3 {
    axes[0].cross(axes[1]).try_normalize().unwrap_or(DEFAULT_NORMAL)
}

/// Radius implied by two tangent axes: their mean length
pub fn radius_from_tangent_axes(axes: [Vec3; 2]) -> f32 {
    0.5 * (axes[0].length() + axes[1].length())
}

/// Circular tangent axes around `normal` with length `radius`
pub fn tangent_axes_from_normal(normal: Vec3, radius: f32) -> [Vec3; 2] {
    let frame = LocalFrame::from_normal(normal);
    [frame.x * radius, frame.y * radius]
}

/// Rotate `axes` so their normal becomes `normal`, keeping their shape
fn reorient_axes(axes: [Vec3; 2], normal: Vec3) -> [Vec3; 2] {
    let current = axes[0].cross(axes[1]).try_normalize();
    match (current, normal.try_normalize()) {
        (Some(current), Some(normal)) => {
            let rotation = Quat::from_rotation_arc(current, normal);
            [rotation * axes[0], rotation * axes[1]]
        }
        _ => tangent_axes_from_normal(normal, radius_from_tangent_axes(axes)),
    }
}

impl SurfelStore {
    #[inline]
    fn native_or<T: Copy>(&self, attribute: Attribute, column: &Option<Vec<T>>, index: usize, default: T) -> T {
        match self.table.route(attribute) {
            Route::Native => stored(column)[index],
            Route::Derived | Route::Default => default,
        }
    }

    pub(crate) fn position_at(&self, index: usize) -> Vec3 {
        self.native_or(Attribute::Position, &self.columns.position, index, DEFAULT_POSITION)
    }

    pub(crate) fn normal_at(&self, index: usize) -> Vec3 {
        match self.table.route(Attribute::Normal) {
            Route::Native => stored(&self.columns.normal)[index],
            Route::Derived => normal_from_tangent_axes(stored(&self.columns.tangent_axes)[index]),
            Route::Default => DEFAULT_NORMAL,
        }
    }

    pub(crate) fn tangent_axes_at(&self, index: usize) -> [Vec3; 2] {
        match self.table.route(Attribute::TangentAxes) {
            Route::Native => stored(&self.columns.tangent_axes)[index],
            // normal and radius are native or defaulted here, never derived
            Route::Derived => tangent_axes_from_normal(self.normal_at(index), self.radius_at(index)),
            Route::Default => tangent_axes_from_normal(DEFAULT_NORMAL, DEFAULT_RADIUS),
        }
    }

    pub(crate) fn radius_at(&self, index: usize) -> f32 {
        match self.table.route(Attribute::Radius) {
            Route::Native => stored(&self.columns.radius)[index],
            Route::Derived => radius_from_tangent_axes(stored(&self.columns.tangent_axes)[index]),
            Route::Default => DEFAULT_RADIUS,
        }
    }

    pub(crate) fn diffuse_color_at(&self, index: usize) -> Color {
        self.native_or(Attribute::DiffuseColor, &self.columns.diffuse_color, index, DEFAULT_DIFFUSE_COLOR)
    }

    pub(crate) fn specular_color_at(&self, index: usize) -> Color {
        self.native_or(Attribute::SpecularColor, &self.columns.specular_color, index, DEFAULT_SPECULAR_COLOR)
    }

    pub(crate) fn ambient_coefficient_at(&self, index: usize) -> f32 {
        self.native_or(
            Attribute::AmbientCoefficient,
            &self.columns.ambient_coefficient,
            index,
            DEFAULT_AMBIENT_COEFFICIENT,
        )
    }

    pub(crate) fn diffuse_coefficient_at(&self, index: usize) -> f32 {
        self.native_or(
            Attribute::DiffuseCoefficient,
            &self.columns.diffuse_coefficient,
            index,
            DEFAULT_DIFFUSE_COEFFICIENT,
        )
    }

    pub(crate) fn specular_coefficient_at(&self, index: usize) -> f32 {
        self.native_or(
            Attribute::SpecularCoefficient,
            &self.columns.specular_coefficient,
            index,
            DEFAULT_SPECULAR_COEFFICIENT,
        )
    }

    pub(crate) fn shininess_at(&self, index: usize) -> f32 {
        self.native_or(Attribute::Shininess, &self.columns.shininess, index, DEFAULT_SHININESS)
    }

    pub(crate) fn texture_coordinate_at(&self, index: usize) -> Vec2 {
        self.native_or(
            Attribute::TextureCoordinate,
            &self.columns.texture_coordinate,
            index,
            DEFAULT_TEXTURE_COORDINATE,
        )
    }

    pub(crate) fn flags_at(&self, index: usize) -> SurfelFlags {
        self.native_or(Attribute::Flags, &self.columns.flags, index, SurfelFlags::empty())
    }

    pub(crate) fn associated_at(&self, index: usize) -> AssociatedSurfels {
        self.native_or(
            Attribute::AssociatedSurfels,
            &self.columns.associated,
            index,
            AssociatedSurfels::default(),
        )
    }

    pub(crate) fn detail_at(&self, index: usize) -> Detail {
        self.native_or(Attribute::Detail, &self.columns.detail, index, Detail::default())
    }

    pub(crate) fn record_at(&self, index: usize) -> SurfelRecord {
        SurfelRecord {
            position: self.position_at(index),
            normal: self.normal_at(index),
            tangent_axes: self.tangent_axes_at(index),
            radius: self.radius_at(index),
            diffuse_color: self.diffuse_color_at(index),
            specular_color: self.specular_color_at(index),
            ambient_coefficient: self.ambient_coefficient_at(index),
            diffuse_coefficient: self.diffuse_coefficient_at(index),
            specular_coefficient: self.specular_coefficient_at(index),
            shininess: self.shininess_at(index),
            texture_coordinate: self.texture_coordinate_at(index),
            flags: self.flags_at(index),
            associated: self.associated_at(index),
            detail: self.detail_at(index),
        }
    }

    /// Make `attribute` stored, upgrading the schema if needed
    fn ensure_stored(&mut self, attribute: Attribute) {
        if self.table.route(attribute) != Route::Native {
            debug!("SurfelStore: write to unstored {:?}, upgrading schema", attribute);
            let schema = self.schema() | attribute.bit();
            self.set_schema(schema, Notify::Emit);
        }
    }

    pub(crate) fn set_position_at(&mut self, index: usize, value: Vec3) {
        self.ensure_stored(Attribute::Position);
        stored_mut(&mut self.columns.position)[index] = value;
    }

    // Normal, radius and tangent axes describe one disk. When more than one
    // of them is stored, every setter refreshes the others.

    pub(crate) fn set_normal_at(&mut self, index: usize, value: Vec3) {
        self.ensure_stored(Attribute::Normal);
        stored_mut(&mut self.columns.normal)[index] = value;
        if let Some(axes) = &mut self.columns.tangent_axes {
            axes[index] = reorient_axes(axes[index], value);
        }
    }

    pub(crate) fn set_tangent_axes_at(&mut self, index: usize, value: [Vec3; 2]) {
        self.ensure_stored(Attribute::TangentAxes);
        stored_mut(&mut self.columns.tangent_axes)[index] = value;
        if let Some(normals) = &mut self.columns.normal {
            normals[index] = normal_from_tangent_axes(value);
        }
        if let Some(radii) = &mut self.columns.radius {
            radii[index] = radius_from_tangent_axes(value);
        }
    }

    pub(crate) fn set_radius_at(&mut self, index: usize, value: f32) {
        self.ensure_stored(Attribute::Radius);
        stored_mut(&mut self.columns.radius)[index] = value;
        if self.columns.tangent_axes.is_some() {
            let normal = self.normal_at(index);
            let axes = &mut stored_mut(&mut self.columns.tangent_axes)[index];
            let current = radius_from_tangent_axes(*axes);
            *axes = if current > f32::EPSILON {
                [axes[0] * (value / current), axes[1] * (value / current)]
            } else {
                tangent_axes_from_normal(normal, value)
            };
        }
    }

    pub(crate) fn set_diffuse_color_at(&mut self, index: usize, value: Color) {
        self.ensure_stored(Attribute::DiffuseColor);
        stored_mut(&mut self.columns.diffuse_color)[index] = value;
    }

    pub(crate) fn set_specular_color_at(&mut self, index: usize, value: Color) {
        self.ensure_stored(Attribute::SpecularColor);
        stored_mut(&mut self.columns.specular_color)[index] = value;
    }

    pub(crate) fn set_ambient_coefficient_at(&mut self, index: usize, value: f32) {
        self.ensure_stored(Attribute::AmbientCoefficient);
        stored_mut(&mut self.columns.ambient_coefficient)[index] = value;
    }

    pub(crate) fn set_diffuse_coefficient_at(&mut self, index: usize, value: f32) {
        self.ensure_stored(Attribute::DiffuseCoefficient);
        stored_mut(&mut self.columns.diffuse_coefficient)[index] = value;
    }

    pub(crate) fn set_specular_coefficient_at(&mut self, index: usize, value: f32) {
        self.ensure_stored(Attribute::SpecularCoefficient);
        stored_mut(&mut self.columns.specular_coefficient)[index] = value;
    }

    pub(crate) fn set_shininess_at(&mut self, index: usize, value: f32) {
        self.ensure_stored(Attribute::Shininess);
        stored_mut(&mut self.columns.shininess)[index] = value;
    }

    pub(crate) fn set_texture_coordinate_at(&mut self, index: usize, value: Vec2) {
        self.ensure_stored(Attribute::TextureCoordinate);
        stored_mut(&mut self.columns.texture_coordinate)[index] = value;
    }

    pub(crate) fn set_flags_at(&mut self, index: usize, value: SurfelFlags) {
        self.ensure_stored(Attribute::Flags);
        stored_mut(&mut self.columns.flags)[index] = value;
    }

    pub(crate) fn set_associated_at(&mut self, index: usize, value: AssociatedSurfels) {
        self.ensure_stored(Attribute::AssociatedSurfels);
        stored_mut(&mut self.columns.associated)[index] = value;
    }

    pub(crate) fn set_detail_at(&mut self, index: usize, value: Detail) {
        self.ensure_stored(Attribute::Detail);
        stored_mut(&mut self.columns.detail)[index] = value;
    }

    /// Overwrite the stored attributes in `attributes` without upgrading the schema
    pub(crate) fn write_record_at(&mut self, index: usize, record: &SurfelRecord, attributes: AttributeSet) {
        let columns = &mut self.columns;
        for attribute in (attributes & self.table.stored()).attributes() {
            match attribute {
                Attribute::Position => stored_mut(&mut columns.position)[index] = record.position,
                Attribute::Normal => stored_mut(&mut columns.normal)[index] = record.normal,
                Attribute::TangentAxes => {
                    stored_mut(&mut columns.tangent_axes)[index] = record.tangent_axes
                }
                Attribute::Radius => stored_mut(&mut columns.radius)[index] = record.radius,
                Attribute::DiffuseColor => {
                    stored_mut(&mut columns.diffuse_color)[index] = record.diffuse_color
                }
                Attribute::SpecularColor => {
                    stored_mut(&mut columns.specular_color)[index] = record.specular_color
                }
                Attribute::AmbientCoefficient => {
                    stored_mut(&mut columns.ambient_coefficient)[index] = record.ambient_coefficient
                }
                Attribute::DiffuseCoefficient => {
                    stored_mut(&mut columns.diffuse_coefficient)[index] = record.diffuse_coefficient
                }
                Attribute::SpecularCoefficient => {
                    stored_mut(&mut columns.specular_coefficient)[index] =
                        record.specular_coefficient
                }
                Attribute::Shininess => stored_mut(&mut columns.shininess)[index] = record.shininess,
                Attribute::TextureCoordinate => {
                    stored_mut(&mut columns.texture_coordinate)[index] = record.texture_coordinate
                }
                Attribute::Flags => stored_mut(&mut columns.flags)[index] = record.flags,
                Attribute::AssociatedSurfels => {
                    stored_mut(&mut columns.associated)[index] = record.associated
                }
                Attribute::Detail => stored_mut(&mut columns.detail)[index] = record.detail,
            }
        }
    }

    /// Append one element from `record` to every stored column
    pub(crate) fn push_record(&mut self, record: &SurfelRecord) {
        let columns = &mut self.columns;
        if let Some(column) = &mut columns.position {
            column.push(record.position);
        }
        if let Some(column) = &mut columns.normal {
            column.push(record.normal);
        }
        if let Some(column) = &mut columns.tangent_axes {
            column.push(record.tangent_axes);
        }
        if let Some(column) = &mut columns.radius {
            column.push(record.radius);
        }
        if let Some(column) = &mut columns.diffuse_color {
            column.push(record.diffuse_color);
        }
        if let Some(column) = &mut columns.specular_color {
            column.push(record.specular_color);
        }
        if let Some(column) = &mut columns.ambient_coefficient {
            column.push(record.ambient_coefficient);
        }
        if let Some(column) = &mut columns.diffuse_coefficient {
            column.push(record.diffuse_coefficient);
        }
        if let Some(column) = &mut columns.specular_coefficient {
            column.push(record.specular_coefficient);
        }
        if let Some(column) = &mut columns.shininess {
            column.push(record.shininess);
        }
        if let Some(column) = &mut columns.texture_coordinate {
            column.push(record.texture_coordinate);
        }
        if let Some(column) = &mut columns.flags {
            column.push(record.flags);
        }
        if let Some(column) = &mut columns.associated {
            column.push(record.associated);
        }
        if let Some(column) = &mut columns.detail {
            column.push(record.detail);
        }
    }
}
