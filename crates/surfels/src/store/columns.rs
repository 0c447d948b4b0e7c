//! Structure-of-arrays attribute storage

use glam::{Vec2, Vec3};

use crate::attribute::Attribute;
use crate::values::{AssociatedSurfels, Color, Detail, SurfelFlags};

/// One optional column per attribute; `Some` exactly for stored attributes.
#[derive(Debug, Clone, Default)]
pub(crate) struct Columns {
    pub position: Option<Vec<Vec3>>,
    pub normal: Option<Vec<Vec3>>,
    pub tangent_axes: Option<Vec<[Vec3; 2]>>,
    pub radius: Option<Vec<f32>>,
    pub diffuse_color: Option<Vec<Color>>,
    pub specular_color: Option<Vec<Color>>,
    pub ambient_coefficient: Option<Vec<f32>>,
    pub diffuse_coefficient: Option<Vec<f32>>,
    pub specular_coefficient: Option<Vec<f32>>,
    pub shininess: Option<Vec<f32>>,
    pub texture_coordinate: Option<Vec<Vec2>>,
    pub flags: Option<Vec<SurfelFlags>>,
    pub associated: Option<Vec<AssociatedSurfels>>,
    pub detail: Option<Vec<Detail>>,
}

/// Type-erased operations every column supports
pub(crate) trait Column {
    fn swap_remove_at(&mut self, index: usize);
    fn truncate_to(&mut self, len: usize);
    fn reserve_total(&mut self, capacity: usize);
}

impl<T> Column for Vec<T> {
    fn swap_remove_at(&mut self, index: usize) {
        self.swap_remove(index);
    }

    fn truncate_to(&mut self, len: usize) {
        self.truncate(len);
    }

    fn reserve_total(&mut self, capacity: usize) {
        self.reserve_exact(capacity.saturating_sub(self.len()));
    }
}

impl Columns {
    /// Every stored column, type-erased
    pub fn stored_columns_mut(&mut self) -> impl Iterator<Item = &mut dyn Column> {
        let columns: [Option<&mut dyn Column>; Attribute::COUNT] = [
            self.position.as_mut().map(|c| c as &mut dyn Column),
            self.normal.as_mut().map(|c| c as &mut dyn Column),
            self.tangent_axes.as_mut().map(|c| c as &mut dyn Column),
            self.radius.as_mut().map(|c| c as &mut dyn Column),
            self.diffuse_color.as_mut().map(|c| c as &mut dyn Column),
            self.specular_color.as_mut().map(|c| c as &mut dyn Column),
            self.ambient_coefficient.as_mut().map(|c| c as &mut dyn Column),
            self.diffuse_coefficient.as_mut().map(|c| c as &mut dyn Column),
            self.specular_coefficient.as_mut().map(|c| c as &mut dyn Column),
            self.shininess.as_mut().map(|c| c as &mut dyn Column),
            self.texture_coordinate.as_mut().map(|c| c as &mut dyn Column),
            self.flags.as_mut().map(|c| c as &mut dyn Column),
            self.associated.as_mut().map(|c| c as &mut dyn Column),
            self.detail.as_mut().map(|c| c as &mut dyn Column),
        ];
        columns.into_iter().flatten()
    }

    /// Drop the column of `attribute`, freeing its storage
    pub fn free(&mut self, attribute: Attribute) {
        match attribute {
            Attribute::Position => self.position = None,
            Attribute::Normal => self.normal = None,
            Attribute::TangentAxes => self.tangent_axes = None,
            Attribute::Radius => self.radius = None,
            Attribute::DiffuseColor => self.diffuse_color = None,
            Attribute::SpecularColor => self.specular_color = None,
            Attribute::AmbientCoefficient => self.ambient_coefficient = None,
            Attribute::DiffuseCoefficient => self.diffuse_coefficient = None,
            Attribute::SpecularCoefficient => self.specular_coefficient = None,
            Attribute::Shininess => self.shininess = None,
            Attribute::TextureCoordinate => self.texture_coordinate = None,
            Attribute::Flags => self.flags = None,
            Attribute::AssociatedSurfels => self.associated = None,
            Attribute::Detail => self.detail = None,
        }
    }

    /// Move every column present in `other` into `self`
    pub fn adopt(&mut self, other: Columns) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            position,
            normal,
            tangent_axes,
            radius,
            diffuse_color,
            specular_color,
            ambient_coefficient,
            diffuse_coefficient,
            specular_coefficient,
            shininess,
            texture_coordinate,
            flags,
            associated,
            detail
        );
    }
}

/// Slice of a stored column, empty when the column is absent
#[inline]
pub(crate) fn stored<T>(column: &Option<Vec<T>>) -> &[T] {
    column.as_deref().unwrap_or(&[])
}

/// Mutable slice of a stored column, empty when the column is absent
#[inline]
pub(crate) fn stored_mut<T>(column: &mut Option<Vec<T>>) -> &mut [T] {
    column.as_deref_mut().unwrap_or(&mut [])
}
