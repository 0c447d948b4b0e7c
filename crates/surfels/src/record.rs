//! Owned snapshot of every attribute of one surfel

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::frame::LocalFrame;
use crate::values::{
    AssociatedSurfels, Color, Detail, SurfelFlags, DEFAULT_AMBIENT_COEFFICIENT,
    DEFAULT_DIFFUSE_COEFFICIENT, DEFAULT_DIFFUSE_COLOR, DEFAULT_NORMAL, DEFAULT_POSITION,
    DEFAULT_RADIUS, DEFAULT_SHININESS, DEFAULT_SPECULAR_COEFFICIENT, DEFAULT_SPECULAR_COLOR,
    DEFAULT_TEXTURE_COORDINATE,
};

/// Values of all attributes of a surfel, read through the dispatch table
///
/// Used to move surfels between stores with different schemas and as the
/// unit a persistence layer serializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfelRecord {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent_axes: [Vec3; 2],
    pub radius: f32,
    pub diffuse_color: Color,
    pub specular_color: Color,
    pub ambient_coefficient: f32,
    pub diffuse_coefficient: f32,
    pub specular_coefficient: f32,
    pub shininess: f32,
    pub texture_coordinate: Vec2,
    pub flags: SurfelFlags,
    pub associated: AssociatedSurfels,
    pub detail: Detail,
}

impl Default for SurfelRecord {
    fn default() -> Self {
        let frame = LocalFrame::from_normal(DEFAULT_NORMAL);
        Self {
            position: DEFAULT_POSITION,
            normal: DEFAULT_NORMAL,
            tangent_axes: [frame.x * DEFAULT_RADIUS, frame.y * DEFAULT_RADIUS],
            radius: DEFAULT_RADIUS,
            diffuse_color: DEFAULT_DIFFUSE_COLOR,
            specular_color: DEFAULT_SPECULAR_COLOR,
            ambient_coefficient: DEFAULT_AMBIENT_COEFFICIENT,
            diffuse_coefficient: DEFAULT_DIFFUSE_COEFFICIENT,
            specular_coefficient: DEFAULT_SPECULAR_COEFFICIENT,
            shininess: DEFAULT_SHININESS,
            texture_coordinate: DEFAULT_TEXTURE_COORDINATE,
            flags: SurfelFlags::empty(),
            associated: AssociatedSurfels::default(),
            detail: Detail::default(),
        }
    }
}
