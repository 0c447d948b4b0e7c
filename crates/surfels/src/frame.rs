//! Local tangent frames
//!
//! The schema derives tangent axes from a normal through an arbitrary but
//! deterministic orthonormal frame; painting and resampling use the same frame
//! to express elliptical footprints in two dimensions.

use glam::{Mat2, Vec2, Vec3};

/// Orthonormal tangent-plane basis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    pub x: Vec3,
    pub y: Vec3,
}

impl LocalFrame {
    /// Build a right-handed frame whose `x × y` equals the normalized `normal`
    pub fn from_normal(normal: Vec3) -> Self {
        let n = normal.try_normalize().unwrap_or(Vec3::Z);
        let x = arbitrary_perpendicular(n);
        let y = n.cross(x).normalize();
        Self { x, y }
    }

    pub fn normal(&self) -> Vec3 {
        self.x.cross(self.y)
    }

    /// Coordinates of `v` in the frame's plane
    #[inline]
    pub fn project(&self, v: Vec3) -> Vec2 {
        Vec2::new(v.dot(self.x), v.dot(self.y))
    }

    /// 2x2 kernel whose columns are the two tangent axes expressed in this frame
    pub fn kernel(&self, axes: [Vec3; 2]) -> Mat2 {
        Mat2::from_cols(self.project(axes[0]), self.project(axes[1]))
    }
}

/// Find a unit vector perpendicular to `normal`.
///
/// Crosses with the axis least aligned with the normal for numerical stability.
fn arbitrary_perpendicular(normal: Vec3) -> Vec3 {
    let axis = if normal.x.abs() < normal.y.abs() {
        if normal.x.abs() < normal.z.abs() {
            Vec3::X
        } else {
            Vec3::Z
        }
    } else if normal.y.abs() < normal.z.abs() {
        Vec3::Y
    } else {
        Vec3::Z
    };

    normal.cross(axis).normalize()
}
