//! Packed per-surfel value types and their defaults

use bitflags::bitflags;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::handle::SurfelId;

/// Position reported when POSITION is not stored
pub const DEFAULT_POSITION: Vec3 = Vec3::ZERO;

/// Normal reported when it is neither stored nor derivable
pub const DEFAULT_NORMAL: Vec3 = Vec3::Z;

/// Radius reported when it is neither stored nor derivable
pub const DEFAULT_RADIUS: f32 = 1.0;

/// Light gray
pub const DEFAULT_DIFFUSE_COLOR: Color = Color::rgb(192, 192, 192);

pub const DEFAULT_SPECULAR_COLOR: Color = Color::rgb(255, 255, 255);

pub const DEFAULT_AMBIENT_COEFFICIENT: f32 = 0.5;
pub const DEFAULT_DIFFUSE_COEFFICIENT: f32 = 0.75;
pub const DEFAULT_SPECULAR_COEFFICIENT: f32 = 0.25;
pub const DEFAULT_SHININESS: f32 = 0.5;
pub const DEFAULT_TEXTURE_COORDINATE: Vec2 = Vec2::ZERO;

/// Maximum number of associated surfels per surfel
pub const ASSOCIATION_CAPACITY: usize = 4;

/// 8-bit per channel RGBA color
///
/// Layout matches the packed persistence format: r, g, b, a in ascending bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable,
)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        DEFAULT_DIFFUSE_COLOR
    }
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// RGB channels scaled to 0..1
    pub fn to_rgb_f32(self) -> Vec3 {
        Vec3::new(self.r as f32, self.g as f32, self.b as f32) / 255.0
    }

    /// Quantize 0..1 RGB channels, keeping the given alpha
    pub fn from_rgb_f32(rgb: Vec3, a: u8) -> Self {
        Self {
            r: quantize_channel(rgb.x),
            g: quantize_channel(rgb.y),
            b: quantize_channel(rgb.z),
            a,
        }
    }

    /// Packed 32-bit word (little-endian r, g, b, a)
    pub fn to_packed(self) -> u32 {
        u32::from_le_bytes(bytemuck::cast(self))
    }

    pub fn from_packed(packed: u32) -> Self {
        bytemuck::cast(packed.to_le_bytes())
    }
}

#[inline]
fn quantize_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

bitflags! {
    /// Per-surfel state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SurfelFlags: u32 {
        const SELECTED_1 = 1 << 0;
        const SELECTED_2 = 1 << 1;
        const SELECTED_3 = 1 << 2;
        const EMPHASISE = 1 << 3;
        const CLIP_ONE = 1 << 4;
        const CLIP_TWO = 1 << 5;
        const CLIP_ORIENTATION = 1 << 6;
        const INVISIBLE = 1 << 7;
        const FEATURE = 1 << 8;
    }
}

/// One of the three independent selection bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionChannel {
    One,
    Two,
    Three,
}

impl SelectionChannel {
    pub const ALL: [SelectionChannel; 3] = [
        SelectionChannel::One,
        SelectionChannel::Two,
        SelectionChannel::Three,
    ];

    /// Flag bit carrying this selection
    pub fn flag(self) -> SurfelFlags {
        match self {
            SelectionChannel::One => SurfelFlags::SELECTED_1,
            SelectionChannel::Two => SurfelFlags::SELECTED_2,
            SelectionChannel::Three => SurfelFlags::SELECTED_3,
        }
    }
}

/// Multiresolution residual: a detail vector and its coefficient
#[derive(
    Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable,
)]
#[repr(C)]
pub struct Detail {
    pub vector: Vec3,
    pub coefficient: f32,
}

/// Fixed-capacity list of back-references to surfels in the same store
///
/// The live count is tracked explicitly; unused slots hold `SurfelId::INVALID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociatedSurfels {
    ids: [SurfelId; ASSOCIATION_CAPACITY],
    len: u8,
}

impl Default for AssociatedSurfels {
    fn default() -> Self {
        Self {
            ids: [SurfelId::INVALID; ASSOCIATION_CAPACITY],
            len: 0,
        }
    }
}

impl AssociatedSurfels {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == ASSOCIATION_CAPACITY
    }

    pub fn contains(&self, id: SurfelId) -> bool {
        self.as_slice().contains(&id)
    }

    pub fn as_slice(&self) -> &[SurfelId] {
        &self.ids[..self.len()]
    }

    pub fn iter(&self) -> impl Iterator<Item = SurfelId> + '_ {
        self.as_slice().iter().copied()
    }

    /// Append a reference; duplicates are ignored
    pub fn push(&mut self, id: SurfelId) -> Result<(), StoreError> {
        if self.contains(id) {
            return Ok(());
        }
        if self.is_full() {
            return Err(StoreError::AssociationsFull {
                capacity: ASSOCIATION_CAPACITY,
            });
        }
        self.ids[self.len()] = id;
        self.len += 1;
        Ok(())
    }

    /// Remove a reference, keeping the remaining order. Returns true if found.
    pub fn remove(&mut self, id: SurfelId) -> bool {
        let Some(position) = self.as_slice().iter().position(|&other| other == id) else {
            return false;
        };
        let len = self.len();
        self.ids.copy_within(position + 1..len, position);
        self.ids[len - 1] = SurfelId::INVALID;
        self.len -= 1;
        true
    }

    /// Point a reference to `from` at `to` instead. Returns true if found.
    pub fn replace(&mut self, from: SurfelId, to: SurfelId) -> bool {
        let len = self.len();
        match self.ids[..len].iter().position(|&id| id == from) {
            Some(position) => {
                self.ids[position] = to;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Keep only the references for which `keep` returns a replacement id
    pub fn retain_map(&mut self, mut keep: impl FnMut(SurfelId) -> Option<SurfelId>) {
        let mut kept = Self::default();
        for id in self.iter() {
            if let Some(mapped) = keep(id) {
                // capacity cannot be exceeded: kept.len() <= self.len()
                let _ = kept.push(mapped);
            }
        }
        *self = kept;
    }
}
