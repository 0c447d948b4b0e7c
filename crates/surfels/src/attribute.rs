//! Surfel attribute enumeration and the schema bitmask
//!
//! Bit positions follow the fixed enumeration order of the attributes; any
//! persistence layer must keep them stable when round-tripping a schema value.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Set of physically stored surfel attributes
    ///
    /// Only 14 of the 32 available bits are assigned.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AttributeSet: u32 {
        const POSITION = 1 << 0;
        const NORMAL = 1 << 1;
        const TANGENT_AXES = 1 << 2;
        const RADIUS = 1 << 3;
        const DIFFUSE_COLOR = 1 << 4;
        const SPECULAR_COLOR = 1 << 5;
        const AMBIENT_COEFFICIENT = 1 << 6;
        const DIFFUSE_COEFFICIENT = 1 << 7;
        const SPECULAR_COEFFICIENT = 1 << 8;
        const SHININESS = 1 << 9;
        const TEXTURE_COORDINATE = 1 << 10;
        const FLAGS = 1 << 11;
        const ASSOCIATED_SURFELS = 1 << 12;
        const DETAIL = 1 << 13;
    }
}

impl AttributeSet {
    /// Attributes that can be derived from one another
    pub const GEOMETRY: Self = Self::NORMAL
        .union(Self::TANGENT_AXES)
        .union(Self::RADIUS);

    /// Iterate the contained attributes in enumeration order
    pub fn attributes(self) -> impl Iterator<Item = Attribute> {
        Attribute::ALL
            .into_iter()
            .filter(move |attribute| self.contains(attribute.bit()))
    }
}

/// A single surfel attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Attribute {
    Position = 0,
    Normal = 1,
    TangentAxes = 2,
    Radius = 3,
    DiffuseColor = 4,
    SpecularColor = 5,
    AmbientCoefficient = 6,
    DiffuseCoefficient = 7,
    SpecularCoefficient = 8,
    Shininess = 9,
    TextureCoordinate = 10,
    Flags = 11,
    AssociatedSurfels = 12,
    Detail = 13,
}

impl Attribute {
    pub const COUNT: usize = 14;

    pub const ALL: [Attribute; Self::COUNT] = [
        Attribute::Position,
        Attribute::Normal,
        Attribute::TangentAxes,
        Attribute::Radius,
        Attribute::DiffuseColor,
        Attribute::SpecularColor,
        Attribute::AmbientCoefficient,
        Attribute::DiffuseCoefficient,
        Attribute::SpecularCoefficient,
        Attribute::Shininess,
        Attribute::TextureCoordinate,
        Attribute::Flags,
        Attribute::AssociatedSurfels,
        Attribute::Detail,
    ];

    /// Schema bit of this attribute
    #[inline]
    pub fn bit(self) -> AttributeSet {
        AttributeSet::from_bits_retain(1 << self as u32)
    }

    /// Position of this attribute in the enumeration order
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}
