//! Surfel storage with a runtime-selectable attribute schema
//!
//! This crate provides the point-surface data model used by the painting engine:
//! - [`attribute`] - The 14 surfel attributes and the [`AttributeSet`] bitmask
//! - [`schema`] - Per-attribute read routes (stored, derived, default)
//! - [`store`] - [`SurfelStore`], a structure-of-arrays collection
//! - [`handle`] - Generation-checked ids and borrowed surfel views
//! - [`events`] - Schema and collection change notifications
//! - [`values`] - Packed value types (colors, flags, associations) and defaults
//! - [`frame`] - Orthonormal tangent frames

pub mod attribute;
pub mod error;
pub mod events;
pub mod frame;
pub mod handle;
pub mod record;
pub mod schema;
pub mod store;
pub mod values;

pub use attribute::*;
pub use error::*;
pub use events::*;
pub use frame::*;
pub use handle::*;
pub use record::*;
pub use schema::*;
pub use store::*;
pub use values::*;
