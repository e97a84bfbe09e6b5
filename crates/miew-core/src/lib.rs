//! Core data types for miew-rs.
//!
//! This crate holds the data shared by the surface and geometry crates:
//! - [`Volume`] dense voxel fields with gradient computation
//! - [`PackedAtoms`] atom spheres with colors and [`AtomId`] back-references
//! - [`SurfaceMesh`] flat position/normal/color/index buffers
//! - [`Settings`] JSON-backed configuration
//! - [`MiewError`] and the crate-wide [`Result`]

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Voxel and instance counts are converted to f32 for geometry
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod atoms;
pub mod bounds;
pub mod error;
pub mod mesh;
pub mod options;
pub mod selection;
pub mod volume;

pub use atoms::{AtomId, PackedAtoms};
pub use bounds::{Aabb, BoundingSphere};
pub use error::{MiewError, Result};
pub use mesh::SurfaceMesh;
pub use options::{
    ContactSurfParams, ContactSurfSettings, FusionSettings, InstancingSettings, PerResolution,
    QuickSurfParams, QuickSurfSettings, Resolution, Settings,
};
pub use selection::VisibilitySelector;
pub use volume::Volume;

// Re-export glam types for convenience
pub use glam::{Mat3, Mat4, Vec3, Vec4};
