//! Molecular isosurfaces for miew-rs.
//!
//! Surfaces are built in four stages:
//! - a [`SurfaceAlgorithm`] ([`QuickSurf`] or [`ContactSurf`]) samples atoms
//!   onto a grid fitted by [`GridLayout`]
//! - [`IsoSurface::compute`] extracts triangles with marching cubes
//! - [`IsoSurface::vertex_fusion`] welds duplicated vertices
//! - [`IsoSurface::set_color_vol_tex`] colors vertices and drops hidden atoms
//!
//! [`VolumeSurfaceBuilder`] runs all four.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Grid coordinates move between usize, i64 and f32 constantly
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
// Numeric kernels read best with the usual single-letter names
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::float_cmp)]

mod tables;

pub mod builder;
pub mod colorizer;
pub mod contact_surf;
pub mod fusion;
pub mod grid;
pub mod marching_cubes;
pub mod quick_surf;
pub mod spatial_hash;

pub use builder::{SurfaceAlgorithm, SurfaceFields, VolumeSurfaceBuilder};
pub use colorizer::AtomField;
pub use contact_surf::ContactSurf;
pub use grid::GridLayout;
pub use marching_cubes::{AxisFrame, IsoSurface};
pub use quick_surf::{gauss_density, QuickSurf};
pub use spatial_hash::SpatialHash;
