//! miew-rs: molecular surfaces and instanced geometry for the Miew viewer.
//!
//! This crate ties the workspace together. It re-exports the data types of
//! `miew-core`, the surface pipeline of `miew-surface` and the instanced
//! batches of `miew-geometry`, and adds one-call builders driven by
//! [`Settings`].
//!
//! # Quick Start
//!
//! ```
//! use miew::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let mut atoms = PackedAtoms::new();
//!     atoms.push(Vec3::ZERO, 1.5, Vec3::new(1.0, 0.0, 0.0), AtomId(0));
//!     atoms.push(Vec3::new(2.0, 0.0, 0.0), 1.5, Vec3::new(0.0, 0.0, 1.0), AtomId(1));
//!
//!     let surface = build_quick_surface(&atoms, &Settings::default(), None)?;
//!     assert!(surface.num_triangles() > 0);
//!     Ok(())
//! }
//! ```

pub use miew_core::{
    Aabb, AtomId, BoundingSphere, ContactSurfParams, ContactSurfSettings, FusionSettings,
    InstancingSettings, Mat3, Mat4, MiewError, PackedAtoms, PerResolution, QuickSurfParams,
    QuickSurfSettings, Resolution, Result, Settings, SurfaceMesh, Vec3, Vec4, VisibilitySelector,
    Volume,
};
pub use miew_geometry::{
    cylinder_matrix, sort_by_distance, BaseMesh, Collision, InstancedCylinders,
    InstancedSpheres, Intersection, Ray, HIDDEN_HALF,
};
pub use miew_surface::{
    ContactSurf, GridLayout, IsoSurface, QuickSurf, SurfaceAlgorithm, SurfaceFields,
    VolumeSurfaceBuilder,
};

/// Starts logging through `env_logger`, filtered by `RUST_LOG`.
///
/// Safe to call more than once.
pub fn init_logging() {
    if env_logger::try_init().is_ok() {
        log::debug!("miew-rs logging initialized");
    }
}

/// Builds the Gaussian density surface of `atoms` at the configured resolution.
///
/// With a selector, only the parts owned by selected atoms are kept.
///
/// # Errors
///
/// Fails on inconsistent atom buffers or invalid surface parameters.
pub fn build_quick_surface(
    atoms: &PackedAtoms,
    settings: &Settings,
    selector: Option<&dyn VisibilitySelector>,
) -> Result<SurfaceMesh> {
    let algorithm = QuickSurf::new(settings.quick_surf_params())?;
    VolumeSurfaceBuilder::new(algorithm)
        .fusion(settings.fusion.offset, settings.fusion.len)
        .build(atoms, selector)
}

/// Builds the contact surface of `atoms` at the configured resolution.
///
/// # Errors
///
/// Fails on inconsistent atom buffers, zero radii or invalid probe settings.
pub fn build_contact_surface(
    atoms: &PackedAtoms,
    settings: &Settings,
    selector: Option<&dyn VisibilitySelector>,
) -> Result<SurfaceMesh> {
    let algorithm = ContactSurf::new(settings.contact_surf_params())?;
    VolumeSurfaceBuilder::new(algorithm)
        .fusion(settings.fusion.offset, settings.fusion.len)
        .build(atoms, selector)
}

/// Allocates `count` bond cylinders with the configured segment count.
#[must_use]
pub fn new_cylinders(count: usize, settings: &Settings, open_ended: bool) -> InstancedCylinders {
    let segments = settings.instancing.cylinder_segments.get(settings.resolution);
    InstancedCylinders::new(count, segments, settings.instancing.z_sprites, open_ended)
}

/// Allocates `count` atom spheres with the configured segment count.
#[must_use]
pub fn new_spheres(count: usize, settings: &Settings) -> InstancedSpheres {
    let segments = settings.instancing.sphere_segments.get(settings.resolution);
    InstancedSpheres::new(count, segments, settings.instancing.z_sprites)
}
