//! Instanced geometry for miew-rs.
//!
//! Atoms and bonds are drawn as instances of one template mesh each:
//! - [`InstancedSpheres`] with a center and radius per atom
//! - [`InstancedCylinders`] with a placement matrix and two colors per bond
//!
//! Per-instance data lives in flat `f32` buffers named after the shader
//! attributes they feed. Picking runs on the CPU against [`collision`]
//! geometry kept in step with every placement.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Segment and instance counts are converted to f32 and u32 for geometry
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::float_cmp)]

pub mod base_mesh;
pub mod collision;
pub mod instanced_cylinders;
pub mod instanced_spheres;
pub mod placement;
pub mod ray;

pub use base_mesh::BaseMesh;
pub use collision::{ChunkedMesh, Collision, SphereCollision, TwoColorCylinderCollision};
pub use instanced_cylinders::{InstancedCylinders, HIDDEN_HALF};
pub use instanced_spheres::InstancedSpheres;
pub use placement::{cylinder_matrix, inverse_or_zero, look_at, matrix_rows, normal_matrix};
pub use ray::{sort_by_distance, Intersection, Ray};
