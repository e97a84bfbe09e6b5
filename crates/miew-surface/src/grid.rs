//! Fitting a voxel grid around a set of atoms.

use std::f32::consts::PI;

use glam::Vec3;
use miew_core::{Aabb, MiewError, PackedAtoms, Result};

/// Radius above which the grid spacing scales with the smallest atom.
const LARGE_RADIUS: f32 = 4.0;

/// Placement and resolution of the density grid for one surface build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    /// World position of voxel `(0, 0, 0)`; equal to the padded minimum.
    pub origin: Vec3,
    /// Voxel counts along each axis.
    pub dims: [usize; 3],
    /// Distance between neighbouring voxels.
    pub grid_spacing: f32,
    /// Padded minimum of the atom centres.
    pub min: Vec3,
    /// Padded maximum of the atom centres.
    pub max: Vec3,
}

impl GridLayout {
    /// Fits a grid around `atoms` with room for their scaled radii.
    ///
    /// When every radius exceeds 4 the spacing is multiplied by the smallest
    /// one. The padding is `1.7 * rad_scale * max_radius`, widened to
    /// `0.65 * sqrt(4/3 * pi * pad^3)` when that is larger.
    pub fn fit(atoms: &PackedAtoms, grid_spacing: f32, rad_scale: f32) -> Result<Self> {
        if atoms.is_empty() {
            return Err(MiewError::InvalidParameter("cannot fit a grid around no atoms".into()));
        }
        if !(grid_spacing.is_finite() && grid_spacing > 0.0) {
            return Err(MiewError::InvalidParameter(format!(
                "grid spacing must be positive, got {grid_spacing}"
            )));
        }

        if !rad_scale.is_finite() {
            return Err(MiewError::InvalidParameter(format!(
                "radius scale must be finite, got {rad_scale}"
            )));
        }

        let (lo, hi) = atoms.min_max();
        if lo.iter().chain(&hi).any(|v| !v.is_finite()) {
            return Err(MiewError::InvalidParameter(
                "atom positions and radii must be finite".into(),
            ));
        }
        let mut spacing = grid_spacing;
        if lo[3] > LARGE_RADIUS {
            spacing *= lo[3];
        }

        let pad = rad_scale * hi[3] * 1.7;
        let pad_rad = 0.65 * (4.0 / 3.0 * PI * pad * pad * pad).sqrt();
        let pad = pad.max(pad_rad);

        let min = Vec3::new(lo[0], lo[1], lo[2]) - Vec3::splat(pad);
        let max = Vec3::new(hi[0], hi[1], hi[2]) + Vec3::splat(pad);
        let extent = (max - min) / spacing;
        let dims = extent.to_array().map(|e| (e.ceil() as usize).max(2));

        Ok(Self {
            origin: min,
            dims,
            grid_spacing: spacing,
            min,
            max,
        })
    }

    /// Box spanned by the grid samples; its cell size equals the spacing.
    #[must_use]
    pub fn bbox(&self) -> Aabb {
        let steps = Vec3::new(
            (self.dims[0] - 1) as f32,
            (self.dims[1] - 1) as f32,
            (self.dims[2] - 1) as f32,
        );
        Aabb::from_origin_size(self.origin, steps * self.grid_spacing)
    }

    /// Total number of voxels.
    #[must_use]
    pub fn num_voxels(&self) -> usize {
        self.dims.iter().product()
    }
}
