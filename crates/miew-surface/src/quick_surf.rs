//! Gaussian density surfaces.
//!
//! Each atom adds `exp(-r^2 / (2 s^2))` to every voxel within `gauss_lim * s`
//! of its centre, where `s` is the scaled radius. Colors accumulate the same
//! kernel scaled by `1 / iso_value`, so the color field is close to the atom
//! color where the density crosses the isovalue.

use std::ops::RangeInclusive;

use miew_core::{MiewError, PackedAtoms, QuickSurfParams, Result};

use crate::builder::{SurfaceAlgorithm, SurfaceFields};
use crate::grid::GridLayout;

/// The Gaussian density surface algorithm.
#[derive(Debug, Clone)]
pub struct QuickSurf {
    params: QuickSurfParams,
    atomic_factors: Option<Vec<f32>>,
}

impl QuickSurf {
    pub fn new(params: QuickSurfParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            atomic_factors: None,
        })
    }

    /// Scales each atom's kernel, one factor per atom.
    #[must_use]
    pub fn with_atomic_factors(mut self, factors: Vec<f32>) -> Self {
        self.atomic_factors = Some(factors);
        self
    }

    #[must_use]
    pub fn params(&self) -> &QuickSurfParams {
        &self.params
    }
}

impl SurfaceAlgorithm for QuickSurf {
    fn name(&self) -> &'static str {
        "quick surface"
    }

    fn grid_spacing(&self) -> f32 {
        self.params.grid_spacing
    }

    fn rad_scale(&self) -> f32 {
        self.params.rad_scale
    }

    fn iso_value(&self) -> f32 {
        self.params.iso_value
    }

    fn compute_surface(
        &self,
        atoms: &PackedAtoms,
        layout: &GridLayout,
        track_atoms: bool,
    ) -> Result<SurfaceFields> {
        let mut fields = SurfaceFields::new(layout, track_atoms)?;
        gauss_density(
            &mut fields,
            atoms,
            layout,
            &self.params,
            self.atomic_factors.as_deref(),
        )?;
        Ok(fields)
    }
}

/// Voxels whose coordinate lies within `lim` of `center`, all in voxel units.
fn voxel_range(center: f32, lim: f32, max_voxel: usize) -> Option<RangeInclusive<usize>> {
    let lo = ((center - lim).floor() as i64).max(0);
    let hi = ((center + lim).ceil() as i64).min(max_voxel as i64);
    (lo <= hi).then(|| lo as usize..=hi as usize)
}

/// Splats every atom into `fields`.
///
/// Uses `layout.grid_spacing`, which may be coarser than the requested one.
/// The dominant atom of a voxel only changes on a strictly larger density, so
/// the first of several equal contributors keeps it.
pub fn gauss_density(
    fields: &mut SurfaceFields,
    atoms: &PackedAtoms,
    layout: &GridLayout,
    params: &QuickSurfParams,
    atomic_factors: Option<&[f32]>,
) -> Result<()> {
    if let Some(factors) = atomic_factors {
        if factors.len() != atoms.len() {
            return Err(MiewError::SizeMismatch {
                expected: atoms.len(),
                actual: factors.len(),
            });
        }
    }

    let gs = layout.grid_spacing;
    let inv_gs = 1.0 / gs;
    let inv_iso = 1.0 / params.iso_value;
    let [max_x, max_y, max_z] = layout.dims.map(|d| d - 1);

    let stride_x = fields.density.stride_x();
    let tex_stride_x = fields.colors.stride_x();

    for i in 0..atoms.len() {
        let p = atoms.position(i) - layout.origin;
        let scaled_rad = atoms.radius(i) * params.rad_scale;
        let factor = atomic_factors.map_or(1.0, |f| f[i]);
        let rad_inv = 1.0 / (2.0 * scaled_rad * scaled_rad);
        let rad_lim = params.gauss_lim * scaled_rad;
        let rad_lim2 = rad_lim * rad_lim;
        let voxel_lim = rad_lim * inv_gs;
        let color = atoms.color(i);
        let atom = atoms.atoms[i];

        let center = p * inv_gs;
        let (Some(xr), Some(yr), Some(zr)) = (
            voxel_range(center.x, voxel_lim, max_x),
            voxel_range(center.y, voxel_lim, max_y),
            voxel_range(center.z, voxel_lim, max_z),
        ) else {
            continue;
        };

        for z in zr {
            let dz = z as f32 * gs - p.z;
            for y in yr.clone() {
                let dy = y as f32 * gs - p.y;
                let dy2dz2 = dy * dy + dz * dz;
                if dy2dz2 >= rad_lim2 {
                    continue;
                }

                let mut addr = fields.density.direct_idx(*xr.start(), y, z);
                let mut tex_addr = fields.colors.direct_idx(*xr.start(), y, z);
                for x in xr.clone() {
                    let dx = x as f32 * gs - p.x;
                    let r2 = dx * dx + dy2dz2;
                    let density = (-r2 * rad_inv).exp() * factor;

                    if let (Some(weights), Some(map)) =
                        (fields.atom_weights.as_mut(), fields.atom_map.as_mut())
                    {
                        let w = &mut weights.data_mut()[addr];
                        if density > *w {
                            *w = density;
                            map[addr] = Some(atom);
                        }
                    }

                    fields.density.data_mut()[addr] += density;
                    let tint = color * (density * inv_iso);
                    let tex = &mut fields.colors.data_mut()[tex_addr..tex_addr + 3];
                    for (dst, c) in tex.iter_mut().zip(tint.to_array()) {
                        *dst += c;
                    }

                    addr += stride_x;
                    tex_addr += tex_stride_x;
                }
            }
        }
    }
    Ok(())
}
