//! Uniform-grid spatial hash over atom spheres.
//!
//! Cells are at least twice the largest radius wide, so every sphere that can
//! touch a query point lies in the query's cell or one of its 26 neighbours.

use glam::Vec3;
use miew_core::{MiewError, Result};

/// Atoms bucketed by grid cell.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    min: Vec3,
    cell_size: f32,
    dims: [usize; 3],
    cell_offsets: Vec<usize>,
    cell_lengths: Vec<usize>,
    data: Vec<usize>,
}

impl SpatialHash {
    /// Buckets `(x, y, z, radius)` quadruples lying within `[min, max]`.
    pub fn new(pos_rad: &[f32], min: Vec3, max: Vec3, cell_size: f32) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(MiewError::InvalidParameter(format!(
                "hash cell size must be positive, got {cell_size}"
            )));
        }
        let extent = ((max - min) / cell_size).floor();
        let dims = extent.to_array().map(|e| e.max(0.0) as usize + 1);

        let mut hash = Self {
            min,
            cell_size,
            dims,
            cell_offsets: Vec::new(),
            cell_lengths: Vec::new(),
            data: Vec::with_capacity(pos_rad.len() / 4),
        };

        let n_cells = dims.iter().product();
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); n_cells];
        for (i, quad) in pos_rad.chunks_exact(4).enumerate() {
            let cell = hash.cell_coords(Vec3::from_slice(quad));
            buckets[hash.cell_id(cell.map(|c| c.clamp(0, i64::MAX) as usize))].push(i);
        }

        hash.cell_offsets = Vec::with_capacity(n_cells);
        hash.cell_lengths = Vec::with_capacity(n_cells);
        for bucket in buckets {
            hash.cell_offsets.push(hash.data.len());
            hash.cell_lengths.push(bucket.len());
            hash.data.extend(bucket);
        }
        Ok(hash)
    }

    fn cell_coords(&self, p: Vec3) -> [i64; 3] {
        let c = ((p - self.min) / self.cell_size).floor();
        let clamp = |v: f32, dim: usize| (v as i64).min(dim as i64 - 1);
        [
            clamp(c.x, self.dims[0]),
            clamp(c.y, self.dims[1]),
            clamp(c.z, self.dims[2]),
        ]
    }

    fn cell_id(&self, [i, j, k]: [usize; 3]) -> usize {
        (i * self.dims[1] + j) * self.dims[2] + k
    }

    /// Collects into `out` every atom whose sphere, grown by `r_extra`,
    /// contains `p`. `out` is cleared first.
    pub fn within_radii(&self, pos_rad: &[f32], p: Vec3, r_extra: f32, out: &mut Vec<usize>) {
        out.clear();
        let near = self.cell_coords(p);
        let lo = near.map(|c| (c - 1).max(0) as usize);
        let hi = [0, 1, 2].map(|a| (near[a] + 1).min(self.dims[a] as i64 - 1));
        if hi.iter().any(|&h| h < 0) {
            return;
        }
        let hi = hi.map(|h| h as usize);

        for i in lo[0]..=hi[0] {
            for j in lo[1]..=hi[1] {
                for k in lo[2]..=hi[2] {
                    let cid = self.cell_id([i, j, k]);
                    let start = self.cell_offsets[cid];
                    for &atom in &self.data[start..start + self.cell_lengths[cid]] {
                        let quad = &pos_rad[atom * 4..atom * 4 + 4];
                        let d2 = Vec3::from_slice(quad).distance_squared(p);
                        let r_sum = quad[3] + r_extra;
                        if d2 <= r_sum * r_sum {
                            out.push(atom);
                        }
                    }
                }
            }
        }
    }

    /// Upper bound on the number of atoms a query can return.
    #[must_use]
    pub fn neighbour_capacity(&self) -> usize {
        27 * self.cell_lengths.iter().copied().max().unwrap_or(0)
    }
}
