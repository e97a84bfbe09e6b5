//! Marching cubes isosurface extraction over a [`Volume`].
//!
//! Cells are walked x-fastest. Each corner below the isovalue sets its bit in
//! the cube code; the edge table gives the cut edges and the triangle table the
//! triangles over them. Every triangle gets three fresh vertices, so adjacent
//! cells produce duplicates that [`IsoSurface::vertex_fusion`] merges later.
//!
//! Normals are the negated density gradient interpolated along each cut edge.
//! They point away from dense regions and are unit length only after fusion.

use std::time::Instant;

use glam::Vec3;
use miew_core::{MiewError, Result, SurfaceMesh, Volume};

use crate::tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};

/// Tolerance for the off-axis components of a voxel basis.
const AXIS_EPSILON: f32 = f32::EPSILON;

/// Voxel basis of a volume: the world-space step along each grid axis.
///
/// Only right-handed, axis-aligned bases in the positive octant can be
/// marched. Oblique crystallographic grids must be resampled first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisFrame {
    x_axis: Vec3,
    y_axis: Vec3,
    z_axis: Vec3,
}

impl AxisFrame {
    /// Validates a basis.
    ///
    /// A left-handed basis is flipped before the octant check, so it is
    /// rejected along with any basis that has negative or off-axis components.
    pub fn new(x_axis: Vec3, y_axis: Vec3, z_axis: Vec3) -> Result<Self> {
        let mut dirs = [
            x_axis.normalize_or_zero(),
            y_axis.normalize_or_zero(),
            z_axis.normalize_or_zero(),
        ];
        if dirs[0].cross(dirs[1]).dot(dirs[2]) < 0.0 {
            for d in &mut dirs {
                *d = -*d;
            }
        }
        if dirs.iter().any(|d| d.min_element() < 0.0) {
            return Err(MiewError::UnsupportedGeometry(format!(
                "voxel basis leaves the positive octant: {x_axis}, {y_axis}, {z_axis}"
            )));
        }

        let off_axis = |v: f32| v.abs() > AXIS_EPSILON;
        if off_axis(x_axis.y)
            || off_axis(x_axis.z)
            || off_axis(y_axis.x)
            || off_axis(y_axis.z)
            || off_axis(z_axis.x)
            || off_axis(z_axis.y)
        {
            return Err(MiewError::UnsupportedGeometry(format!(
                "voxel basis is not axis-aligned: {x_axis}, {y_axis}, {z_axis}"
            )));
        }

        Ok(Self {
            x_axis,
            y_axis,
            z_axis,
        })
    }

    /// The basis of an orthogonal grid with the given cell size.
    pub fn from_cell_size(cell: Vec3) -> Result<Self> {
        Self::new(
            Vec3::new(cell.x, 0.0, 0.0),
            Vec3::new(0.0, cell.y, 0.0),
            Vec3::new(0.0, 0.0, cell.z),
        )
    }

    /// World-space extent of one cell along each axis.
    #[must_use]
    pub fn cell_size(&self) -> Vec3 {
        Vec3::new(self.x_axis.x, self.y_axis.y, self.z_axis.z)
    }
}

/// An extracted isosurface, refined in place by fusion and colorization.
#[derive(Debug, Clone, Default)]
pub struct IsoSurface {
    pub(crate) mesh: SurfaceMesh,
    pub(crate) origin: Vec3,
    pub(crate) cell: Vec3,
    pub(crate) dims: [usize; 3],
}

impl IsoSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts the `iso_value` surface of a scalar volume.
    ///
    /// `origin` is the world position of voxel `(0, 0, 0)`; `step` visits every
    /// `step`-th sample along each axis. Any previous result is discarded.
    /// A surface that misses the field entirely is empty, not an error.
    pub fn compute(&mut self, volume: &Volume, origin: Vec3, iso_value: f32, step: usize) -> Result<()> {
        if step == 0 {
            return Err(MiewError::InvalidParameter("marching step must be at least 1".into()));
        }
        let gradient = volume
            .compute_gradient()
            .ok_or(MiewError::InvalidVectorSize(volume.item_size()))?;
        let frame = AxisFrame::from_cell_size(volume.cell_size())?;

        let start = Instant::now();
        self.mesh = SurfaceMesh::default();
        self.origin = origin;
        self.cell = frame.cell_size();
        self.dims = volume.dimensions();

        let triangles = self.march(volume, &gradient, iso_value, step);
        log::debug!(
            "isosurface at {iso_value}: {triangles} triangles over {:?} voxels in {:?}",
            self.dims,
            start.elapsed()
        );
        Ok(())
    }

    fn march(&mut self, volume: &Volume, gradient: &Volume, iso_value: f32, step: usize) -> usize {
        let [xs, ys, zs] = self.dims;
        let data = volume.data();
        let sx = step * volume.stride_x();
        let sy = step * volume.stride_y();
        let sz = step * volume.stride_z();
        let corner_offsets = [0, sx, sx + sy, sy, sz, sx + sz, sx + sy + sz, sy + sz];

        let mut val = [0.0_f32; 8];
        let mut p = [Vec3::ZERO; 8];
        let mut g = [Vec3::ZERO; 8];
        let mut vert_list = [Vec3::ZERO; 12];
        let mut norm_list = [Vec3::ZERO; 12];
        let mut triangles = 0;

        for z in (0..zs.saturating_sub(step)).step_by(step) {
            for y in (0..ys.saturating_sub(step)).step_by(step) {
                let mut idx = volume.direct_idx(0, y, z);
                for x in (0..xs.saturating_sub(step)).step_by(step) {
                    let mut cube_index = 0usize;
                    for (i, off) in corner_offsets.iter().enumerate() {
                        val[i] = data[idx + off];
                        if val[i] < iso_value {
                            cube_index |= 1 << i;
                        }
                    }
                    idx += sx;

                    let edges = EDGE_TABLE[cube_index];
                    if edges == 0 {
                        continue;
                    }

                    for (i, [ox, oy, oz]) in CORNER_OFFSETS.iter().enumerate() {
                        let (cx, cy, cz) = (x + ox * step, y + oy * step, z + oz * step);
                        p[i] = Vec3::new(cx as f32, cy as f32, cz as f32);
                        g[i] = gradient.vec3(cx, cy, cz);
                    }

                    for (e, &[a, b]) in EDGE_CORNERS.iter().enumerate() {
                        if edges & (1 << e) == 0 {
                            continue;
                        }
                        let mu = edge_mu(iso_value, val[a], val[b]);
                        vert_list[e] = p[a].lerp(p[b], mu);
                        norm_list[e] = g[a].lerp(g[b], mu);
                    }

                    for tri in TRI_TABLE[cube_index].chunks_exact(3) {
                        if tri[0] < 0 {
                            break;
                        }
                        self.push_triangle(tri, &vert_list, &norm_list);
                        triangles += 1;
                    }
                }
            }
        }
        triangles
    }

    fn push_triangle(&mut self, tri: &[i8], vert_list: &[Vec3; 12], norm_list: &[Vec3; 12]) {
        let base = self.mesh.num_vertices() as u32;
        self.mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
        for &e in tri {
            let e = e as usize;
            let pos = self.origin + vert_list[e] * self.cell;
            self.mesh.positions.extend_from_slice(&pos.to_array());
            self.mesh.normals.extend_from_slice(&norm_list[e].to_array());
        }
    }

    #[must_use]
    pub fn num_triangles(&self) -> usize {
        self.mesh.num_triangles()
    }

    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.mesh.num_vertices()
    }

    #[must_use]
    pub fn positions(&self) -> &[f32] {
        &self.mesh.positions
    }

    #[must_use]
    pub fn normals(&self) -> &[f32] {
        &self.mesh.normals
    }

    /// Per-vertex colors; empty until [`IsoSurface::set_color_vol_tex`] runs.
    #[must_use]
    pub fn colors(&self) -> &[f32] {
        &self.mesh.colors
    }

    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.mesh.indices
    }

    /// The current buffers.
    #[must_use]
    pub fn mesh(&self) -> &SurfaceMesh {
        &self.mesh
    }

    #[must_use]
    pub fn into_mesh(self) -> SurfaceMesh {
        self.mesh
    }
}

/// Interpolation parameter of the isovalue crossing between two samples.
///
/// A flat edge collapses onto its first corner.
#[inline]
fn edge_mu(iso_value: f32, v1: f32, v2: f32) -> f32 {
    let diff = v2 - v1;
    let mu = if diff.abs() > 0.0 {
        (iso_value - v1) / diff
    } else {
        0.0
    };
    mu.clamp(0.0, 1.0)
}
