//! Contact surfaces.
//!
//! Every atom radius is grown by the probe radius. Each grid point inside a
//! grown sphere is projected onto that sphere; when the projection is not
//! buried in a neighbouring sphere, the point stores its depth below the
//! sphere. Probe positions on the circles where two grown spheres intersect
//! then pull nearby points down to their distance from the probe, which fills
//! the crevices between atoms.

use std::f32::consts::PI;
use std::ops::Range;
use std::time::Instant;

use glam::Vec3;
use miew_core::{AtomId, ContactSurfParams, MiewError, PackedAtoms, Result, Volume};

use crate::builder::{SurfaceAlgorithm, SurfaceFields};
use crate::grid::GridLayout;
use crate::spatial_hash::SpatialHash;

/// Initial value of grid points no atom has reached.
const UNVISITED: f32 = -1001.0;

/// Width of the color blending kernel.
const COLOR_SIGMA: f32 = 4.0 / 3.0;

/// The probe-based contact surface algorithm.
#[derive(Debug, Clone)]
pub struct ContactSurf {
    params: ContactSurfParams,
}

impl ContactSurf {
    pub fn new(params: ContactSurfParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    #[must_use]
    pub fn params(&self) -> &ContactSurfParams {
        &self.params
    }
}

impl SurfaceAlgorithm for ContactSurf {
    fn name(&self) -> &'static str {
        "contact surface"
    }

    fn grid_spacing(&self) -> f32 {
        self.params.grid_spacing()
    }

    fn rad_scale(&self) -> f32 {
        1.0
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
        let start = Instant::now();
        let mut projector = Projector::new(atoms, layout, &self.params, track_atoms)?;
        projector.project_points();
        log::trace!("contact surface: points projected in {:?}", start.elapsed());
        projector.project_torii();
        log::trace!("contact surface: torii projected in {:?}", start.elapsed());
        projector.fix_negatives();
        projector.into_fields(layout)
    }
}

/// Any vector perpendicular to `p`, unnormalized.
fn normal_to_line(p: Vec3) -> Vec3 {
    let mut out = Vec3::ONE;
    if p.x != 0.0 {
        out.x = (p.y + p.z) / -p.x;
    } else if p.y != 0.0 {
        out.y = (p.x + p.z) / -p.y;
    } else if p.z != 0.0 {
        out.z = (p.x + p.y) / -p.z;
    }
    out
}

/// Working state of one contact surface computation.
struct Projector<'a> {
    /// Positions with probe-grown radii.
    pos_rad: Vec<f32>,
    /// Squared grown radii.
    r2: Vec<f32>,
    colors: &'a [f32],
    atoms: &'a [AtomId],

    scale_factor: f32,
    min: Vec3,
    dims: [usize; 3],
    grid_x: Vec<f32>,
    grid_y: Vec<f32>,
    grid_z: Vec<f32>,

    grid: Vec<f32>,
    vol_tex: Vec<f32>,
    weights: Vec<f32>,
    weights_map: Option<Vec<f32>>,
    atom_map: Option<Vec<Option<AtomId>>>,

    cos_table: Vec<f32>,
    sin_table: Vec<f32>,
    ng_torus: i64,

    hash: SpatialHash,
    neighbours: Vec<usize>,
    /// Atom that obscured the previous query, tried first on the next one.
    last_clip: Option<usize>,
}

impl<'a> Projector<'a> {
    fn new(
        atoms: &'a PackedAtoms,
        layout: &GridLayout,
        params: &ContactSurfParams,
        track_atoms: bool,
    ) -> Result<Self> {
        atoms.validate()?;
        let mut pos_rad = atoms.pos_rad.clone();
        let mut max_radius = 0.0_f32;
        let r2 = pos_rad
            .chunks_exact_mut(4)
            .map(|quad| {
                quad[3] += params.probe_radius;
                max_radius = max_radius.max(quad[3]);
                quad[3] * quad[3]
            })
            .collect();
        if !(max_radius.is_finite() && max_radius > 0.0) {
            return Err(MiewError::InvalidParameter(format!(
                "grown atom radii must be positive, largest is {max_radius}"
            )));
        }

        let scale_factor = 1.0 / layout.grid_spacing;
        let step = layout.grid_spacing;
        let axis = |n: usize, start: f32| (0..n).map(|i| start + step * i as f32).collect::<Vec<_>>();

        let n_voxels = layout.num_voxels();
        let (weights_map, atom_map) = if track_atoms {
            (Some(vec![0.0; n_voxels]), Some(vec![None; n_voxels]))
        } else {
            (None, None)
        };

        let angle_step = 2.0 * PI / params.probe_positions as f32;
        let (sin_table, cos_table) = (0..params.probe_positions)
            .map(|i| (angle_step * i as f32).sin_cos())
            .unzip();

        let hash = SpatialHash::new(&pos_rad, layout.min, layout.max, 2.01 * max_radius)?;
        let neighbours = Vec::with_capacity(hash.neighbour_capacity());

        Ok(Self {
            pos_rad,
            r2,
            colors: &atoms.colors,
            atoms: &atoms.atoms,
            scale_factor,
            min: layout.min,
            dims: layout.dims,
            grid_x: axis(layout.dims[0], layout.min.x),
            grid_y: axis(layout.dims[1], layout.min.y),
            grid_z: axis(layout.dims[2], layout.min.z),
            grid: vec![UNVISITED; n_voxels],
            vol_tex: vec![0.0; n_voxels * 3],
            weights: vec![0.0; n_voxels],
            weights_map,
            atom_map,
            cos_table,
            sin_table,
            ng_torus: (2 + (params.probe_radius * scale_factor).floor() as i64).min(5),
            hash,
            neighbours,
            last_clip: None,
        })
    }

    fn num_atoms(&self) -> usize {
        self.pos_rad.len() / 4
    }

    fn sphere(&self, i: usize) -> (Vec3, f32) {
        let quad = &self.pos_rad[i * 4..i * 4 + 4];
        (Vec3::from_slice(quad), quad[3])
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dims[0] * (y + self.dims[1] * z)
    }

    /// Grid points within `ng` voxels of `p`, one extra on the high side.
    fn window(&self, p: Vec3, ng: i64) -> [Range<usize>; 3] {
        let cell = ((p - self.min) * self.scale_factor).floor().to_array();
        [0, 1, 2].map(|a| {
            let dim = self.dims[a] as i64;
            let c = cell[a] as i64;
            let lo = (c - ng).clamp(0, dim);
            let hi = (c + ng + 2).clamp(lo, dim);
            lo as usize..hi as usize
        })
    }

    fn single_atom_obscures(&self, ai: usize, p: Vec3) -> bool {
        let (center, _) = self.sphere(ai);
        center.distance_squared(p) < self.r2[ai]
    }

    /// First neighbour other than `a` and `b` whose grown sphere contains `p`.
    fn obscured(&mut self, p: Vec3, a: usize, b: Option<usize>) -> Option<usize> {
        let skip = |ai: usize| ai == a || Some(ai) == b;

        if let Some(ai) = self.last_clip {
            if !skip(ai) && self.single_atom_obscures(ai, p) {
                return Some(ai);
            }
            self.last_clip = None;
        }

        for n in 0..self.neighbours.len() {
            let ai = self.neighbours[n];
            if !skip(ai) && self.single_atom_obscures(ai, p) {
                self.last_clip = Some(ai);
                return Some(ai);
            }
        }
        self.last_clip = None;
        None
    }

    /// Depth below each atom sphere, plus the color blend and atom ownership.
    fn project_points(&mut self) {
        let sigma2_inv = 1.0 / (2.0 * COLOR_SIGMA * COLOR_SIGMA);

        for i in 0..self.num_atoms() {
            let (a, ar) = self.sphere(i);
            let ar2 = self.r2[i];
            self.hash.within_radii(&self.pos_rad, a, ar, &mut self.neighbours);

            let ng = (ar * self.scale_factor).ceil() as i64;
            let [xr, yr, zr] = self.window(a, ng);
            let color = Vec3::from_slice(&self.colors[i * 3..i * 3 + 3]);
            let atom = self.atoms[i];

            for z in zr {
                let dz = self.grid_z[z] - a.z;
                for y in yr.clone() {
                    let dy = self.grid_y[y] - a.y;
                    let dzy2 = dz * dz + dy * dy;
                    for x in xr.clone() {
                        let dx = self.grid_x[x] - a.x;
                        let d2 = dzy2 + dx * dx;
                        if d2 >= ar2 {
                            continue;
                        }

                        let idx = self.index(x, y, z);
                        let w = (-d2 * sigma2_inv).exp();
                        let tex = &mut self.vol_tex[idx * 3..idx * 3 + 3];
                        for (dst, c) in tex.iter_mut().zip(color.to_array()) {
                            *dst += c * w;
                        }
                        self.weights[idx] += w;
                        if let (Some(weights_map), Some(atom_map)) =
                            (self.weights_map.as_mut(), self.atom_map.as_mut())
                        {
                            if w > weights_map[idx] {
                                weights_map[idx] = w;
                                atom_map[idx] = Some(atom);
                            }
                        }

                        if self.grid[idx] < 0.0 {
                            self.grid[idx] = -self.grid[idx];
                        }

                        let d = d2.sqrt();
                        let projected = a + Vec3::new(dx, dy, dz) * (ar / d);
                        if self.obscured(projected, i, None).is_none() {
                            let depth = ar - d;
                            if depth < self.grid[idx] {
                                self.grid[idx] = depth;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Runs [`Self::project_torus`] once for every pair of overlapping atoms.
    fn project_torii(&mut self) {
        for i in 0..self.num_atoms() {
            let (center, radius) = self.sphere(i);
            self.hash
                .within_radii(&self.pos_rad, center, radius, &mut self.neighbours);
            for n in 0..self.neighbours.len() {
                let j = self.neighbours[n];
                if i < j {
                    self.project_torus(i, j);
                }
            }
        }
    }

    /// Samples the intersection circle of atoms `a` and `b` and lowers every
    /// visited grid point near an unobscured sample to its distance from it.
    fn project_torus(&mut self, a: usize, b: usize) {
        let (pa, r1) = self.sphere(a);
        let (pb, r2) = self.sphere(b);
        let delta = pb - pa;
        let d = delta.length();

        let cos_a = (r1 * r1 + d * d - r2 * r2) / (2.0 * r1 * d);
        let dmp = r1 * cos_a;
        let r_int = (r1 * r1 - dmp * dmp).sqrt();
        if !r_int.is_finite() {
            return;
        }

        let mid = delta.normalize_or_zero();
        let n1 = normal_to_line(mid).normalize_or_zero();
        let n2 = mid.cross(n1).normalize_or_zero();
        let (n1, n2) = (n1 * r_int, n2 * r_int);
        let center = pa + mid * dmp;

        self.last_clip = None;

        for t in 0..self.cos_table.len() {
            let p = center + n1 * self.cos_table[t] + n2 * self.sin_table[t];
            if self.obscured(p, a, Some(b)).is_some() {
                continue;
            }

            let [xr, yr, zr] = self.window(p, self.ng_torus);
            for z in zr {
                let dz = p.z - self.grid_z[z];
                for y in yr.clone() {
                    let dy = p.y - self.grid_y[y];
                    let dzy2 = dz * dz + dy * dy;
                    for x in xr.clone() {
                        let dx = p.x - self.grid_x[x];
                        let d2 = dzy2 + dx * dx;
                        let idx = self.index(x, y, z);
                        let current = self.grid[idx];
                        if current > 0.0 && d2 < current * current {
                            self.grid[idx] = d2.sqrt();
                        }
                    }
                }
            }
        }
    }

    /// Zeroes unvisited points and turns the color sums into weighted means.
    fn fix_negatives(&mut self) {
        for (idx, value) in self.grid.iter_mut().enumerate() {
            if *value < 0.0 {
                *value = 0.0;
            }
            let w = self.weights[idx];
            if w > 0.0 {
                let inv = 1.0 / w;
                for c in &mut self.vol_tex[idx * 3..idx * 3 + 3] {
                    *c *= inv;
                }
            }
        }
    }

    fn into_fields(self, layout: &GridLayout) -> Result<SurfaceFields> {
        let bbox = layout.bbox();
        let atom_weights = self
            .weights_map
            .map(|w| Volume::from_data(layout.dims, bbox, 1, w))
            .transpose()?;
        Ok(SurfaceFields {
            density: Volume::from_data(layout.dims, bbox, 1, self.grid)?,
            colors: Volume::from_data(layout.dims, bbox, 3, self.vol_tex)?,
            atom_weights,
            atom_map: self.atom_map,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::VolumeSurfaceBuilder;

    fn params() -> ContactSurfParams {
        ContactSurfParams {
            probe_radius: 1.4,
            iso_value: 1.5,
            probe_positions: 30,
            scale_factor: 1.5,
        }
    }

    fn atoms(spheres: &[(Vec3, f32, Vec3)]) -> PackedAtoms {
        let mut packed = PackedAtoms::new();
        for (i, (p, r, c)) in spheres.iter().enumerate() {
            packed.push(*p, *r, *c, AtomId(i as u32));
        }
        packed
    }

    fn two_atoms() -> PackedAtoms {
        atoms(&[
            (Vec3::ZERO, 1.5, Vec3::X),
            (Vec3::new(3.0, 0.0, 0.0), 1.5, Vec3::Y),
        ])
    }

    fn nearest_voxel(layout: &GridLayout, p: Vec3) -> [usize; 3] {
        let v = ((p - layout.origin) / layout.grid_spacing).round();
        [v.x as usize, v.y as usize, v.z as usize]
    }

    #[test]
    fn test_normal_to_line() {
        for p in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(0.3, -1.2, 2.0), Vec3::new(0.0, 0.0, 2.0)] {
            assert!(normal_to_line(p).dot(p).abs() < 1e-5, "{p}");
        }
        assert_eq!(normal_to_line(Vec3::ZERO), Vec3::ONE);
    }

    #[test]
    fn test_single_atom_depth() {
        let packed = atoms(&[(Vec3::new(1.0, -2.0, 0.5), 1.5, Vec3::new(0.2, 0.4, 0.6))]);
        let surf = ContactSurf::new(params()).unwrap();
        let layout = GridLayout::fit(&packed, surf.grid_spacing(), 1.0).unwrap();
        let fields = surf.compute_surface(&packed, &layout, false).unwrap();

        let center = packed.position(0);
        let grown = 1.5 + 1.4;
        let [nx, ny, nz] = layout.dims;
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let p = layout.origin + Vec3::new(x as f32, y as f32, z as f32) * layout.grid_spacing;
                    let d = p.distance(center);
                    let value = fields.density.value(x, y, z);
                    if d < grown - 1e-3 {
                        assert!((value - (grown - d)).abs() < 1e-4, "({x}, {y}, {z})");
                        let c = fields.colors.vec3(x, y, z);
                        assert!((c - Vec3::new(0.2, 0.4, 0.6)).abs().max_element() < 1e-5);
                    } else if d > grown + 1e-3 {
                        assert_eq!(value, 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_single_atom_surface_radius() {
        let packed = atoms(&[(Vec3::ZERO, 1.5, Vec3::ONE)]);
        let mesh = VolumeSurfaceBuilder::new(ContactSurf::new(params()).unwrap())
            .build(&packed, None)
            .unwrap();
        assert!(mesh.num_triangles() > 0);
        mesh.validate_indices().unwrap();
        // depth 1.5 below a sphere grown to 2.9
        for i in 0..mesh.num_vertices() {
            let r = mesh.position(i).length();
            assert!((r - 1.4).abs() < 0.1, "vertex {i} at radius {r}");
        }
    }

    #[test]
    fn test_torus_fills_crevice() {
        let packed = two_atoms();
        let layout = GridLayout::fit(&packed, params().grid_spacing(), 1.0).unwrap();
        let mut projector = Projector::new(&packed, &layout, &params(), false).unwrap();
        projector.project_points();

        // both projections of this point are buried in the other atom
        let [x, y, z] = nearest_voxel(&layout, Vec3::new(1.5, 1.5, 0.0));
        let idx = projector.index(x, y, z);
        assert_eq!(projector.grid[idx], -UNVISITED);

        projector.project_torii();
        let value = projector.grid[idx];
        assert!(value > 0.0 && value < 2.0, "crevice value {value}");

        projector.fix_negatives();
        assert!(projector.grid.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_dominant_atom_is_nearest() {
        let packed = two_atoms();
        let surf = ContactSurf::new(params()).unwrap();
        let layout = GridLayout::fit(&packed, surf.grid_spacing(), 1.0).unwrap();
        let fields = surf.compute_surface(&packed, &layout, true).unwrap();
        let field = fields.atom_field().unwrap();

        let [x, y, z] = nearest_voxel(&layout, Vec3::new(-0.5, 0.0, 0.0));
        assert_eq!(field.atoms[fields.density.direct_idx(x, y, z)], Some(AtomId(0)));
        let [x, y, z] = nearest_voxel(&layout, Vec3::new(3.5, 0.0, 0.0));
        assert_eq!(field.atoms[fields.density.direct_idx(x, y, z)], Some(AtomId(1)));

        // colors blend between the two atoms
        let [x, y, z] = nearest_voxel(&layout, Vec3::new(1.5, 0.0, 0.0));
        let c = fields.colors.vec3(x, y, z);
        assert!(c.x > 0.0 && c.y > 0.0 && (c.x + c.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_radii_are_rejected() {
        let packed = atoms(&[(Vec3::ZERO, 0.0, Vec3::ONE)]);
        let mut p = params();
        p.probe_radius = 0.0;
        let surf = ContactSurf::new(p).unwrap();
        let layout = GridLayout::fit(&packed, 1.0, 1.0).unwrap();
        assert!(matches!(
            surf.compute_surface(&packed, &layout, false),
            Err(MiewError::InvalidParameter(_))
        ));
    }
}
