//! Per-vertex coloring from a color volume, with optional visibility filtering.

use glam::Vec3;
use miew_core::{AtomId, MiewError, Result, VisibilitySelector, Volume};

use crate::marching_cubes::IsoSurface;

/// Dominant-atom data sampled on the density grid.
#[derive(Debug, Clone, Copy)]
pub struct AtomField<'a> {
    /// Weight of the dominant atom at each voxel.
    pub weights: &'a Volume,
    /// Dominant atom at each voxel, indexed like `weights`.
    pub atoms: &'a [Option<AtomId>],
}

/// Up to eight atoms with their summed corner weights.
#[derive(Default)]
struct CornerWeights {
    entries: [(u32, f32); 8],
    len: usize,
}

impl CornerWeights {
    fn clear(&mut self) {
        self.len = 0;
    }

    fn add(&mut self, atom: AtomId, w: f32) {
        let entries = &mut self.entries[..self.len];
        if let Some(entry) = entries.iter_mut().find(|(a, _)| *a == atom.0) {
            entry.1 += w;
        } else {
            self.entries[self.len] = (atom.0, w);
            self.len += 1;
        }
    }

    /// The atom with the largest positive weight; the first one reached wins ties.
    fn dominant(&self) -> Option<AtomId> {
        let mut max_weight = 0.0;
        let mut dominant = None;
        for &(atom, w) in &self.entries[..self.len] {
            if w > max_weight {
                max_weight = w;
                dominant = Some(AtomId(atom));
            }
        }
        dominant
    }
}

impl IsoSurface {
    /// Assigns each vertex the trilinearly interpolated color of `color_map`.
    ///
    /// With a selector, each vertex is also attributed to the atom with the
    /// largest summed corner weight in `atom_field`. Vertices whose owner is
    /// missing or not selected are removed along with every triangle that uses
    /// them, and all buffers shrink to the surviving size.
    ///
    /// Both volumes must share the grid the surface was extracted from.
    pub fn set_color_vol_tex(
        &mut self,
        color_map: &Volume,
        atom_field: Option<AtomField<'_>>,
        selector: Option<&dyn VisibilitySelector>,
    ) -> Result<()> {
        if color_map.item_size() != 3 {
            return Err(MiewError::InvalidVectorSize(color_map.item_size()));
        }
        let num_verts = self.num_vertices();
        if num_verts == 0 {
            self.mesh.colors.clear();
            return Ok(());
        }
        check_dims(self.dims, color_map)?;

        let filter = match (selector, atom_field) {
            (None, _) => None,
            (Some(selector), Some(field)) => {
                check_dims(self.dims, field.weights)?;
                if field.atoms.len() != field.weights.data().len() {
                    return Err(MiewError::SizeMismatch {
                        expected: field.weights.data().len(),
                        actual: field.atoms.len(),
                    });
                }
                Some((selector, field))
            }
            (Some(_), None) => {
                return Err(MiewError::InvalidParameter(
                    "visibility filtering needs an atom map".into(),
                ))
            }
        };

        let [xs, ys, zs] = self.dims.map(|d| d - 1);
        let inv = Vec3::ONE / self.cell;
        let colors = color_map.data();

        let mut vertex_map: Vec<Option<u32>> = vec![None; num_verts];
        let mut out_colors = vec![0.0_f32; num_verts * 3];
        let mut corner_weights = CornerWeights::default();
        let mut kept = 0u32;

        for i in 0..num_verts {
            let v = (self.mesh.position(i) - self.origin) * inv;
            let x = v.x.clamp(0.0, xs as f32) as usize;
            let y = v.y.clamp(0.0, ys as f32) as usize;
            let z = v.z.clamp(0.0, zs as f32) as usize;
            let mu = v - Vec3::new(x as f32, y as f32, z as f32);

            let step = [usize::from(x < xs), usize::from(y < ys), usize::from(z < zs)];

            if let Some((selector, field)) = filter {
                let w = field.weights;
                let (dx, dy, dz) = (
                    step[0] * w.stride_x(),
                    step[1] * w.stride_y(),
                    step[2] * w.stride_z(),
                );
                let idx = w.direct_idx(x, y, z);
                let data = w.data();
                corner_weights.clear();
                let mut collect = |ai: usize, cx: f32, cy: f32, cz: f32| {
                    if let Some(atom) = field.atoms[ai] {
                        corner_weights.add(atom, cx * cy * cz * data[ai]);
                    }
                };
                collect(idx, 1.0 - mu.x, 1.0 - mu.y, 1.0 - mu.z);
                collect(idx + dx, mu.x, 1.0 - mu.y, 1.0 - mu.z);
                collect(idx + dy, 1.0 - mu.x, mu.y, 1.0 - mu.z);
                collect(idx + dx + dy, mu.x, mu.y, 1.0 - mu.z);
                collect(idx + dz, 1.0 - mu.x, 1.0 - mu.y, mu.z);
                collect(idx + dx + dz, mu.x, 1.0 - mu.y, mu.z);
                collect(idx + dy + dz, 1.0 - mu.x, mu.y, mu.z);
                collect(idx + dx + dy + dz, mu.x, mu.y, mu.z);

                match corner_weights.dominant() {
                    Some(atom) if selector.includes_atom(atom) => {}
                    _ => continue,
                }
            }

            vertex_map[i] = Some(kept);
            kept += 1;

            let (dx, dy, dz) = (
                step[0] * color_map.stride_x(),
                step[1] * color_map.stride_y(),
                step[2] * color_map.stride_z(),
            );
            let idx = color_map.direct_idx(x, y, z);
            let at = |o: usize| Vec3::from_slice(&colors[o..o + 3]);
            let along_x = |o: usize| at(o).lerp(at(o + dx), mu.x);
            let c0 = along_x(idx);
            let c1 = along_x(idx + dy);
            let c2 = along_x(idx + dz);
            let c3 = along_x(idx + dy + dz);
            let c = c0.lerp(c1, mu.y).lerp(c2.lerp(c3, mu.y), mu.z);
            out_colors[i * 3..i * 3 + 3].copy_from_slice(&c.to_array());
        }
        self.mesh.colors = out_colors;

        if filter.is_some() {
            self.compact(&vertex_map, kept as usize);
        }
        Ok(())
    }

    /// Shifts surviving vertices to the front and drops triangles that lost one.
    fn compact(&mut self, vertex_map: &[Option<u32>], kept: usize) {
        let mesh = &mut self.mesh;
        let before = vertex_map.len();
        for (i, target) in vertex_map.iter().enumerate() {
            let Some(j) = *target else { continue };
            let j = j as usize;
            debug_assert!(j <= i, "compaction moved vertex {i} forward to {j}");
            for buf in [&mut mesh.positions, &mut mesh.normals, &mut mesh.colors] {
                buf.copy_within(i * 3..i * 3 + 3, j * 3);
            }
        }

        let mut tri_count = 0;
        for t in 0..mesh.indices.len() / 3 {
            let remapped = [0, 1, 2].map(|k| vertex_map[mesh.indices[t * 3 + k] as usize]);
            if let [Some(a), Some(b), Some(c)] = remapped {
                mesh.indices[tri_count * 3..tri_count * 3 + 3].copy_from_slice(&[a, b, c]);
                tri_count += 1;
            }
        }

        mesh.positions.truncate(kept * 3);
        mesh.normals.truncate(kept * 3);
        mesh.colors.truncate(kept * 3);
        mesh.indices.truncate(tri_count * 3);
        mesh.positions.shrink_to_fit();
        mesh.normals.shrink_to_fit();
        mesh.colors.shrink_to_fit();
        mesh.indices.shrink_to_fit();

        log::debug!(
            "visibility filter kept {kept} of {before} vertices, {tri_count} triangles"
        );
    }
}

fn check_dims(dims: [usize; 3], volume: &Volume) -> Result<()> {
    let expected: usize = dims.iter().product();
    let actual: usize = volume.dimensions().iter().product();
    if volume.dimensions() == dims {
        Ok(())
    } else {
        Err(MiewError::SizeMismatch { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miew_core::Aabb;
    use std::collections::HashSet;

    /// Density of two Gaussian blobs along X on an 18x10x10 unit grid,
    /// with red on the left half and blue on the right.
    fn two_blobs() -> (IsoSurface, Volume, Volume, Vec<Option<AtomId>>) {
        let dims = [18, 10, 10];
        let bbox = Aabb::from_origin_size(Vec3::ZERO, Vec3::new(17.0, 9.0, 9.0));
        let mut density = Volume::new(dims, bbox, 1).unwrap();
        let mut colors = Volume::new(dims, bbox, 3).unwrap();
        let mut weights = Volume::new(dims, bbox, 1).unwrap();
        let mut atoms = vec![None; 18 * 10 * 10];
        let centers = [Vec3::new(5.5, 4.5, 4.5), Vec3::new(11.5, 4.5, 4.5)];
        let tint = [Vec3::X, Vec3::Z];
        for z in 0..10 {
            for y in 0..10 {
                for x in 0..18 {
                    let p = Vec3::new(x as f32, y as f32, z as f32);
                    for (a, c) in centers.iter().enumerate() {
                        let d = (-(p - *c).length_squared() / 8.0).exp();
                        density.add_value(x, y, z, d);
                        colors.add_vec3(x, y, z, tint[a] * d);
                        let idx = weights.direct_idx(x, y, z);
                        if d > weights.data()[idx] {
                            weights.data_mut()[idx] = d;
                            atoms[idx] = Some(AtomId(a as u32));
                        }
                    }
                }
            }
        }
        let mut surf = IsoSurface::new();
        surf.compute(&density, Vec3::ZERO, 0.5, 1).unwrap();
        surf.vertex_fusion(9, 9);
        (surf, colors, weights, atoms)
    }

    #[test]
    fn test_corner_weights() {
        let mut w = CornerWeights::default();
        assert_eq!(w.dominant(), None);
        w.add(AtomId(3), 0.25);
        w.add(AtomId(1), 0.25);
        assert_eq!(w.dominant(), Some(AtomId(3)));
        w.add(AtomId(1), 0.1);
        assert_eq!(w.dominant(), Some(AtomId(1)));
        w.clear();
        w.add(AtomId(2), 0.0);
        assert_eq!(w.dominant(), None);
    }

    #[test]
    fn test_color_without_selector() {
        let (mut surf, colors, _, _) = two_blobs();
        let positions = surf.positions().to_vec();
        let indices = surf.indices().to_vec();
        surf.set_color_vol_tex(&colors, None, None).unwrap();

        assert_eq!(surf.colors().len(), surf.positions().len());
        assert_eq!(surf.positions(), positions.as_slice());
        assert_eq!(surf.indices(), indices.as_slice());

        // the far left vertex is mostly red
        let pos = surf.positions();
        let leftmost = (0..surf.num_vertices())
            .min_by(|&a, &b| pos[a * 3].total_cmp(&pos[b * 3]))
            .unwrap();
        let c = &surf.colors()[leftmost * 3..leftmost * 3 + 3];
        assert!(c[0] > c[2]);
    }

    #[test]
    fn test_selector_filters_one_blob() {
        let (mut surf, colors, weights, atoms) = two_blobs();
        let before_vertices = surf.num_vertices();
        let before_triangles = surf.num_triangles();
        let only_left: HashSet<AtomId> = [AtomId(0)].into_iter().collect();
        let field = AtomField {
            weights: &weights,
            atoms: &atoms,
        };
        surf.set_color_vol_tex(&colors, Some(field), Some(&only_left))
            .unwrap();

        assert!(surf.num_vertices() > 0);
        assert!(surf.num_vertices() < before_vertices);
        assert!(surf.num_triangles() < before_triangles);
        assert_eq!(surf.colors().len(), surf.positions().len());
        assert_eq!(surf.normals().len(), surf.positions().len());
        assert!(surf.mesh().validate_indices().is_ok());
        // everything left sits on the left blob's side of the midplane
        for p in surf.positions().chunks_exact(3) {
            assert!(p[0] < 9.0);
        }
    }

    #[test]
    fn test_selector_rejecting_everything() {
        let (mut surf, colors, weights, atoms) = two_blobs();
        let nothing = |_: AtomId| false;
        let field = AtomField {
            weights: &weights,
            atoms: &atoms,
        };
        surf.set_color_vol_tex(&colors, Some(field), Some(&nothing))
            .unwrap();
        assert_eq!(surf.num_vertices(), 0);
        assert!(surf.indices().is_empty());
        assert!(surf.colors().is_empty());
    }

    #[test]
    fn test_selector_without_atom_map() {
        let (mut surf, colors, _, _) = two_blobs();
        let all = |_: AtomId| true;
        assert!(matches!(
            surf.set_color_vol_tex(&colors, None, Some(&all)),
            Err(MiewError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_mismatched_color_grid() {
        let (mut surf, _, _, _) = two_blobs();
        let bbox = Aabb::from_origin_size(Vec3::ZERO, Vec3::ONE);
        let small = Volume::new([2, 2, 2], bbox, 3).unwrap();
        assert!(matches!(
            surf.set_color_vol_tex(&small, None, None),
            Err(MiewError::SizeMismatch { .. })
        ));
        let scalar = Volume::new([2, 2, 2], bbox, 1).unwrap();
        assert!(surf.set_color_vol_tex(&scalar, None, None).is_err());
    }
}
