//! Merging of coincident vertices.
//!
//! Marching cubes emits every triangle with its own three vertices. Fusion
//! compares each vertex against a short window of the most recently kept ones
//! and reuses a match instead of keeping a copy. Vertices far apart in emission
//! order are never merged, so the result is compact but not minimal.

use glam::Vec3;

use crate::marching_cubes::IsoSurface;

#[inline]
fn coincident(a: &[f32], b: &[f32]) -> bool {
    a.iter().zip(b).all(|(x, y)| (x - y).abs() < f32::EPSILON)
}

impl IsoSurface {
    /// Merges vertices that match one of the kept vertices in the window.
    ///
    /// Vertex `i` is compared against kept vertices `start..end` where
    /// `start = kept - offset` (floored at 0) and `end = min(start + len, kept)`.
    /// Indices are remapped, buffers shrink to the kept count, and normals are
    /// renormalized. Does nothing on an empty surface.
    pub fn vertex_fusion(&mut self, offset: usize, len: usize) {
        let mesh = &mut self.mesh;
        let old_count = mesh.num_vertices();
        if mesh.indices.is_empty() || old_count == 0 {
            return;
        }
        let has_colors = mesh.colors.len() == mesh.positions.len();

        let mut vertex_map = vec![0u32; old_count];
        let mut kept: usize = 1;
        for i in 1..old_count {
            let start = kept.saturating_sub(offset);
            let end = (start + len).min(kept);
            let candidate = &mesh.positions[i * 3..i * 3 + 3];
            let matched =
                (start..end).find(|&j| coincident(&mesh.positions[j * 3..j * 3 + 3], candidate));

            if let Some(j) = matched {
                vertex_map[i] = j as u32;
            } else {
                mesh.positions.copy_within(i * 3..i * 3 + 3, kept * 3);
                mesh.normals.copy_within(i * 3..i * 3 + 3, kept * 3);
                if has_colors {
                    mesh.colors.copy_within(i * 3..i * 3 + 3, kept * 3);
                }
                vertex_map[i] = kept as u32;
                kept += 1;
            }
        }

        for idx in &mut mesh.indices {
            *idx = vertex_map[*idx as usize];
        }
        mesh.positions.truncate(kept * 3);
        mesh.normals.truncate(kept * 3);
        if has_colors {
            mesh.colors.truncate(kept * 3);
        } else {
            mesh.colors.clear();
        }
        for n in mesh.normals.chunks_exact_mut(3) {
            let unit = Vec3::from_slice(n).normalize_or_zero();
            n.copy_from_slice(&unit.to_array());
        }

        log::debug!("vertex fusion: {old_count} -> {kept} vertices");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miew_core::{Aabb, SurfaceMesh, Volume};
    use proptest::prelude::*;

    fn soup(positions: Vec<f32>, indices: Vec<u32>) -> IsoSurface {
        let normals = positions.iter().map(|v| v * 2.0 + 1.0).collect();
        IsoSurface {
            mesh: SurfaceMesh {
                positions,
                normals,
                colors: Vec::new(),
                indices,
            },
            ..IsoSurface::default()
        }
    }

    #[test]
    fn test_empty_is_noop() {
        let mut surf = IsoSurface::new();
        surf.vertex_fusion(9, 9);
        assert_eq!(surf.num_vertices(), 0);
    }

    #[test]
    fn test_merges_within_window() {
        // two triangles sharing an edge, emitted with duplicated vertices
        let positions = vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
            1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
        ];
        let mut surf = soup(positions, vec![0, 1, 2, 3, 4, 5]);
        surf.vertex_fusion(9, 9);
        assert_eq!(surf.num_vertices(), 4);
        assert_eq!(surf.indices(), &[0, 1, 2, 1, 3, 2]);
        for n in surf.normals().chunks_exact(3) {
            assert!((Vec3::from_slice(n).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_window_limits_matches() {
        // vertex 3 repeats vertex 0, but the window only reaches back one vertex
        let positions = vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 6.0, 0.0,
            0.0,
        ];
        let mut narrow = soup(positions.clone(), vec![0, 1, 2, 3, 4, 5]);
        narrow.vertex_fusion(1, 1);
        assert_eq!(narrow.num_vertices(), 6);

        let mut wide = soup(positions, vec![0, 1, 2, 3, 4, 5]);
        wide.vertex_fusion(9, 9);
        assert_eq!(wide.num_vertices(), 5);
        assert_eq!(wide.indices(), &[0, 1, 2, 0, 3, 4]);
    }

    #[test]
    fn test_fuses_marching_cubes_output() {
        let n = 16;
        let bbox = Aabb::from_origin_size(Vec3::ZERO, Vec3::splat((n - 1) as f32));
        let mut vol = Volume::new([n, n, n], bbox, 1).unwrap();
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    let d = Vec3::new(x as f32, y as f32, z as f32) - Vec3::splat(7.3);
                    vol.set_value(x, y, z, (-d.length_squared() / 18.0).exp());
                }
            }
        }
        let mut surf = IsoSurface::new();
        surf.compute(&vol, Vec3::ZERO, 0.5, 1).unwrap();
        let before = surf.num_vertices();
        let triangles = surf.num_triangles();
        surf.vertex_fusion(9, 9);
        assert!(surf.num_vertices() < before);
        assert_eq!(surf.num_triangles(), triangles);
        assert!(surf.mesh().validate_indices().is_ok());
        for n in surf.normals().chunks_exact(3) {
            assert!((Vec3::from_slice(n).length() - 1.0).abs() < 1e-4);
        }
    }

    proptest! {
        #[test]
        fn prop_fusion_keeps_indices_valid(
            coords in proptest::collection::vec(0u8..4, 9..90),
            offset in 0usize..12,
            len in 0usize..12,
        ) {
            let count = coords.len() / 9 * 9;
            let positions: Vec<f32> = coords[..count].iter().map(|&c| f32::from(c)).collect();
            let indices: Vec<u32> = (0..(count / 3) as u32).collect();
            let mut surf = soup(positions, indices);
            let before = surf.num_vertices();
            surf.vertex_fusion(offset, len);

            prop_assert!(surf.num_vertices() <= before);
            prop_assert_eq!(surf.indices().len(), count / 3);
            prop_assert!(surf.mesh().validate_indices().is_ok());
        }
    }
}
