//! Extracted surface meshes, ready for upload.

use glam::Vec3;

use crate::bounds::{Aabb, BoundingSphere};
use crate::error::{MiewError, Result};

/// An indexed triangle mesh with per-vertex normals and colors.
///
/// All buffers are flat: three floats per vertex, three indices per triangle.
/// An empty surface is a valid mesh with empty buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    /// Per-vertex RGB; empty when the surface was not colorized.
    pub colors: Vec<f32>,
    pub indices: Vec<u32>,
}

impl SurfaceMesh {
    /// Number of vertices.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles.
    #[must_use]
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns true if there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[must_use]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[i * 3..i * 3 + 3])
    }

    #[must_use]
    pub fn normal(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.normals[i * 3..i * 3 + 3])
    }

    /// Triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Checks buffer lengths and that every index names a vertex.
    pub fn validate_indices(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(MiewError::SizeMismatch {
                expected: self.indices.len() / 3 * 3,
                actual: self.indices.len(),
            });
        }
        let n = self.num_vertices();
        if self.normals.len() != self.positions.len() {
            return Err(MiewError::SizeMismatch {
                expected: self.positions.len(),
                actual: self.normals.len(),
            });
        }
        if !self.colors.is_empty() && self.colors.len() != self.positions.len() {
            return Err(MiewError::SizeMismatch {
                expected: self.positions.len(),
                actual: self.colors.len(),
            });
        }
        match self.indices.iter().find(|&&i| i as usize >= n) {
            Some(&bad) => Err(MiewError::out_of_range(bad as usize, n)),
            None => Ok(()),
        }
    }

    /// Axis-aligned bounds of the vertices.
    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        let mut bbox = Aabb::empty();
        for p in self.positions.chunks_exact(3) {
            bbox.expand_by_point(Vec3::from_slice(p));
        }
        bbox
    }

    #[must_use]
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::from_flat(&self.positions)
    }

    /// Position buffer as raw bytes.
    #[must_use]
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Normal buffer as raw bytes.
    #[must_use]
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    /// Color buffer as raw bytes.
    #[must_use]
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    /// Index buffer as raw bytes.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> SurfaceMesh {
        SurfaceMesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            colors: Vec::new(),
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_counts() {
        let mesh = triangle();
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.num_triangles(), 1);
        assert!(!mesh.is_empty());
        assert_eq!(mesh.triangles().collect::<Vec<_>>(), vec![[0, 1, 2]]);
        assert!(mesh.validate_indices().is_ok());
    }

    #[test]
    fn test_empty_mesh_is_valid() {
        let mesh = SurfaceMesh::default();
        assert!(mesh.is_empty());
        assert!(mesh.validate_indices().is_ok());
        assert!(mesh.position_bytes().is_empty());
        assert!(mesh.bounding_box().is_empty());
    }

    #[test]
    fn test_bad_index() {
        let mut mesh = triangle();
        mesh.indices[2] = 3;
        assert!(matches!(
            mesh.validate_indices(),
            Err(MiewError::IndexOutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn test_byte_views() {
        let mesh = triangle();
        assert_eq!(mesh.position_bytes().len(), 9 * 4);
        assert_eq!(mesh.index_bytes().len(), 3 * 4);
    }

    #[test]
    fn test_bounds() {
        let mesh = triangle();
        let bbox = mesh.bounding_box();
        assert_eq!(bbox.min, Vec3::ZERO);
        assert_eq!(bbox.max, Vec3::new(1.0, 1.0, 0.0));
        assert!(mesh.bounding_sphere().radius > 0.7);
    }
}
