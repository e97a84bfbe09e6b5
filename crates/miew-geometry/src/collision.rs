//! CPU-side collision geometry for picking instanced primitives.
//!
//! Instanced batches are drawn from a single template on the GPU, so picking
//! runs against a parallel mesh (or analytic spheres) kept in sync with every
//! instance update. Hits report the chunk they landed on.

use glam::{Mat4, Vec3};
use miew_core::{Aabb, BoundingSphere, MiewError, Result};

use crate::base_mesh::BaseMesh;
use crate::placement::{cylinder_matrix, normal_matrix};
use crate::ray::{Intersection, Ray};

/// Geometry that can be ray-picked.
pub trait Collision {
    /// All hits along `ray`, in no particular order.
    fn raycast(&self, ray: &Ray) -> Vec<Intersection>;

    fn bounding_box(&self) -> Aabb;

    fn bounding_sphere(&self) -> BoundingSphere;
}

/// One template mesh repeated `chunks` times, each copy transformed on its own.
#[derive(Debug, Clone)]
pub struct ChunkedMesh {
    chunk: BaseMesh,
    chunks: usize,
    positions: Vec<f32>,
    normals: Vec<f32>,
    indices: Vec<u32>,
}

impl ChunkedMesh {
    pub fn new(chunk: BaseMesh, chunks: usize) -> Self {
        let chunk_size = chunk.num_vertices();
        let indices = (0..chunks)
            .flat_map(|i| {
                let offset = (i * chunk_size) as u32;
                chunk.indices.iter().map(move |&idx| idx + offset)
            })
            .collect();
        Self {
            positions: vec![0.0; chunks * chunk_size * 3],
            normals: vec![0.0; chunks * chunk_size * 3],
            indices,
            chunk,
            chunks,
        }
    }

    /// Vertices per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk.num_vertices()
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Places chunk `idx` at `transform`, then moves its positions by `shift`.
    pub fn set_chunk(&mut self, idx: usize, transform: &Mat4, shift: Vec3) -> Result<()> {
        if idx >= self.chunks {
            return Err(MiewError::out_of_range(idx, self.chunks));
        }
        let normal_mtx = normal_matrix(transform);
        let len = self.chunk_size() * 3;
        let dst = idx * len..(idx + 1) * len;

        let src = self.chunk.positions.chunks_exact(3);
        for (out, p) in self.positions[dst.clone()].chunks_exact_mut(3).zip(src) {
            let p = transform.transform_point3(Vec3::from_slice(p)) + shift;
            out.copy_from_slice(&p.to_array());
        }
        let src = self.chunk.normals.chunks_exact(3);
        for (out, n) in self.normals[dst].chunks_exact_mut(3).zip(src) {
            let n = normal_mtx * Vec3::from_slice(n);
            out.copy_from_slice(&n.to_array());
        }
        Ok(())
    }

    fn vertex(&self, i: u32) -> Vec3 {
        let i = i as usize * 3;
        Vec3::from_slice(&self.positions[i..i + 3])
    }
}

impl Collision for ChunkedMesh {
    fn raycast(&self, ray: &Ray) -> Vec<Intersection> {
        let mut hits = Vec::new();
        if self.indices.is_empty()
            || !ray.intersects_sphere(&self.bounding_sphere())
            || !ray.intersects_box(&self.bounding_box())
        {
            return hits;
        }

        let faces_per_chunk = self.chunk.num_triangles();
        for (face, tri) in self.indices.chunks_exact(3).enumerate() {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| self.vertex(i));
            if let Some(point) = ray.intersect_triangle(a, b, c) {
                hits.push(Intersection {
                    distance: ray.origin.distance(point),
                    point,
                    chunk_idx: face / faces_per_chunk,
                });
            }
        }
        hits
    }

    fn bounding_box(&self) -> Aabb {
        let mut bbox = Aabb::empty();
        for p in self.positions.chunks_exact(3) {
            bbox.expand_by_point(Vec3::from_slice(p));
        }
        bbox
    }

    fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::from_flat(&self.positions)
    }
}

/// Collision mesh for two-color cylinders: each item is split at its midpoint
/// into chunks `2 * i` (begin half) and `2 * i + 1` (end half).
#[derive(Debug, Clone)]
pub struct TwoColorCylinderCollision {
    mesh: ChunkedMesh,
    count: usize,
}

impl TwoColorCylinderCollision {
    pub fn new(count: usize, radial: u32) -> Self {
        Self {
            mesh: ChunkedMesh::new(BaseMesh::cylinder(radial.max(3), 2, true), 2 * count),
            count,
        }
    }

    pub fn set_item(&mut self, idx: usize, begin: Vec3, end: Vec3, radius: f32) -> Result<()> {
        if idx >= self.count {
            return Err(MiewError::out_of_range(idx, self.count));
        }
        let center = begin.lerp(end, 0.5);
        let half = cylinder_matrix(begin, center, radius);
        self.mesh.set_chunk(2 * idx, &half, Vec3::ZERO)?;
        self.mesh.set_chunk(2 * idx + 1, &half, center - begin)
    }

    pub fn mesh(&self) -> &ChunkedMesh {
        &self.mesh
    }
}

impl Collision for TwoColorCylinderCollision {
    fn raycast(&self, ray: &Ray) -> Vec<Intersection> {
        self.mesh.raycast(ray)
    }

    fn bounding_box(&self) -> Aabb {
        self.mesh.bounding_box()
    }

    fn bounding_sphere(&self) -> BoundingSphere {
        self.mesh.bounding_sphere()
    }
}

/// Analytic spheres, one chunk each. Unset spheres are never hit.
#[derive(Debug, Clone)]
pub struct SphereCollision {
    spheres: Vec<Option<(Vec3, f32)>>,
}

impl SphereCollision {
    pub fn new(count: usize) -> Self {
        Self {
            spheres: vec![None; count],
        }
    }

    pub fn set_sphere(&mut self, idx: usize, center: Vec3, radius: f32) -> Result<()> {
        let count = self.spheres.len();
        let slot = self
            .spheres
            .get_mut(idx)
            .ok_or_else(|| MiewError::out_of_range(idx, count))?;
        *slot = Some((center, radius));
        Ok(())
    }

    fn centers(&self) -> impl Iterator<Item = Vec3> + Clone + '_ {
        self.spheres.iter().flatten().map(|&(c, _)| c)
    }
}

impl Collision for SphereCollision {
    fn raycast(&self, ray: &Ray) -> Vec<Intersection> {
        self.spheres
            .iter()
            .enumerate()
            .filter_map(|(chunk_idx, sphere)| {
                let (center, radius) = (*sphere)?;
                let point = ray.intersect_sphere(center, radius)?;
                Some(Intersection {
                    distance: ray.origin.distance(point),
                    point,
                    chunk_idx,
                })
            })
            .collect()
    }

    /// Box around the sphere centers.
    fn bounding_box(&self) -> Aabb {
        let mut bbox = Aabb::empty();
        for c in self.centers() {
            bbox.expand_by_point(c);
        }
        bbox
    }

    fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::from_points(self.centers())
    }
}
