//! Template meshes shared by every instance of a batch.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

/// An indexed triangle mesh in local coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseMesh {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl BaseMesh {
    /// Unit cylinder of radius 1 and height 1 centered on the origin along `y`.
    ///
    /// Rings run from `y = -0.5` up to `y = 0.5`, `radial` vertices each with
    /// no duplicated seam. Closed cylinders get a fan cap on each end.
    #[must_use]
    pub fn cylinder(radial: u32, height_segments: u32, open_ended: bool) -> Self {
        let radial = radial.max(3);
        let height_segments = height_segments.max(1);
        let rings = height_segments + 1;
        let caps = if open_ended { 0 } else { 2 };

        let n_vertices = (rings * radial + caps * (radial + 1)) as usize;
        let n_faces = ((2 * height_segments + caps) * radial) as usize;
        let mut mesh = Self {
            positions: Vec::with_capacity(n_vertices * 3),
            normals: Vec::with_capacity(n_vertices * 3),
            indices: Vec::with_capacity(n_faces * 3),
        };

        for y in 0..rings {
            let base = y * radial;
            if y != height_segments {
                for i in 0..radial {
                    let v1 = base + i;
                    let v2 = base + radial + i;
                    let v3 = base + radial + (i + 1) % radial;
                    let v4 = base + (i + 1) % radial;
                    mesh.indices.extend_from_slice(&[v1, v4, v2, v2, v4, v3]);
                }
            }

            let v = y as f32 / height_segments as f32;
            for x in 0..radial {
                let (sin, cos) = (x as f32 / radial as f32 * TAU).sin_cos();
                mesh.push(Vec3::new(sin, v - 0.5, cos), Vec3::new(sin, 0.0, cos));
            }
        }

        if !open_ended {
            mesh.push_cap(radial, (height_segments * radial) as usize, 0.5);
            mesh.push_cap(radial, 0, -0.5);
        }
        mesh
    }

    /// Copies the ring starting at `ring_start` with an axial normal and fans
    /// it around a center vertex at height `y`.
    fn push_cap(&mut self, radial: u32, ring_start: usize, y: f32) {
        let normal = Vec3::new(0.0, y.signum(), 0.0);
        let start = self.num_vertices() as u32;
        let center = start + radial;
        for i in 0..radial {
            let src = (ring_start + i as usize) * 3;
            let p = Vec3::from_slice(&self.positions[src..src + 3]);
            self.push(p, normal);

            let next = start + (i + 1) % radial;
            if y > 0.0 {
                self.indices.extend_from_slice(&[start + i, next, center]);
            } else {
                self.indices.extend_from_slice(&[next, start + i, center]);
            }
        }
        self.push(Vec3::new(0.0, y, 0.0), normal);
    }

    /// Unit sphere with `width` segments around and `height` from pole to pole.
    #[must_use]
    pub fn uv_sphere(width: u32, height: u32) -> Self {
        let width = width.max(3);
        let height = height.max(2);
        let mut mesh = Self::default();

        for iy in 0..=height {
            let v = iy as f32 / height as f32;
            for ix in 0..=width {
                let u = ix as f32 / width as f32;
                let p = Vec3::new(
                    -(u * TAU).cos() * (v * PI).sin(),
                    (v * PI).cos(),
                    (u * TAU).sin() * (v * PI).sin(),
                );
                mesh.push(p, p);
            }
        }

        let row = width + 1;
        for iy in 0..height {
            for ix in 0..width {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    mesh.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height - 1 {
                    mesh.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        mesh
    }

    /// A 2x2 quad in the `xy` plane facing `+z`, used for impostor sprites.
    #[must_use]
    pub fn quad() -> Self {
        let mut mesh = Self::default();
        for p in [
            Vec3::new(-1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
        ] {
            mesh.push(p, Vec3::Z);
        }
        mesh.indices = vec![0, 2, 1, 2, 3, 1];
        mesh
    }

    fn push(&mut self, p: Vec3, n: Vec3) {
        self.positions.extend_from_slice(&p.to_array());
        self.normals.extend_from_slice(&n.to_array());
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[i * 3..i * 3 + 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(mesh: &BaseMesh) {
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        assert_eq!(mesh.indices.len() % 3, 0);
        let n = mesh.num_vertices() as u32;
        assert!(mesh.indices.iter().all(|&i| i < n));
    }

    /// Every triangle winds counter-clockwise seen from outside.
    fn assert_outward(mesh: &BaseMesh) {
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|k| mesh.position(tri[k] as usize));
            let face = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(face.dot(centroid) > 0.0, "{tri:?}");
        }
    }

    #[test]
    fn test_open_cylinder_counts() {
        let mesh = BaseMesh::cylinder(6, 2, true);
        assert_valid(&mesh);
        assert_eq!(mesh.num_vertices(), 3 * 6);
        assert_eq!(mesh.num_triangles(), 2 * 2 * 6);
        assert_outward(&mesh);
        for i in 0..mesh.num_vertices() {
            let p = mesh.position(i);
            assert!((p.x * p.x + p.z * p.z - 1.0).abs() < 1e-5);
            assert!(p.y.abs() <= 0.5);
        }
    }

    #[test]
    fn test_closed_cylinder_counts() {
        let mesh = BaseMesh::cylinder(8, 1, false);
        assert_valid(&mesh);
        assert_eq!(mesh.num_vertices(), 2 * 8 + 2 * 9);
        assert_eq!(mesh.num_triangles(), (2 + 2) * 8);
        assert_outward(&mesh);
    }

    #[test]
    fn test_sphere() {
        let mesh = BaseMesh::uv_sphere(8, 4);
        assert_valid(&mesh);
        assert_eq!(mesh.num_vertices(), 9 * 5);
        // poles contribute one triangle per segment, other rows two
        assert_eq!(mesh.num_triangles(), 8 * (2 * 4 - 2));
        for i in 0..mesh.num_vertices() {
            assert!((mesh.position(i).length() - 1.0).abs() < 1e-5);
        }
        assert_outward(&mesh);
    }

    #[test]
    fn test_quad() {
        let mesh = BaseMesh::quad();
        assert_valid(&mesh);
        assert_eq!(mesh.num_triangles(), 2);
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|k| mesh.position(tri[k] as usize));
            assert!((b - a).cross(c - a).z > 0.0);
        }
    }
}
