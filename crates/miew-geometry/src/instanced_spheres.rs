//! Instanced spheres, used for atoms. One chunk per instance.

use glam::Vec3;
use miew_core::{Aabb, BoundingSphere, MiewError, Result};

use crate::base_mesh::BaseMesh;
use crate::collision::{Collision, SphereCollision};
use crate::ray::{Intersection, Ray};

const OFFSET_SIZE: usize = 4;
const COLOR_SIZE: usize = 3;

/// A batch of sphere instances placed by center and radius.
#[derive(Debug, Clone)]
pub struct InstancedSpheres {
    base: BaseMesh,
    count: usize,
    z_sprites: bool,
    offset: Vec<f32>,
    color: Vec<f32>,
    alpha: Vec<f32>,
    collision: SphereCollision,
}

impl InstancedSpheres {
    /// Allocates `count` spheres; the template has `2 * complexity` segments
    /// around and `complexity` from pole to pole, or is a quad with `z_sprites`.
    pub fn new(count: usize, complexity: u32, z_sprites: bool) -> Self {
        let base = if z_sprites {
            BaseMesh::quad()
        } else {
            BaseMesh::uv_sphere(2 * complexity, complexity)
        };
        log::debug!("allocated {count} instanced spheres");
        Self {
            base,
            count,
            z_sprites,
            offset: vec![0.0; count * OFFSET_SIZE],
            color: vec![0.0; count * COLOR_SIZE],
            alpha: vec![1.0; count],
            collision: SphereCollision::new(count),
        }
    }

    fn check(&self, idx: usize) -> Result<()> {
        if idx < self.count {
            Ok(())
        } else {
            Err(MiewError::out_of_range(idx, self.count))
        }
    }

    pub fn set_item(&mut self, idx: usize, center: Vec3, radius: f32) -> Result<()> {
        self.check(idx)?;
        self.collision.set_sphere(idx, center, radius)?;
        let at = idx * OFFSET_SIZE;
        self.offset[at..at + OFFSET_SIZE].copy_from_slice(&center.extend(radius).to_array());
        Ok(())
    }

    pub fn set_color(&mut self, idx: usize, color: Vec3) -> Result<()> {
        self.check(idx)?;
        let at = idx * COLOR_SIZE;
        self.color[at..at + COLOR_SIZE].copy_from_slice(&color.to_array());
        Ok(())
    }

    pub fn set_opacity(&mut self, chunks: &[usize], value: f32) -> Result<()> {
        for &chunk in chunks {
            self.check(chunk)?;
        }
        for &chunk in chunks {
            self.alpha[chunk] = value;
        }
        Ok(())
    }

    /// A new batch holding the spheres at `chunks`, in the given order, with
    /// opacity reset to 1.
    pub fn get_subset(&self, chunks: &[usize]) -> Result<Self> {
        let mut subset = Self {
            base: self.base.clone(),
            count: chunks.len(),
            z_sprites: self.z_sprites,
            offset: Vec::with_capacity(chunks.len() * OFFSET_SIZE),
            color: Vec::with_capacity(chunks.len() * COLOR_SIZE),
            alpha: vec![1.0; chunks.len()],
            collision: SphereCollision::new(chunks.len()),
        };

        for (i, &chunk) in chunks.iter().enumerate() {
            self.check(chunk)?;
            let offset = &self.offset[chunk * OFFSET_SIZE..(chunk + 1) * OFFSET_SIZE];
            subset.offset.extend_from_slice(offset);
            subset
                .color
                .extend_from_slice(&self.color[chunk * COLOR_SIZE..(chunk + 1) * COLOR_SIZE]);
            subset
                .collision
                .set_sphere(i, Vec3::from_slice(offset), offset[3])?;
        }
        Ok(subset)
    }

    pub fn raycast(&self, ray: &Ray) -> Vec<Intersection> {
        self.collision.raycast(ray)
    }

    pub fn bounding_box(&self) -> Aabb {
        self.collision.bounding_box()
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.collision.bounding_sphere()
    }

    pub fn instance_count(&self) -> usize {
        self.count
    }

    pub fn base_mesh(&self) -> &BaseMesh {
        &self.base
    }

    pub fn uses_z_sprites(&self) -> bool {
        self.z_sprites
    }

    pub fn alpha(&self) -> &[f32] {
        &self.alpha
    }

    pub fn attribute(&self, name: &str) -> Option<&[f32]> {
        match name {
            "offset" => Some(&self.offset),
            "color" => Some(&self.color),
            "alphaColor" => Some(&self.alpha),
            _ => None,
        }
    }

    pub fn attribute_bytes(&self, name: &str) -> Option<&[u8]> {
        self.attribute(name).map(bytemuck::cast_slice)
    }
}
