//! Instanced two-color cylinders, used for bonds.
//!
//! Each instance carries its placement as three matrix rows and one color per
//! half. Picking and opacity work on chunks: chunk `2 * i` is the half at the
//! begin point of instance `i`, chunk `2 * i + 1` the half at its end.

use glam::{Mat4, Vec3};
use miew_core::{Aabb, BoundingSphere, MiewError, Result};

use crate::base_mesh::BaseMesh;
use crate::collision::{Collision, TwoColorCylinderCollision};
use crate::placement::{cylinder_matrix, inverse_or_zero, matrix_rows};
use crate::ray::{Intersection, Ray};

const ROW_SIZE: usize = 4;
const COLOR_SIZE: usize = 3;

/// Radial segments of the collision cylinders.
const COLLISION_SEGMENTS: u32 = 3;

/// Written to the first color channel of a half that should not be drawn.
pub const HIDDEN_HALF: f32 = -0.5;

/// Which halves of an instance a subset keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct HalfSelection {
    first: bool,
    second: bool,
}

/// Groups sorted chunk indices into instances.
///
/// An even chunk selects the begin half, and the end half too when the next
/// chunk is its partner. An odd chunk on its own selects only the end half.
fn cylinder_info(chunks: &[usize]) -> (Vec<usize>, Vec<HalfSelection>) {
    let mut sorted = chunks.to_vec();
    sorted.sort_unstable();

    let mut instances = Vec::with_capacity(sorted.len());
    let mut halves = Vec::with_capacity(sorted.len());
    let mut i = 0;
    while i < sorted.len() {
        let val = sorted[i];
        let mut sel = HalfSelection::default();
        if val % 2 == 0 {
            sel.first = true;
            sel.second = sorted.get(i + 1) == Some(&(val + 1));
            if sel.second {
                i += 1;
            }
        } else {
            sel.second = true;
        }
        instances.push(val / 2);
        halves.push(sel);
        i += 1;
    }
    (instances, halves)
}

/// Copies the `item_size` slices of `src` at `indices` into a new buffer.
fn gather(src: &[f32], indices: &[usize], item_size: usize) -> Vec<f32> {
    indices
        .iter()
        .flat_map(|&i| &src[i * item_size..(i + 1) * item_size])
        .copied()
        .collect()
}

/// A batch of two-color cylinder instances.
#[derive(Debug, Clone)]
pub struct InstancedCylinders {
    base: BaseMesh,
    count: usize,
    mat_vectors: [Vec<f32>; 3],
    inv_mat_vectors: Option<[Vec<f32>; 3]>,
    color1: Vec<f32>,
    color2: Vec<f32>,
    alpha: Vec<f32>,
    collision: Option<TwoColorCylinderCollision>,
    bounds: Option<(Aabb, BoundingSphere)>,
}

impl InstancedCylinders {
    /// Allocates `count` instances.
    ///
    /// With `z_sprites` the template is a screen quad and the inverse
    /// placement rows are kept as well, otherwise it is a cylinder with
    /// `poly` radial segments (at least 3).
    pub fn new(count: usize, poly: u32, z_sprites: bool, open_ended: bool) -> Self {
        let base = if z_sprites {
            BaseMesh::quad()
        } else {
            BaseMesh::cylinder(poly.max(3), 2, open_ended)
        };
        let mut cylinders = Self::allocate(base, count, z_sprites);
        cylinders.collision = Some(TwoColorCylinderCollision::new(count, COLLISION_SEGMENTS));
        log::debug!("allocated {count} instanced cylinders");
        cylinders
    }

    fn allocate(base: BaseMesh, count: usize, z_sprites: bool) -> Self {
        let rows = || [0, 1, 2].map(|_| vec![0.0; count * ROW_SIZE]);
        Self {
            base,
            count,
            mat_vectors: rows(),
            inv_mat_vectors: z_sprites.then(rows),
            color1: vec![0.0; count * COLOR_SIZE],
            color2: vec![0.0; count * COLOR_SIZE],
            alpha: vec![1.0; count],
            collision: None,
            bounds: None,
        }
    }

    fn check(&self, idx: usize) -> Result<()> {
        if idx < self.count {
            Ok(())
        } else {
            Err(MiewError::out_of_range(idx, self.count))
        }
    }

    /// Places instance `idx` between `begin` and `end`.
    pub fn set_item(&mut self, idx: usize, begin: Vec3, end: Vec3, radius: f32) -> Result<()> {
        self.check(idx)?;
        let matrix = cylinder_matrix(begin, end, radius);
        if let Some(collision) = self.collision.as_mut() {
            collision.set_item(idx, begin, end, radius)?;
        }

        let offset = idx * ROW_SIZE;
        write_rows(&mut self.mat_vectors, offset, &matrix);
        if let Some(inv) = self.inv_mat_vectors.as_mut() {
            write_rows(inv, offset, &inverse_or_zero(&matrix));
        }
        self.bounds = None;
        Ok(())
    }

    pub fn set_color(&mut self, idx: usize, color1: Vec3, color2: Vec3) -> Result<()> {
        self.check(idx)?;
        let at = idx * COLOR_SIZE..(idx + 1) * COLOR_SIZE;
        self.color1[at.clone()].copy_from_slice(&color1.to_array());
        self.color2[at].copy_from_slice(&color2.to_array());
        Ok(())
    }

    /// Sets the opacity of the instances owning `chunks`.
    pub fn set_opacity(&mut self, chunks: &[usize], value: f32) -> Result<()> {
        for &chunk in chunks {
            self.check(chunk / 2)?;
        }
        for &chunk in chunks {
            self.alpha[chunk / 2] = value;
        }
        Ok(())
    }

    /// A new batch holding the instances of `chunks`.
    ///
    /// A half that was not asked for gets [`HIDDEN_HALF`] in the first channel
    /// of its color. Opacity starts over at 1 and the subset shares this
    /// batch's bounds but has no collision geometry of its own.
    pub fn get_subset(&self, chunks: &[usize]) -> Result<Self> {
        for &chunk in chunks {
            self.check(chunk / 2)?;
        }
        let (instances, halves) = cylinder_info(chunks);

        let mut subset = Self::allocate(
            self.base.clone(),
            instances.len(),
            self.inv_mat_vectors.is_some(),
        );
        subset.mat_vectors = self.mat_vectors.each_ref().map(|v| gather(v, &instances, ROW_SIZE));
        if let Some(inv) = &self.inv_mat_vectors {
            subset.inv_mat_vectors = Some(inv.each_ref().map(|v| gather(v, &instances, ROW_SIZE)));
        }
        subset.color1 = gather(&self.color1, &instances, COLOR_SIZE);
        subset.color2 = gather(&self.color2, &instances, COLOR_SIZE);
        for (i, sel) in halves.iter().enumerate() {
            if !sel.first {
                subset.color1[i * COLOR_SIZE] = HIDDEN_HALF;
            }
            if !sel.second {
                subset.color2[i * COLOR_SIZE] = HIDDEN_HALF;
            }
        }
        subset.bounds = Some((self.bounding_box(), self.bounding_sphere()));
        Ok(subset)
    }

    /// Caches the bounds of the collision geometry.
    pub fn finalize(&mut self) {
        self.bounds = Some((self.bounding_box(), self.bounding_sphere()));
    }

    pub fn bounding_box(&self) -> Aabb {
        match (&self.bounds, &self.collision) {
            (Some((bbox, _)), _) => *bbox,
            (None, Some(collision)) => collision.bounding_box(),
            (None, None) => Aabb::empty(),
        }
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        match (&self.bounds, &self.collision) {
            (Some((_, sphere)), _) => *sphere,
            (None, Some(collision)) => collision.bounding_sphere(),
            (None, None) => BoundingSphere::default(),
        }
    }

    /// Hits against the collision halves; `chunk_idx` is a half index.
    pub fn raycast(&self, ray: &Ray) -> Vec<Intersection> {
        self.collision
            .as_ref()
            .map(|c| c.raycast(ray))
            .unwrap_or_default()
    }

    pub fn instance_count(&self) -> usize {
        self.count
    }

    pub fn base_mesh(&self) -> &BaseMesh {
        &self.base
    }

    pub fn uses_z_sprites(&self) -> bool {
        self.inv_mat_vectors.is_some()
    }

    pub fn alpha(&self) -> &[f32] {
        &self.alpha
    }

    /// Per-instance attribute by its shader name.
    pub fn attribute(&self, name: &str) -> Option<&[f32]> {
        let inv = self.inv_mat_vectors.as_ref();
        match name {
            "matVector1" => Some(&self.mat_vectors[0]),
            "matVector2" => Some(&self.mat_vectors[1]),
            "matVector3" => Some(&self.mat_vectors[2]),
            "invmatVector1" => inv.map(|v| v[0].as_slice()),
            "invmatVector2" => inv.map(|v| v[1].as_slice()),
            "invmatVector3" => inv.map(|v| v[2].as_slice()),
            "color" => Some(&self.color1),
            "color2" => Some(&self.color2),
            "alphaColor" => Some(&self.alpha),
            _ => None,
        }
    }

    /// [`Self::attribute`] as raw bytes for upload.
    pub fn attribute_bytes(&self, name: &str) -> Option<&[u8]> {
        self.attribute(name).map(bytemuck::cast_slice)
    }
}

fn write_rows(rows: &mut [Vec<f32>; 3], offset: usize, matrix: &Mat4) {
    for (dst, row) in rows.iter_mut().zip(matrix_rows(matrix)) {
        dst[offset..offset + ROW_SIZE].copy_from_slice(&row.to_array());
    }
}
