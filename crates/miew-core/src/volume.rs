//! Dense voxel volumes.
//!
//! A [`Volume`] stores scalar or small-vector samples on a regular grid. The
//! layout is point by point along X, row by row along Y and plane by plane
//! along Z, so `direct_idx(x, y, z) = item_size * (x + dim_x * (y + dim_y * z))`.
//!
//! Hot-path accessors do not bounds-check in release builds; callers clamp
//! coordinates to `[0, dim)` themselves.

use glam::Vec3;

use crate::bounds::Aabb;
use crate::error::{MiewError, Result};

/// A dense 3D field of `f32` samples.
#[derive(Debug, Clone)]
pub struct Volume {
    dims: [usize; 3],
    bbox: Aabb,
    item_size: usize,
    row_elements: usize,
    plane_elements: usize,
    data: Vec<f32>,
}

impl Volume {
    /// Allocates a zero-filled volume.
    ///
    /// Each dimension is raised to at least 1. `item_size` must be 1, 2 or 3.
    pub fn new(dims: [usize; 3], bbox: Aabb, item_size: usize) -> Result<Self> {
        let total = Self::total_elements(dims, item_size)?;
        Self::from_data(dims, bbox, item_size, vec![0.0; total])
    }

    /// Wraps existing samples, checking that their length matches the grid.
    pub fn from_data(dims: [usize; 3], bbox: Aabb, item_size: usize, data: Vec<f32>) -> Result<Self> {
        let total = Self::total_elements(dims, item_size)?;
        if data.len() != total {
            return Err(MiewError::SizeMismatch {
                expected: total,
                actual: data.len(),
            });
        }
        let dims = dims.map(|d| d.max(1));
        let row_elements = item_size * dims[0];
        let plane_elements = row_elements * dims[1];
        Ok(Self {
            dims,
            bbox,
            item_size,
            row_elements,
            plane_elements,
            data,
        })
    }

    fn total_elements(dims: [usize; 3], item_size: usize) -> Result<usize> {
        if !(1..=3).contains(&item_size) {
            return Err(MiewError::InvalidVectorSize(item_size));
        }
        Ok(dims.iter().map(|d| (*d).max(1)).product::<usize>() * item_size)
    }

    /// Number of samples along each axis.
    #[must_use]
    pub fn dimensions(&self) -> [usize; 3] {
        self.dims
    }

    /// Box spanned by the extreme samples.
    #[must_use]
    pub fn bbox(&self) -> Aabb {
        self.bbox
    }

    /// Components per sample (1 for scalar fields, 3 for vector fields).
    #[must_use]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Raw samples.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Raw samples, for in-place accumulation.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the volume and returns its samples.
    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Offset between neighbouring samples along X.
    #[must_use]
    pub fn stride_x(&self) -> usize {
        self.item_size
    }

    /// Offset between neighbouring rows.
    #[must_use]
    pub fn stride_y(&self) -> usize {
        self.row_elements
    }

    /// Offset between neighbouring planes.
    #[must_use]
    pub fn stride_z(&self) -> usize {
        self.plane_elements
    }

    /// Flat index of the first component of sample `(x, y, z)`.
    #[inline]
    #[must_use]
    pub fn direct_idx(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(
            x < self.dims[0] && y < self.dims[1] && z < self.dims[2],
            "voxel ({x}, {y}, {z}) outside {:?}",
            self.dims
        );
        x * self.item_size + y * self.row_elements + z * self.plane_elements
    }

    /// Distance between neighbouring samples along each axis.
    ///
    /// Axes with a single sample report zero. An inverted box gives negative sizes.
    #[must_use]
    pub fn cell_size(&self) -> Vec3 {
        let size = self.bbox.max - self.bbox.min;
        let step = |extent: f32, dim: usize| {
            if dim > 1 {
                extent / (dim - 1) as f32
            } else {
                0.0
            }
        };
        Vec3::new(
            step(size.x, self.dims[0]),
            step(size.y, self.dims[1]),
            step(size.z, self.dims[2]),
        )
    }

    /// First component of a sample.
    #[inline]
    #[must_use]
    pub fn value(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[self.direct_idx(x, y, z)]
    }

    /// Overwrites the first component of a sample.
    #[inline]
    pub fn set_value(&mut self, x: usize, y: usize, z: usize, value: f32) {
        let idx = self.direct_idx(x, y, z);
        self.data[idx] = value;
    }

    /// Adds to the first component of a sample.
    #[inline]
    pub fn add_value(&mut self, x: usize, y: usize, z: usize, value: f32) {
        let idx = self.direct_idx(x, y, z);
        self.data[idx] += value;
    }

    /// All components of a sample, zero-padded to three.
    #[inline]
    #[must_use]
    pub fn vec3(&self, x: usize, y: usize, z: usize) -> Vec3 {
        let idx = self.direct_idx(x, y, z);
        let mut v = [0.0; 3];
        v[..self.item_size].copy_from_slice(&self.data[idx..idx + self.item_size]);
        Vec3::from_array(v)
    }

    /// Overwrites all components of a sample; extra components of `v` are ignored.
    #[inline]
    pub fn set_vec3(&mut self, x: usize, y: usize, z: usize, v: Vec3) {
        let idx = self.direct_idx(x, y, z);
        let n = self.item_size;
        self.data[idx..idx + n].copy_from_slice(&v.to_array()[..n]);
    }

    /// Adds to all components of a sample; extra components of `v` are ignored.
    #[inline]
    pub fn add_vec3(&mut self, x: usize, y: usize, z: usize, v: Vec3) {
        let idx = self.direct_idx(x, y, z);
        let v = v.to_array();
        for (dst, src) in self.data[idx..idx + self.item_size].iter_mut().zip(v) {
            *dst += src;
        }
    }

    /// Minimum and maximum sample, or `None` for an empty volume.
    #[must_use]
    pub fn value_range(&self) -> Option<(f32, f32)> {
        let mut iter = self.data.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Rescales samples linearly into `[0, 1]`. Constant volumes are left alone.
    pub fn normalize(&mut self) {
        let Some((min, max)) = self.value_range() else {
            return;
        };
        let span = max - min;
        if span == 0.0 || !span.is_finite() {
            return;
        }
        let inv = 1.0 / span;
        for v in &mut self.data {
            *v = (*v - min) * inv;
        }
    }

    /// Builds the field of negated central-difference gradients.
    ///
    /// Neighbours are clamped at the borders, and each axis is scaled by
    /// `-0.5 / cell_size` so the vectors point toward decreasing values.
    /// The result is only meaningful for orthogonal grids. Returns `None`
    /// for vector volumes.
    #[must_use]
    pub fn compute_gradient(&self) -> Option<Volume> {
        if self.item_size != 1 {
            return None;
        }

        let [xs, ys, zs] = self.dims;
        let mut gradient = Volume::new(self.dims, self.bbox, 3).ok()?;

        let cell = self.cell_size();
        let inv = |c: f32| if c > 0.0 { -0.5 / c } else { 0.0 };
        let scale = Vec3::new(inv(cell.x), inv(cell.y), inv(cell.z));

        let src = &self.data;
        let at = |x: usize, y: usize, z: usize| src[x + xs * (y + ys * z)];
        let dst = gradient.data_mut();

        let mut out = 0;
        for z in 0..zs {
            let zm = z.saturating_sub(1);
            let zp = (z + 1).min(zs - 1);
            for y in 0..ys {
                let ym = y.saturating_sub(1);
                let yp = (y + 1).min(ys - 1);
                for x in 0..xs {
                    let xm = x.saturating_sub(1);
                    let xp = (x + 1).min(xs - 1);
                    dst[out] = (at(xp, y, z) - at(xm, y, z)) * scale.x;
                    dst[out + 1] = (at(x, yp, z) - at(x, ym, z)) * scale.y;
                    dst[out + 2] = (at(x, y, zp) - at(x, y, zm)) * scale.z;
                    out += 3;
                }
            }
        }

        Some(gradient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(dims: [usize; 3]) -> Aabb {
        Aabb::from_origin_size(
            Vec3::ZERO,
            Vec3::new(
                (dims[0] - 1) as f32,
                (dims[1] - 1) as f32,
                (dims[2] - 1) as f32,
            ),
        )
    }

    #[test]
    fn test_direct_idx_and_strides() {
        let vol = Volume::new([4, 3, 2], unit_box([4, 3, 2]), 3).unwrap();
        assert_eq!(vol.stride_x(), 3);
        assert_eq!(vol.stride_y(), 12);
        assert_eq!(vol.stride_z(), 36);
        assert_eq!(vol.direct_idx(1, 2, 1), 3 * (1 + 4 * (2 + 3)));
        assert_eq!(vol.data().len(), 4 * 3 * 2 * 3);
    }

    #[test]
    fn test_invalid_item_size() {
        let err = Volume::new([2, 2, 2], unit_box([2, 2, 2]), 4).unwrap_err();
        assert!(matches!(err, MiewError::InvalidVectorSize(4)));
    }

    #[test]
    fn test_from_data_size_mismatch() {
        let err = Volume::from_data([2, 2, 2], unit_box([2, 2, 2]), 1, vec![0.0; 7]).unwrap_err();
        assert!(matches!(
            err,
            MiewError::SizeMismatch {
                expected: 8,
                actual: 7
            }
        ));
    }

    #[test]
    fn test_cell_size() {
        let bbox = Aabb::from_origin_size(Vec3::ZERO, Vec3::new(2.0, 4.0, 0.0));
        let vol = Volume::new([5, 3, 1], bbox, 1).unwrap();
        assert_eq!(vol.cell_size(), Vec3::new(0.5, 2.0, 0.0));
    }

    #[test]
    fn test_vector_accessors() {
        let mut vol = Volume::new([2, 2, 2], unit_box([2, 2, 2]), 3).unwrap();
        vol.add_vec3(1, 1, 0, Vec3::new(1.0, 2.0, 3.0));
        vol.add_vec3(1, 1, 0, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(vol.vec3(1, 1, 0), Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(vol.vec3(0, 0, 0), Vec3::ZERO);
    }

    #[test]
    fn test_linear_gradient() {
        // f = 2x on a unit grid: negated gradient is (-2, 0, 0) in the interior
        let dims = [5, 4, 3];
        let mut vol = Volume::new(dims, unit_box(dims), 1).unwrap();
        for z in 0..3 {
            for y in 0..4 {
                for x in 0..5 {
                    vol.set_value(x, y, z, 2.0 * x as f32);
                }
            }
        }
        let grad = vol.compute_gradient().unwrap();
        assert_eq!(grad.item_size(), 3);
        assert_eq!(grad.vec3(2, 1, 1), Vec3::new(-2.0, 0.0, 0.0));
        // one-sided at the border: (f(1) - f(0)) * -0.5
        assert_eq!(grad.vec3(0, 0, 0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_gradient_of_vector_field() {
        let vol = Volume::new([2, 2, 2], unit_box([2, 2, 2]), 3).unwrap();
        assert!(vol.compute_gradient().is_none());
    }

    #[test]
    fn test_normalize() {
        let mut vol =
            Volume::from_data([2, 1, 1], unit_box([2, 1, 1]), 1, vec![-1.0, 3.0]).unwrap();
        vol.normalize();
        assert_eq!(vol.data(), &[0.0, 1.0]);

        let mut flat = Volume::from_data([2, 1, 1], unit_box([2, 1, 1]), 1, vec![2.0, 2.0]).unwrap();
        flat.normalize();
        assert_eq!(flat.data(), &[2.0, 2.0]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside")]
    fn test_out_of_range_debug_assert() {
        let vol = Volume::new([2, 2, 2], unit_box([2, 2, 2]), 1).unwrap();
        let _ = vol.direct_idx(2, 0, 0);
    }
}
