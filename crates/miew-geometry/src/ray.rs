//! Rays and the intersection tests used for picking.

use glam::Vec3;
use miew_core::{Aabb, BoundingSphere};

/// A half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// A ray hit on a pickable item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Distance from the ray origin.
    pub distance: f32,
    /// World position of the hit.
    pub point: Vec3,
    /// Index of the chunk (half-cylinder, sphere) that was hit.
    pub chunk_idx: usize,
}

impl Ray {
    /// Creates a ray; `direction` is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Squared distance from `p` to the closest point of the ray.
    pub fn distance_sq_to_point(&self, p: Vec3) -> f32 {
        let t = (p - self.origin).dot(self.direction).max(0.0);
        self.at(t).distance_squared(p)
    }

    /// Nearest point where the ray enters the sphere, or leaves it when the
    /// origin is inside.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<Vec3> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let h = b * b - c;
        if h < 0.0 {
            return None;
        }
        let sqrt_h = h.sqrt();
        let (t0, t1) = (-b - sqrt_h, -b + sqrt_h);
        if t1 < 0.0 {
            return None;
        }
        Some(self.at(if t0 < 0.0 { t1 } else { t0 }))
    }

    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.distance_sq_to_point(sphere.center) <= sphere.radius * sphere.radius
    }

    /// Slab test against an axis-aligned box.
    pub fn intersects_box(&self, bbox: &Aabb) -> bool {
        if bbox.is_empty() {
            return false;
        }
        let inv = self.direction.recip();
        let t0 = (bbox.min - self.origin) * inv;
        let t1 = (bbox.max - self.origin) * inv;
        let near = t0.min(t1).max_element();
        let far = t0.max(t1).min_element();
        far >= near.max(0.0)
    }

    /// Two-sided Moller-Trumbore test; returns the hit point.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
        let edge1 = b - a;
        let edge2 = c - a;
        let h = self.direction.cross(edge2);
        let det = edge1.dot(h);
        if det.abs() < 1e-10 {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(h) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        (t >= 0.0).then(|| self.at(t))
    }
}

/// Sorts hits front to back.
pub fn sort_by_distance(hits: &mut [Intersection]) {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}
