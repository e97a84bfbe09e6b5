//! Placement transforms for instanced primitives.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat3, Mat4, Vec3, Vec4};

/// Rotation whose z axis points from `target` to `eye`, with `up` as the
/// preferred y direction.
///
/// When `up` is parallel to the view direction the direction is nudged by
/// `1e-4` so a frame still exists.
#[must_use]
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat3 {
    let mut z = eye - target;
    if z.length_squared() == 0.0 {
        z.z = 1.0;
    }
    z = z.normalize();

    let mut x = up.cross(z);
    if x.length_squared() == 0.0 {
        if up.z.abs() == 1.0 {
            z.x += 0.0001;
        } else {
            z.z += 0.0001;
        }
        z = z.normalize();
        x = up.cross(z);
    }
    let x = x.normalize();
    let y = z.cross(x);
    Mat3::from_cols(x, y, z)
}

/// Maps the unit cylinder (radius 1, height 1, centered, along +y) onto the
/// segment `begin..end` with the given radius.
///
/// Local `+y` ends up at `begin` and `-y` at `end`.
#[must_use]
pub fn cylinder_matrix(begin: Vec3, end: Vec3, radius: f32) -> Mat4 {
    let center = begin.lerp(end, 0.5);
    let scale = Mat4::from_scale(Vec3::new(radius, begin.distance(end), radius));
    let rotation = Mat4::from_mat3(look_at(center, end, Vec3::Y));
    let mut m = rotation * Mat4::from_rotation_x(FRAC_PI_2) * scale;
    m.w_axis = center.extend(1.0);
    m
}

/// The first three rows of an affine matrix, as uploaded to instance attributes.
#[must_use]
pub fn matrix_rows(m: &Mat4) -> [Vec4; 3] {
    [m.row(0), m.row(1), m.row(2)]
}

/// Inverse transpose of the upper 3x3 block; zero for singular matrices.
#[must_use]
pub fn normal_matrix(m: &Mat4) -> Mat3 {
    let m3 = Mat3::from_mat4(*m);
    if m3.determinant() == 0.0 {
        return Mat3::ZERO;
    }
    m3.inverse().transpose()
}

/// Inverse of `m`; zero for singular matrices.
#[must_use]
pub fn inverse_or_zero(m: &Mat4) -> Mat4 {
    if m.determinant() == 0.0 {
        return Mat4::ZERO;
    }
    m.inverse()
}
