//! Points, directions and the closed-form intersections of straight lines
//! with the solids used by the projectors: boxes, unit balls and half-spaces.
//!
//! Everything here works in plain `f32` millimetres: see `units::plain`.

mod aabb;
mod quadric;

pub use aabb::clip_segment;
pub use quadric::{unit_ball_interval, half_space_interval, Interval};

use units::plain::Lengthf32;

pub type Point  = nalgebra::Point3  <Lengthf32>;
pub type Vector = nalgebra::Vector3 <Lengthf32>;
pub type Matrix = nalgebra::Matrix3 <Lengthf32>;
pub type Rotation = nalgebra::Rotation3<Lengthf32>;

/// Tolerance used when checking that a matrix is orthonormal
pub const ORTHONORMAL_TOLERANCE: f32 = 1e-4;

/// Do the columns of `m` have unit length and are they mutually orthogonal?
pub fn is_orthonormal(m: &Matrix) -> bool {
    let deviation = m.transpose() * m - Matrix::identity();
    m.iter().all(|x| x.is_finite()) &&
        deviation.iter().all(|x| x.abs() < ORTHONORMAL_TOLERANCE)
}

/// Rotation by `angle` (radians) about the y-axis: the axis of rotation of the
/// circular trajectory and the axis about which phantom ellipsoids are tilted.
pub fn rotation_about_y(angle: f32) -> Rotation {
    Rotation::from_axis_angle(&Vector::y_axis(), angle)
}
