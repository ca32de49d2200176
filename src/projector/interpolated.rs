//! Ray marching with trilinear interpolation.
//!
//! The part of the segment inside the volume's bounding box is divided into
//! `N = ceil(length / step)` equal sub-steps, and the interpolated attenuation
//! at the midpoint of each sub-step is weighted by the sub-step's length
//! (the midpoint rule). Samples beyond the outermost voxel centres take the
//! value of the nearest edge voxel.

use ndarray::ArrayView3;

use geometry::{clip_segment, Point, Vector};
use units::plain::{Intensityf32, Lengthf32};

use crate::error::{Error, Result};
use crate::grid::VolumeGeometry;
use crate::image::Image;

use super::ForwardProjector;

/// Default sampling step, as a fraction of the smallest voxel spacing
pub const DEFAULT_STEP_FRACTION: f32 = 0.5;

pub struct Trilinear<'a> {
    geometry: &'a VolumeGeometry,
    volume: ArrayView3<'a, Intensityf32>,
    step: Lengthf32,
}

impl<'a> Trilinear<'a> {

    pub fn new(image: &'a Image, step_fraction: f32) -> Result<Self> {
        check_step_fraction(step_fraction)?;
        let geometry = image.geometry();
        let step = step_fraction * geometry.spacing().min();
        Ok(Self { geometry, volume: image.as_array()?, step })
    }

    /// Clamp-to-edge trilinear interpolation at buffer-relative continuous
    /// index `c` (voxel centres at integer positions)
    fn sample(&self, c: &Vector) -> Intensityf32 {
        let [nx, ny, nz] = self.geometry.size();
        let (x0, x1, fx) = corners(c.x, nx);
        let (y0, y1, fy) = corners(c.y, ny);
        let (z0, z1, fz) = corners(c.z, nz);
        let v = &self.volume;
        let lerp = |a: f32, b: f32, f: f32| a + (b - a) * f;
        let along_x = |y, z| lerp(v[[z, y, x0]], v[[z, y, x1]], fx);
        let along_y = |z| lerp(along_x(y0, z), along_x(y1, z), fy);
        lerp(along_y(z0), along_y(z1), fz)
    }
}

/// Smallest accepted step, as a fraction of the finest spacing. Bounds the
/// number of samples per ray by the box diagonal over this step.
pub const MIN_STEP_FRACTION: f32 = 1e-3;

pub(crate) fn check_step_fraction(step_fraction: f32) -> Result<()> {
    if step_fraction.is_finite() && step_fraction >= MIN_STEP_FRACTION { Ok(()) }
    else { Err(Error::InvalidStepFraction(step_fraction)) }
}

/// Neighbouring indices along one axis of length `n`, and the weight of the
/// upper one
#[inline]
fn corners(c: Lengthf32, n: usize) -> (usize, usize, f32) {
    let c = c.clamp(0.0, (n - 1) as Lengthf32);
    let lower = (c.floor() as usize).min(n - 1);
    let upper = (lower + 1).min(n - 1);
    (lower, upper, c - lower as Lengthf32)
}

impl ForwardProjector for Trilinear<'_> {
    fn line_integral(&self, source: &Point, target: &Point) -> Intensityf32 {
        let g = self.geometry;
        let p1 = g.to_box_frame(source);
        let p2 = g.to_box_frame(target);
        let (t_in, t_out) = match clip_segment(&g.half_extents(), &p1, &p2) {
            None => return 0.0,
            Some(interval) => interval,
        };
        let direction = (p2 - p1).normalize();
        let length = t_out - t_in;
        let n_steps = (length / self.step).ceil().max(1.0) as usize;
        let h = length / n_steps as Lengthf32;
        let half_voxel = Vector::repeat(0.5);
        let total: Intensityf32 = (0..n_steps)
            .map(|k| {
                let q = p1 + direction * (t_in + (k as Lengthf32 + 0.5) * h);
                self.sample(&(g.box_frame_to_voxel_coordinates(&q) - half_voxel))
            })
            .sum();
        total * h
    }
}
