//! Exact path lengths of a ray through the voxels of a volume.
//!
//! The algorithm is centred around two key simplifications:
//!
//! 1. Express the voxel size in terms of the components of the ray's direction
//!    vector. This allows trivial calculation of how far we must move along the
//!    ray before reaching a voxel boundary, in any dimension.
//!
//! 2. Exploit symmetry to simplify dealing with directions: flip axes so that
//!    the direction of the ray has non-negative components. The algorithm can
//!    then assume that all progress is in the positive direction. Any voxel
//!    indices calculated by the algorithm must be flipped back to the original
//!    coordinate system.
//!
//! All of this happens in the box frame of the volume (see `grid`), in which
//! the volume is an axis-aligned box centred on the origin.

use geometry::{clip_segment, Point, Vector};
use units::plain::{Intensityf32, Lengthf32, Weightf32};

use crate::grid::VolumeGeometry;
use crate::image::Image;
use crate::index::{index3_to_1, BoxDim_u, Index3_u};

use super::ForwardProjector;

/// Line integrals through a voxel volume, weighting each voxel's value by the
/// length of ray inside it
pub struct Siddon<'a> {
    geometry: &'a VolumeGeometry,
    data: &'a [Intensityf32],
}

impl<'a> Siddon<'a> {
    pub fn new(image: &'a Image) -> Self {
        Self { geometry: image.geometry(), data: image.data() }
    }
}

impl ForwardProjector for Siddon<'_> {
    fn line_integral(&self, source: &Point, target: &Point) -> Intensityf32 {
        let g = self.geometry;
        let size = g.size();
        WeightsAlongRay::new(g.to_box_frame(source), g.to_box_frame(target), g)
            .map(|(index, weight)| self.data[index3_to_1(index, size)] * weight)
            .sum()
    }
}

/// Distance (in voxels) within which an entry point is considered to lie on a
/// voxel boundary
const BOUNDARY_SNAP: Lengthf32 = 1e-4;

/// An iterator which yields the buffer-relative indices of voxels traversed by
/// a ray segment, along with the distance the segment covers inside each voxel.
pub enum WeightsAlongRay {

    // We are outside of the voxel box: no bookkeeping to be done.
    Outside,

    // We are traversing the voxel box:
    Inside {

        // How far along the ray we must travel before reaching the next voxel
        // boundary in each dimension.
        to_boundary: Vector,

        // Voxel box size, as number of voxels in each dimension
        n_voxels: BoxDim_u,

        // Dimensions of the voxels expressed in ray distance units. Used to
        // reset components of `to_boundary` when they reach 0.
        voxel_size: Vector,

        // The flipped index of the voxel we are in. Must be flipped back
        // before yielding to client.
        index: Index3_u,

        // Which axes were flipped to make all direction components
        // non-negative.
        flipped: [bool; 3],

        // Length of segment left before it ends or leaves the box
        remaining: Lengthf32,
    }
}

impl WeightsAlongRay {

    /// Walk the segment from `p1` to `p2`, both given in the box frame of
    /// `geometry`
    pub fn new(mut p1: Point, mut p2: Point, geometry: &VolumeGeometry) -> Self {
        let half = geometry.half_extents();
        let spacing = geometry.spacing();
        let n_voxels = geometry.size();

        // The box is symmetric about the origin in the box frame, so flipping
        // an axis maps it onto itself.
        let original_direction: Vector = p2 - p1;
        let mut flipped = [false; 3];
        for d in 0..3 {
            if original_direction[d] < 0.0 {
                p1[d] = -p1[d];
                p2[d] = -p2[d];
                flipped[d] = true;
            }
        }

        // Find if and where the segment enters and leaves the voxel box.
        let (t_in, t_out) = match clip_segment(&half, &p1, &p2) {
            None => return Self::Outside,
            Some(interval) => interval,
        };
        let direction: Vector = (p2 - p1).normalize();

        // Entry point measured in voxels from the lower corner of the box:
        // floor(position) = index of voxel.
        let entry: Vector = (p1.coords + direction * t_in + half).component_div(&spacing);

        // Floating-point subtractions which should land on a voxel boundary
        // usually miss very slightly, and floor would then pick the wrong
        // voxel: snap anything very close to a boundary onto it. Rounding can
        // also place the entry point just outside the box: clamp it onto a
        // voxel which exists.
        let mut index = [0; 3];
        let mut to_boundary = Vector::zeros();
        let voxel_size: Vector = spacing.component_div(&direction);
        for d in 0..3 {
            let nearest = entry[d].round();
            let e = if (entry[d] - nearest).abs() < BOUNDARY_SNAP { nearest } else { entry[d] };
            let i = (e.floor().max(0.0) as usize).min(n_voxels[d] - 1);
            index[d] = i;
            // Fraction of the entry voxel already traversed along this axis
            let done = (e - i as Lengthf32).clamp(0.0, 1.0);
            to_boundary[d] = if direction[d] > 0.0 { (1.0 - done) * voxel_size[d] }
                             else                  { Lengthf32::INFINITY };
        }

        Self::Inside { to_boundary, n_voxels, voxel_size, index, flipped, remaining: t_out - t_in }
    }
}

impl Iterator for WeightsAlongRay {

    type Item = (Index3_u, Weightf32);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            // Either the segment missed the box, or we have reached its end or
            // come out of the other side of the box.
            Self::Outside => None,

            Self::Inside { to_boundary, n_voxels, voxel_size, index, flipped, remaining } => {

                // Index of the voxel we are about to cross, in the client's
                // coordinate system
                let mut true_index = *index;
                for d in 0..3 {
                    if flipped[d] { true_index[d] = n_voxels[d] - 1 - index[d]; }
                }

                // Which boundary will be hit next, and how soon; the segment
                // may end first
                let (_, distance) = to_boundary.argmin();
                let step = distance.min(*remaining);
                *remaining -= step;
                *to_boundary -= Vector::repeat(step);

                // Cross every boundary we have reached
                let mut left_box = false;
                for d in 0..3 {
                    if to_boundary[d] <= 0.0 {
                        to_boundary[d] = voxel_size[d];
                        index[d] += 1;
                        left_box |= index[d] >= n_voxels[d];
                    }
                }

                if left_box || *remaining <= 0.0 {
                    *self = Self::Outside
                }

                Some((true_index, step))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};
    use rstest::rstest;
    use proptest::prelude::*;
    use float_eq::assert_float_eq;

    /// Grid of `n` voxels filling a box of full size `size`, centred on the origin
    fn grid(size: (f32, f32, f32), n: BoxDim_u) -> VolumeGeometry {
        let spacing = Vector::new(size.0 / n[0] as f32, size.1 / n[1] as f32, size.2 / n[2] as f32);
        VolumeGeometry::centred(n, spacing).unwrap()
    }

    // This set of hand-picked values should be easy to verify by humans. The
    // test performs two checks:
    //
    // 1. The sum of the lengths within individual voxels equals the expected
    //    total length of the segment in the whole box.
    //
    // 2. The indices of the voxels traversed by the segment are as expected.
    #[rstest(/**/      p1       ,      p2      ,    size     ,  n   ,  length  , expected_voxels,
             // symmetric 3x3, diagonal ray under all four axis flip combinations
             case((-30.0, -30.0), ( 30.0, 30.0), (10.0, 10.0), (3,3), 14.142135, vec![(0,0), (1,1), (2,2)]),
             case(( 30.0, -30.0), (-30.0, 30.0), (10.0, 10.0), (3,3), 14.142135, vec![(2,0), (1,1), (0,2)]),
             case((-30.0,  30.0), ( 30.0,-30.0), (10.0, 10.0), (3,3), 14.142135, vec![(0,2), (1,1), (2,0)]),
             case(( 30.0,  30.0), (-30.0,-30.0), (10.0, 10.0), (3,3), 14.142135, vec![(2,2), (1,1), (0,0)]),
             // like case 1, but with asymmetric voxels
             case((-30.0, -30.0), ( 30.0, 30.0), (10.0, 10.0), (3,2), 14.142135, vec![(0,0), (1,0), (1,1), (2,1)]),
             case((-30.0, -30.0), ( 30.0, 30.0), (10.0, 10.0), (2,3), 14.142135, vec![(0,0), (0,1), (1,1), (1,2)]),
             // vertical / horizontal off-centre rays
             case((  5.4, -20.0), (  5.4, 10.0), (11.0,  9.0), (9,4),  9.0     , vec![(8,0), (8,1), (8,2), (8,3)]),
             case((-15.0,  -4.0), ( 15.0, -4.0), ( 8.0, 10.0), (4,3),  8.0     , vec![(0,0), (1,0), (2,0), (3,0)]),
             // segment ending inside the box
             case((-15.0,  -4.0), (  1.0, -4.0), ( 8.0, 10.0), (4,3),  5.0     , vec![(0,0), (1,0), (2,0)]),
             // segment starting inside the box
             case((  0.5,   0.0), (  0.5, 30.0), ( 8.0, 10.0), (4,3),  5.0     , vec![(2,1), (2,2)]),
    )]
    fn hand_picked(p1:   (Lengthf32, Lengthf32),
                   p2:   (Lengthf32, Lengthf32),
                   size: (Lengthf32, Lengthf32),
                   n: (usize, usize),
                   length: Lengthf32,
                   expected_voxels: Vec<(usize, usize)>) {

        let g = grid((size.0, size.1, 1.0), [n.0, n.1, 1]);
        let p1 = Point::new(p1.0, p1.1, 0.0);
        let p2 = Point::new(p2.0, p2.1, 0.0);

        let hits: Vec<_> = WeightsAlongRay::new(p1, p2, &g)
            .filter(|(_, weight)| *weight > 0.0)
            .collect();

        for (is, l) in &hits { println!("  ({} {})   {}", is[0], is[1], l) }

        // Check total length through box
        let total_length: Lengthf32 = hits.iter().map(|(_index, weight)| weight).sum();
        assert_float_eq!(total_length, length, rmax <= 1e-4);

        // Check voxels hit
        let voxels: Vec<(usize, usize)> = hits.into_iter()
            .map(|(index, _weight)| (index[0], index[1]))
            .collect();
        assert_eq!(voxels, expected_voxels)
    }

    #[test]
    fn segment_missing_box_yields_nothing() {
        let g = grid((10.0, 10.0, 10.0), [5, 5, 5]);
        let hits = WeightsAlongRay::new(Point::new(-20.0, 6.0, 0.0), Point::new(20.0, 6.0, 0.0), &g).count();
        assert_eq!(hits, 0);
    }

    #[test]
    fn uniform_volume_integrates_to_chord() {
        // Rotated, offset volume of uniform value 2 and physical size 16 × 16 × 16
        let geometry = VolumeGeometry::new([8, 8, 8], Vector::repeat(2.0), Point::new(3.0, 4.0, 5.0),
                                           *geometry::rotation_about_y(0.3).matrix(), [-4, -4, -4]).unwrap();
        let image = Image::filled(geometry.clone(), 2.0);
        let siddon = Siddon::new(&image);
        // Along the rotated x-axis through the middle of the box
        let centre = geometry.index_to_physical([0, 0, 0]) - geometry.direction() * Vector::repeat(1.0);
        let axis = geometry.direction() * Vector::x();
        let integral = siddon.line_integral(&(centre - axis * 50.0), &(centre + axis * 50.0));
        assert_float_eq!(integral, 2.0 * 16.0, rmax <= 1e-4);
    }

    // This property-based test generates random segments and verifies that the
    // total length inside the box equals the sum of the lengths in the
    // individual voxels.
    proptest! {
        #[test]
        fn sum_of_weights_equals_length_through_box(
            r        in  200.0..(300.0 as Lengthf32),
            p1_angle in 0.0..(1.0 as Lengthf32), // around the circle
            p2_delta in 0.1..(0.9 as Lengthf32), // relative to p1_angle
            p1_z     in -200.0..(200.0 as Lengthf32),
            p2_z     in -200.0..(200.0 as Lengthf32),
            fraction in 0.2..(1.0 as Lengthf32), // of the segment from p1 to p2
            dx in  100.0..(150.0 as Lengthf32),
            dy in  100.0..(150.0 as Lengthf32),
            dz in  100.0..(190.0 as Lengthf32),
            nx in  5..50_usize,
            ny in  5..50_usize,
            nz in  5..90_usize,
        ) {
            let tau = std::f32::consts::TAU;
            let p1_theta = p1_angle * tau;
            let p2_theta = p1_theta + (p2_delta * tau);
            let p1 = Point::new(r * p1_theta.cos(), r * p1_theta.sin(), p1_z);
            let p2 = Point::new(r * p2_theta.cos(), r * p2_theta.sin(), p2_z);
            let p2 = p1 + (p2 - p1) * fraction;
            let g = grid((dx, dy, dz), [nx, ny, nz]);

            let summed: Lengthf32 = WeightsAlongRay::new(p1, p2, &g)
                .inspect(|(i, _)| assert!((0..3).all(|d| i[d] < g.size()[d])))
                .map(|(_index, weight)| weight)
                .sum();

            let in_one_go = clip_segment(&g.half_extents(), &p1, &p2)
                .map_or(0.0, |(t_in, t_out)| t_out - t_in);

            assert_float_eq!(summed, in_one_go, abs <= 1e-2);
        }
    }
}
