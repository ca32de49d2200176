//! The three-dimensional Shepp-Logan head phantom.

use geometry::{rotation_about_y, Point, Vector};

use crate::error::Result;
use super::{Kind, Phantom, QuadricPrimitive};

/// Default length (mm) by which the unit-sized phantom is scaled
pub const SHEPP_LOGAN_SCALE: f32 = 128.0;

// semi-axes (x, y, z), centre (x, y, z), tilt about y in degrees, density
#[rustfmt::skip]
const ELLIPSOIDS: [([f32; 3], [f32; 3], f32, f32); 10] = [
    ([0.69  , 0.90 , 0.92 ], [ 0.00,  0.000,  0.000],   0.0,  2.00),
    ([0.6624, 0.880, 0.874], [ 0.00,  0.000,  0.000],   0.0, -0.98),
    ([0.41  , 0.21 , 0.16 ], [-0.22, -0.250,  0.000], 108.0, -0.02),
    ([0.31  , 0.22 , 0.11 ], [ 0.22, -0.250,  0.000],  72.0, -0.02),
    ([0.21  , 0.50 , 0.25 ], [ 0.00, -0.250,  0.350],   0.0,  0.02),
    ([0.046 , 0.046, 0.046], [ 0.00, -0.250,  0.100],   0.0,  0.02),
    ([0.046 , 0.02 , 0.023], [-0.08, -0.250, -0.650],   0.0,  0.01),
    ([0.046 , 0.02 , 0.023], [ 0.06, -0.250, -0.650],  90.0,  0.01),
    ([0.056 , 0.1  , 0.04 ], [ 0.06,  0.625, -0.105],  90.0,  0.02),
    ([0.056 , 0.1  , 0.056], [ 0.00,  0.625,  0.100],   0.0, -0.02),
];

/// The ten-ellipsoid Shepp-Logan phantom, with its unit-sized coordinates
/// multiplied by `scale` mm
pub fn shepp_logan(scale: f32) -> Result<Phantom> {
    let primitives = ELLIPSOIDS.iter()
        .map(|&(semi_axes, centre, angle, density)| QuadricPrimitive {
            centre: Point::from(centre),
            semi_axes: Vector::from(semi_axes),
            rotation: *rotation_about_y(angle.to_radians()).matrix(),
            density,
            kind: Kind::Ellipsoid,
        })
        .collect();
    Phantom { primitives }.scaled(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};
    use rstest::rstest;
    use float_eq::assert_float_eq;

    #[rstest(/**/        point          , expected,
             // skull and brain overlap at the centre
             case([   0.0,   0.0,   0.0], 1.02),
             // outside the skull
             case([ 100.0,   0.0,   0.0], 0.0 ),
             case([   0.0,   0.0, 120.0], 0.0 ),
             // inside the skull but outside the brain
             case([   0.0, 114.0,   0.0], 2.0 ),
             // centre of the ellipsoid at (0, -0.25, 0.35)
             case([   0.0, -32.0,  44.8], 1.04),
    )]
    fn densities(point: [f32; 3], expected: f32) {
        let phantom = shepp_logan(SHEPP_LOGAN_SCALE).unwrap();
        assert_float_eq!(phantom.density_at(&point.into()), expected, abs <= 1e-5);
    }

    #[test]
    fn ten_primitives() {
        assert_eq!(shepp_logan(1.0).unwrap().primitives().len(), 10);
    }

    #[test]
    fn invalid_scale_rejected() {
        assert!(shepp_logan(-1.0).is_err());
    }
}
