//! Analytic phantoms: ordered collections of weighted quadric solids.
//!
//! The attenuation of a phantom at any point is the sum of the densities of
//! all the primitives containing that point. Negative densities carve
//! lower-attenuation structures out of the primitives beneath them.

mod shepp_logan;

pub use shepp_logan::{shepp_logan, SHEPP_LOGAN_SCALE};

use geometry::{half_space_interval, is_orthonormal, rotation_about_y, unit_ball_interval,
               Interval, Matrix, Point, Vector};
use units::plain::{Densityf32, Lengthf32};
use units::{radian_, Angle};

use crate::error::{Error, Result};

/// The half-space `normal · p ≤ offset`, in physical coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalfSpace {
    pub normal: Vector,
    pub offset: Lengthf32,
}

impl HalfSpace {

    pub fn new(normal: Vector, offset: Lengthf32) -> Result<Self> {
        let usable = normal.iter().all(|x| x.is_finite()) && normal.norm() > 0.0 && offset.is_finite();
        if !usable { return Err(Error::InvalidClipPlane { normal: normal.into() }) }
        Ok(Self { normal, offset })
    }

    #[inline]
    pub fn contains(&self, p: &Point) -> bool { self.normal.dot(&p.coords) <= self.offset }

    fn translated(self, shift: &Vector) -> Self {
        Self { offset: self.offset + self.normal.dot(shift), ..self }
    }
}

/// The shape of a quadric primitive
#[derive(Clone, Debug, PartialEq)]
pub enum Kind {
    /// The full ellipsoid
    Ellipsoid,
    /// The part of the ellipsoid lying inside all of the half-spaces
    Clipped(Vec<HalfSpace>),
}

/// An ellipsoid (possibly clipped by half-spaces) of uniform density.
///
/// `rotation` maps the ellipsoid's own axes onto physical directions: the
/// semi-axis `semi_axes[i]` lies along column `i` of `rotation`.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadricPrimitive {
    centre: Point,
    semi_axes: Vector,
    rotation: Matrix,
    density: Densityf32,
    kind: Kind,
}

impl QuadricPrimitive {

    pub fn new(centre: Point, semi_axes: Vector, rotation: Matrix, density: Densityf32) -> Result<Self> {
        if semi_axes.iter().any(|&a| !a.is_finite() || a <= 0.0) {
            return Err(Error::InvalidSemiAxes { semi_axes: semi_axes.into() })
        }
        if !is_orthonormal(&rotation) { return Err(Error::NonOrthonormalRotation) }
        if !density.is_finite()       { return Err(Error::NonFiniteDensity { density }) }
        if centre.iter().any(|c| !c.is_finite()) {
            return Err(Error::NonFiniteOrigin { origin: centre.coords.into() })
        }
        Ok(Self { centre, semi_axes, rotation, density, kind: Kind::Ellipsoid })
    }

    pub fn sphere(centre: Point, radius: Lengthf32, density: Densityf32) -> Result<Self> {
        Self::new(centre, Vector::repeat(radius), Matrix::identity(), density)
    }

    /// Ellipsoid tilted by `angle` about the y-axis
    pub fn ellipsoid(centre: Point, semi_axes: Vector, angle: Angle, density: Densityf32) -> Result<Self> {
        Self::new(centre, semi_axes, *rotation_about_y(radian_(angle)).matrix(), density)
    }

    /// Restrict the primitive to the part lying in `half_space`
    pub fn clipped_by(mut self, half_space: HalfSpace) -> Self {
        if let Kind::Clipped(planes) = &mut self.kind { planes.push(half_space) }
        else { self.kind = Kind::Clipped(vec![half_space]) }
        self
    }

    pub fn centre   (&self) -> Point      { self.centre }
    pub fn semi_axes(&self) -> Vector     { self.semi_axes }
    pub fn rotation (&self) -> Matrix     { self.rotation }
    pub fn density  (&self) -> Densityf32 { self.density }
    pub fn kind     (&self) -> &Kind      { &self.kind }

    fn clip_planes(&self) -> &[HalfSpace] {
        match &self.kind {
            Kind::Ellipsoid       => &[],
            Kind::Clipped(planes) => planes.as_slice(),
        }
    }

    /// Express `p` in the frame in which the ellipsoid is the unit ball
    #[inline]
    fn to_unit_frame(&self, p: &Point) -> Point {
        Point::from((self.rotation.transpose() * (p - self.centre)).component_div(&self.semi_axes))
    }

    #[inline]
    fn direction_to_unit_frame(&self, v: &Vector) -> Vector {
        (self.rotation.transpose() * v).component_div(&self.semi_axes)
    }

    /// Is `p` inside (or on the surface of) the primitive?
    #[inline]
    pub fn contains(&self, p: &Point) -> bool {
        self.to_unit_frame(p).coords.norm_squared() <= 1.0 &&
            self.clip_planes().iter().all(|h| h.contains(p))
    }

    #[inline]
    pub fn density_at(&self, p: &Point) -> Densityf32 {
        if self.contains(p) { self.density } else { 0.0 }
    }

    /// Range of `t` for which `origin + t * direction` lies inside the
    /// primitive, if any
    pub fn ray_interval(&self, origin: &Point, direction: &Vector) -> Option<Interval> {
        let o = self.to_unit_frame(origin);
        let d = self.direction_to_unit_frame(direction);
        let mut interval = unit_ball_interval(&o, &d)?;
        for h in self.clip_planes() {
            interval = interval.intersect(half_space_interval(&h.normal, h.offset, origin, direction)?)?;
        }
        Some(interval)
    }

    /// Smallest axis-aligned physical box containing the ellipsoid, as its
    /// lower and upper corners. Clip planes only remove material, so they are
    /// ignored.
    pub fn bounding_box(&self) -> (Point, Point) {
        let r = &self.rotation;
        let a = &self.semi_axes;
        let half = Vector::from_fn(|i, _| {
            (0..3).map(|j| (r[(i, j)] * a[j]).powi(2)).sum::<Lengthf32>().sqrt()
        });
        (self.centre - half, self.centre + half)
    }

    /// Scale all lengths, including the position of the centre, by `factor`
    fn scaled(&self, factor: Lengthf32) -> Self {
        let kind = match &self.kind {
            Kind::Ellipsoid       => Kind::Ellipsoid,
            Kind::Clipped(planes) => Kind::Clipped(planes.iter()
                .map(|h| HalfSpace { offset: h.offset * factor, ..*h })
                .collect()),
        };
        Self {
            centre: Point::from(self.centre.coords * factor),
            semi_axes: self.semi_axes * factor,
            kind,
            ..*self
        }
    }

    fn translated(&self, shift: &Vector) -> Self {
        let kind = match &self.kind {
            Kind::Ellipsoid       => Kind::Ellipsoid,
            Kind::Clipped(planes) => Kind::Clipped(planes.iter().map(|h| h.translated(shift)).collect()),
        };
        Self { centre: self.centre + shift, kind, ..*self }
    }
}

/// A non-empty, ordered sequence of quadric primitives
#[derive(Clone, Debug, PartialEq)]
pub struct Phantom {
    primitives: Vec<QuadricPrimitive>,
}

impl Phantom {

    pub fn new(primitives: Vec<QuadricPrimitive>) -> Result<Self> {
        if primitives.is_empty() { return Err(Error::EmptyPhantom) }
        Ok(Self { primitives })
    }

    pub fn primitives(&self) -> &[QuadricPrimitive] { &self.primitives }

    /// Sum of the densities of all primitives containing `p`
    pub fn density_at(&self, p: &Point) -> Densityf32 {
        self.primitives.iter().map(|q| q.density_at(p)).sum()
    }

    /// The phantom with all lengths (sizes and positions) multiplied by `factor`
    pub fn scaled(&self, factor: Lengthf32) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 { return Err(Error::InvalidScale(factor)) }
        Ok(Self { primitives: self.primitives.iter().map(|q| q.scaled(factor)).collect() })
    }

    /// The phantom moved by `shift`
    pub fn translated(&self, shift: &Vector) -> Self {
        Self { primitives: self.primitives.iter().map(|q| q.translated(shift)).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};
    use rstest::rstest;
    use proptest::prelude::*;
    use float_eq::assert_float_eq;
    use units::degree;

    #[rstest(/**/ semi_axes        , density , ok,
             case([1.0, 2.0, 3.0]  , 1.0     , true ),
             case([1.0, 0.0, 3.0]  , 1.0     , false),
             case([1.0,-2.0, 3.0]  , 1.0     , false),
             case([1.0, 2.0, 3.0]  , f32::NAN, false),
    )]
    fn primitive_validation(semi_axes: [f32; 3], density: f32, ok: bool) {
        let result = QuadricPrimitive::new(Point::origin(), semi_axes.into(), Matrix::identity(), density);
        assert_eq!(result.is_ok(), ok);
        if let Err(e) = result { assert!(e.is_configuration()) }
    }

    #[test]
    fn non_orthonormal_rotation_rejected() {
        let result = QuadricPrimitive::new(Point::origin(), Vector::repeat(1.0), Matrix::identity() * 2.0, 1.0);
        assert!(matches!(result, Err(Error::NonOrthonormalRotation)));
    }

    #[test]
    fn zero_clip_normal_rejected() {
        assert!(matches!(HalfSpace::new(Vector::zeros(), 1.0), Err(Error::InvalidClipPlane { .. })));
    }

    #[test]
    fn empty_phantom_rejected() {
        assert!(matches!(Phantom::new(vec![]), Err(Error::EmptyPhantom)));
    }

    #[rstest(/**/   point         , expected,
             case([ 0.0, 0.0, 0.0], 1.0),
             case([19.9, 0.0, 0.0], 1.0),
             case([ 0.0,20.1, 0.0], 0.0),
             case([12.0,12.0,12.0], 0.0), // distance ≈ 20.8
             case([11.0,11.0,11.0], 1.0), // distance ≈ 19.1
    )]
    fn sphere_membership(point: [f32; 3], expected: f32) {
        let sphere = QuadricPrimitive::sphere(Point::origin(), 20.0, 1.0).unwrap();
        assert_eq!(sphere.density_at(&point.into()), expected);
    }

    #[test]
    fn tilted_ellipsoid_membership() {
        // Long axis along x, rotated by 90° about y, ends up along z
        let e = QuadricPrimitive::ellipsoid(Point::origin(), Vector::new(10.0, 1.0, 1.0), degree(90.0), 3.0).unwrap();
        assert_eq!(e.density_at(&Point::new(0.0, 0.0,  9.0)), 3.0);
        assert_eq!(e.density_at(&Point::new(9.0, 0.0,  0.0)), 0.0);
    }

    #[test]
    fn clipped_sphere_is_a_hemisphere() {
        let hemisphere = QuadricPrimitive::sphere(Point::origin(), 10.0, 1.0).unwrap()
            .clipped_by(HalfSpace::new(Vector::x(), 0.0).unwrap());
        assert!( hemisphere.contains(&Point::new(-5.0, 0.0, 0.0)));
        assert!(!hemisphere.contains(&Point::new( 5.0, 0.0, 0.0)));
        // Chord along x is halved by the clip plane
        let interval = hemisphere.ray_interval(&Point::new(-20.0, 0.0, 0.0), &Vector::x()).unwrap();
        assert_float_eq!((interval.enter, interval.leave), (10.0, 20.0), abs <= (1e-4, 1e-4));
        // Rays lying entirely in the removed half miss
        assert_eq!(hemisphere.ray_interval(&Point::new(5.0, -20.0, 0.0), &Vector::y()), None);
    }

    #[test]
    fn overlapping_densities_add() {
        let phantom = Phantom::new(vec![
            QuadricPrimitive::sphere(Point::origin(),  10.0,  2.0).unwrap(),
            QuadricPrimitive::sphere(Point::origin(),   5.0, -0.5).unwrap(),
        ]).unwrap();
        assert_eq!(phantom.density_at(&Point::origin()), 1.5);
        assert_eq!(phantom.density_at(&Point::new(7.0, 0.0, 0.0)), 2.0);
        assert_eq!(phantom.density_at(&Point::new(11.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn scaling_and_translation() {
        let phantom = Phantom::new(vec![
            QuadricPrimitive::sphere(Point::new(1.0, 0.0, 0.0), 1.0, 1.0).unwrap()
                .clipped_by(HalfSpace::new(Vector::y(), 0.5).unwrap()),
        ]).unwrap();
        let moved = phantom.scaled(10.0).unwrap().translated(&Vector::new(0.0, 100.0, 0.0));
        let q = &moved.primitives()[0];
        assert_eq!(q.centre(), Point::new(10.0, 100.0, 0.0));
        assert_eq!(q.semi_axes(), Vector::repeat(10.0));
        assert_eq!(q.kind(), &Kind::Clipped(vec![HalfSpace { normal: Vector::y(), offset: 105.0 }]));
        assert!(matches!(phantom.scaled(0.0), Err(Error::InvalidScale(_))));
    }

    proptest! {
        // Every point of a random ellipsoid lies inside its bounding box
        #[test]
        fn bounding_box_contains_ellipsoid(
            a in 0.5..(20.0 as f32), b in 0.5..(20.0 as f32), c in 0.5..(20.0 as f32),
            angle in -180.0..(180.0 as f32),
            u in -1.0..(1.0 as f32), v in -1.0..(1.0 as f32), w in -1.0..(1.0 as f32),
        ) {
            let e = QuadricPrimitive::ellipsoid(Point::new(1.0, 2.0, 3.0), Vector::new(a, b, c), degree(angle), 1.0).unwrap();
            let local = Vector::new(u, v, w);
            let local = if local.norm() > 1.0 { local.normalize() } else { local };
            let p = e.centre() + e.rotation() * local.component_mul(&e.semi_axes());
            let (lo, hi) = e.bounding_box();
            for d in 0..3 {
                prop_assert!(lo[d] - 1e-3 <= p[d] && p[d] <= hi[d] + 1e-3);
            }
        }
    }
}
