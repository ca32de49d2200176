//! Exact line integrals through analytic phantoms.
//!
//! Each primitive contributes its density times the length of the segment
//! lying inside it; the lengths come from the closed-form intersection of the
//! line with the primitive's quadric and clip planes, so there is no
//! discretization error.

use geometry::{Interval, Point};
use units::plain::Intensityf32;

use crate::phantom::Phantom;

use super::ForwardProjector;

pub struct Analytic<'a> {
    phantom: &'a Phantom,
}

impl<'a> Analytic<'a> {
    pub fn new(phantom: &'a Phantom) -> Self { Self { phantom } }
}

impl ForwardProjector for Analytic<'_> {
    fn line_integral(&self, source: &Point, target: &Point) -> Intensityf32 {
        let segment = target - source;
        let length = segment.norm();
        if !(length > 0.0) { return 0.0 }
        let direction = segment / length;
        let extent = Interval::new(0.0, length);
        self.phantom.primitives().iter()
            .filter_map(|q| {
                let chord = q.ray_interval(source, &direction)?.intersect(extent)?;
                Some(q.density() * chord.length())
            })
            .sum()
    }
}
