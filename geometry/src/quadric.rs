use units::plain::Lengthf32;

use crate::{Point, Vector};

/// The range of the parameter `t` for which the point `origin + t * direction`
/// lies inside some solid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    pub enter: Lengthf32,
    pub leave: Lengthf32,
}

impl Interval {

    pub fn new(enter: Lengthf32, leave: Lengthf32) -> Self { Self { enter, leave } }

    pub fn everything() -> Self { Self::new(Lengthf32::NEG_INFINITY, Lengthf32::INFINITY) }

    /// The overlap of two intervals; `None` if they do not overlap at all
    pub fn intersect(self, other: Self) -> Option<Self> {
        let enter = self.enter.max(other.enter);
        let leave = self.leave.min(other.leave);
        if leave > enter { Some(Self { enter, leave }) }
        else             { None }
    }

    pub fn length(&self) -> Lengthf32 { self.leave - self.enter }
}

/// Where does the line `origin + t * direction` pass through the unit ball
/// centred on the origin?
///
/// Substituting the line into `|p|² = 1` gives `a t² + b t + c = 0`. The
/// roots are found with the numerically stable form of the quadratic
/// formula, which avoids cancellation when `b² ≫ 4ac`. Lines which miss the
/// ball, or merely touch it, have no interval.
pub fn unit_ball_interval(origin: &Point, direction: &Vector) -> Option<Interval> {
    let o = origin.coords;
    // Viète coefficients
    let a = direction.dot(direction);
    let b = 2.0 * o.dot(direction);
    let c = o.dot(&o) - 1.0;
    if !(a > 0.0) { return None }
    let discriminant = b * b - 4.0 * a * c;
    if !(discriminant > 0.0) { return None }
    let q = -0.5 * (b + b.signum() * discriminant.sqrt());
    let (t1, t2) = (q / a, c / q);
    Some(Interval::new(t1.min(t2), t1.max(t2)))
}

/// Where does the line `origin + t * direction` lie in the half-space
/// `normal · p ≤ offset`?
///
/// A line parallel to the bounding plane lies either entirely inside or
/// entirely outside.
pub fn half_space_interval(normal: &Vector, offset: Lengthf32, origin: &Point, direction: &Vector) -> Option<Interval> {
    let along  = normal.dot(direction);
    let excess = offset - normal.dot(&origin.coords);
    if along == 0.0 {
        return if excess >= 0.0 { Some(Interval::everything()) } else { None }
    }
    let t = excess / along;
    Some(if along > 0.0 { Interval::new(Lengthf32::NEG_INFINITY, t) }
         else           { Interval::new(t, Lengthf32::INFINITY) })
}
