use parry3d::query::{Ray, RayCast};
use parry3d::shape::Cuboid;

use units::plain::Lengthf32;

use crate::{Point, Vector};

/// Find the portion of the segment from `p1` to `p2` which lies inside the box
/// with the given `half_extents`, centred on the origin.
///
/// Returns the distances from `p1` (along the segment) at which the segment
/// enters and leaves the box, or `None` if the segment misses the box or
/// merely grazes it.
pub fn clip_segment(half_extents: &Vector, p1: &Point, p2: &Point) -> Option<(Lengthf32, Lengthf32)> {
    let length = (p2 - p1).norm();
    if length.is_nan() || length <= 0.0 { return None }
    let cuboid = Cuboid::new(*half_extents);
    // Casting from each end in turn gives the entry and exit points. `solid`
    // casting reports 0 for an end which is already inside the box.
    let entry = |from: &Point, to: &Point| {
        let ray = Ray::new(*from, (to - from) / length);
        cuboid.cast_local_ray(&ray, length, true)
    };
    let t_in  = entry(p1, p2)?;
    let t_out = length - entry(p2, p1)?;
    if t_out > t_in { Some((t_in, t_out)) }
    else            { None }
}
