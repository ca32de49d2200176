//! Sampling analytic phantoms on voxel grids.
//!
//! The value of a voxel is the phantom's density at the voxel's centre: the
//! sum of the densities of the primitives containing that point. Each voxel is
//! computed directly from its absolute index, so the result does not depend on
//! how the extent is partitioned into regions, nor on the number of threads.

use log::{debug, info};
use rayon::prelude::*;

use geometry::Point;
use units::plain::Densityf32;

use crate::error::Result;
use crate::grid::VolumeGeometry;
use crate::image::{Accumulate, Image};
use crate::index::Index3_i;
use crate::phantom::{Phantom, QuadricPrimitive};
use crate::region::SubRegion;

/// Add (or write) the phantom's density into every voxel of `region`
pub fn draw_phantom(phantom: &Phantom, image: &mut Image, region: &SubRegion, accumulate: Accumulate) -> Result<()> {
    let culled = Culled::new(phantom, image.geometry());
    let geometry = image.geometry().clone();
    debug!("Drawing {} primitives into {} voxels", phantom.primitives().len(), region.n_voxels());
    image.par_rows_mut(region)?
        .for_each(|([x0, y, z], row)| {
            for (dx, voxel) in row.iter_mut().enumerate() {
                let value = culled.value_at(&geometry, [x0 + dx as i64, y, z]);
                accumulate.apply(voxel, value);
            }
        });
    Ok(())
}

/// The phantom's density at the centre of every voxel of `region`, x fastest
pub fn rasterize_region(phantom: &Phantom, geometry: &VolumeGeometry, region: &SubRegion) -> Result<Vec<Densityf32>> {
    geometry.check_region(region)?;
    let culled = Culled::new(phantom, geometry);
    Ok(region.indices().map(|i| culled.value_at(geometry, i)).collect())
}

/// Rasterize the phantom onto the whole of `geometry`, one region per task
pub fn rasterize(phantom: &Phantom, geometry: &VolumeGeometry) -> Result<Image> {
    let regions = geometry.largest_region().split(rayon::current_num_threads() * 4);
    info!("Rasterizing {} primitives onto {:?} voxels in {} regions",
          phantom.primitives().len(), geometry.size(), regions.len());
    let pieces = regions.par_iter()
        .map(|region| rasterize_region(phantom, geometry, region))
        .collect::<Result<Vec<_>>>()?;
    // The regions are consecutive slabs along the slowest axis
    Image::new(geometry.clone(), pieces.concat())
}

/// Primitives paired with the (inclusive, absolute) index ranges which can
/// possibly contain their voxels. Only voxels inside a primitive's range are
/// tested against it; the ranges are conservative, so skipping the others
/// never changes a sum.
struct Culled<'p> {
    primitives: Vec<(&'p QuadricPrimitive, Index3_i, Index3_i)>,
}

impl<'p> Culled<'p> {

    fn new(phantom: &'p Phantom, geometry: &VolumeGeometry) -> Self {
        let primitives = phantom.primitives().iter()
            .map(|q| {
                let (lo, hi) = index_bounds(q, geometry);
                (q, lo, hi)
            })
            .collect();
        Self { primitives }
    }

    #[inline]
    fn value_at(&self, geometry: &VolumeGeometry, index: Index3_i) -> Densityf32 {
        let p = geometry.index_to_physical(index);
        self.primitives.iter()
            .filter(|(_, lo, hi)| (0..3).all(|d| lo[d] <= index[d] && index[d] <= hi[d]))
            .map(|(q, _, _)| q.density_at(&p))
            .sum()
    }
}

/// Range of absolute voxel indices whose centres might lie inside `q`,
/// padded by one voxel on every side to absorb rounding
fn index_bounds(q: &QuadricPrimitive, geometry: &VolumeGeometry) -> (Index3_i, Index3_i) {
    let (lo, hi) = q.bounding_box();
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for (x, y, z) in itertools::iproduct!([lo.x, hi.x], [lo.y, hi.y], [lo.z, hi.z]) {
        let c = geometry.continuous_index(&Point::new(x, y, z));
        for d in 0..3 {
            min[d] = min[d].min(c[d]);
            max[d] = max[d].max(c[d]);
        }
    }
    (min.map(|m| m.floor() as i64 - 1), max.map(|m| m.ceil() as i64 + 1))
}
