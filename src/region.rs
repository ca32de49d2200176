//! Axis-aligned blocks of voxel indices, and their partitioning into disjoint
//! pieces which can be generated independently.

use crate::index::{BoxDim_u, Index3_i, Index3_u};

/// An axis-aligned block of absolute voxel indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubRegion {
    /// Absolute index of the first voxel in the block
    pub index: Index3_i,
    /// Number of voxels along each axis
    pub size: BoxDim_u,
}

impl SubRegion {

    pub fn new(index: Index3_i, size: BoxDim_u) -> Self { Self { index, size } }

    pub fn n_voxels(&self) -> usize { self.size.iter().product() }

    pub fn is_empty(&self) -> bool { self.n_voxels() == 0 }

    /// One past the last absolute index, along each axis
    pub fn upper(&self) -> Index3_i {
        let [x, y, z] = self.index;
        let [nx, ny, nz] = self.size;
        [x + nx as i64, y + ny as i64, z + nz as i64]
    }

    /// Does `other` lie entirely inside `self`?
    pub fn contains(&self, other: &SubRegion) -> bool {
        let (lo, hi) = (self.index, self.upper());
        let (olo, ohi) = (other.index, other.upper());
        (0..3).all(|d| lo[d] <= olo[d] && ohi[d] <= hi[d])
    }

    pub fn contains_index(&self, index: Index3_i) -> bool {
        let (lo, hi) = (self.index, self.upper());
        (0..3).all(|d| lo[d] <= index[d] && index[d] < hi[d])
    }

    /// Position of absolute `index` relative to the start of this region. The
    /// caller must ensure that `index` lies inside the region.
    pub fn relative(&self, index: Index3_i) -> Index3_u {
        let [x, y, z] = index;
        let [sx, sy, sz] = self.index;
        [(x - sx) as usize, (y - sy) as usize, (z - sz) as usize]
    }

    /// Iterate over the absolute indices of all voxels in the region, x fastest
    pub fn indices(&self) -> impl Iterator<Item = Index3_i> {
        let [x0, y0, z0] = self.index;
        let [x1, y1, z1] = self.upper();
        itertools::iproduct!(z0..z1, y0..y1, x0..x1).map(|(z, y, x)| [x, y, z])
    }

    /// Partition the region into at most `n_pieces` disjoint regions whose
    /// union is the whole region.
    ///
    /// The split is made along the slowest-varying axis with more than one
    /// voxel, so that each piece occupies a contiguous stretch of a buffer
    /// laid out like the whole region. Pieces differ in size by at most one
    /// slice. An empty region yields no pieces.
    pub fn split(&self, n_pieces: usize) -> Vec<SubRegion> {
        if self.is_empty() { return vec![] }
        let axis = (0..3).rev().find(|&d| self.size[d] > 1).unwrap_or(2);
        let extent = self.size[axis];
        let n = n_pieces.clamp(1, extent);
        let (base, extra) = (extent / n, extent % n);
        let mut pieces = Vec::with_capacity(n);
        let mut start = self.index[axis];
        for piece in 0..n {
            let thickness = base + usize::from(piece < extra);
            let mut region = *self;
            region.index[axis] = start;
            region.size[axis] = thickness;
            pieces.push(region);
            start += thickness as i64;
        }
        pieces
    }
}
