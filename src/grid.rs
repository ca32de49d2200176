//! Placement of a voxel grid in physical space.
//!
//! The physical position of the centre of the voxel with absolute index `i` is
//!
//!   `origin + direction · (spacing ⊙ i)`
//!
//! so `origin` is the centre of the voxel with absolute index zero, which need
//! not be one of the voxels stored in the buffer when the starting index is
//! non-zero.

use geometry::{is_orthonormal, Matrix, Point, Vector};
use units::plain::Lengthf32;

use crate::error::{Error, Result};
use crate::index::{BoxDim_u, Index3_i};
use crate::region::SubRegion;

#[derive(Clone, Debug, PartialEq)]
pub struct VolumeGeometry {
    size: BoxDim_u,
    spacing: Vector,
    origin: Point,
    direction: Matrix,
    index: Index3_i,
}

impl VolumeGeometry {

    /// Validated geometry: every axis must have at least one voxel and a
    /// positive spacing, the origin must be finite and the direction must be
    /// orthonormal.
    pub fn new(
        size     : BoxDim_u,
        spacing  : Vector,
        origin   : Point,
        direction: Matrix,
        index    : Index3_i,
    ) -> Result<Self> {
        if size.iter().any(|&n| n == 0) {
            return Err(Error::NonPositiveSize { size })
        }
        if spacing.iter().any(|&s| !s.is_finite() || s <= 0.0) {
            return Err(Error::NonPositiveSpacing { spacing: spacing.into() })
        }
        if origin.iter().any(|o| !o.is_finite()) {
            return Err(Error::NonFiniteOrigin { origin: origin.coords.into() })
        }
        if !is_orthonormal(&direction) {
            return Err(Error::NonOrthonormalDirection)
        }
        Ok(Self { size, spacing, origin, direction, index })
    }

    /// Axis-aligned grid, starting at index zero, whose voxel centres are
    /// arranged symmetrically about the physical origin
    pub fn centred(size: BoxDim_u, spacing: Vector) -> Result<Self> {
        let offset = |d: usize| -(size[d] as Lengthf32 - 1.0) / 2.0 * spacing[d];
        let origin = Point::new(offset(0), offset(1), offset(2));
        Self::new(size, spacing, origin, Matrix::identity(), [0, 0, 0])
    }

    pub fn size     (&self) -> BoxDim_u { self.size }
    pub fn spacing  (&self) -> Vector   { self.spacing }
    pub fn origin   (&self) -> Point    { self.origin }
    pub fn direction(&self) -> Matrix   { self.direction }
    pub fn index    (&self) -> Index3_i { self.index }

    pub fn n_voxels(&self) -> usize { self.size.iter().product() }

    /// The whole extent of the grid
    pub fn largest_region(&self) -> SubRegion { SubRegion::new(self.index, self.size) }

    /// Reject regions which are not entirely contained in the grid's extent
    pub fn check_region(&self, region: &SubRegion) -> Result<()> {
        if self.largest_region().contains(region) { Ok(()) }
        else {
            Err(Error::RegionOutOfBounds { region: *region, index: self.index, size: self.size })
        }
    }

    /// Physical position of the centre of the voxel with absolute index `i`
    #[inline]
    pub fn index_to_physical(&self, [x, y, z]: Index3_i) -> Point {
        let scaled = Vector::new(x as Lengthf32, y as Lengthf32, z as Lengthf32)
            .component_mul(&self.spacing);
        self.origin + self.direction * scaled
    }

    /// Absolute continuous index of a physical point: the inverse of
    /// `index_to_physical`
    pub fn continuous_index(&self, p: &Point) -> Vector {
        (self.direction.transpose() * (p - self.origin)).component_div(&self.spacing)
    }

    // ----- The frame of the bounding box ---------------------------------------
    //
    // The physical bounding box extends half a voxel beyond the outermost voxel
    // centres. In the box frame its axes are aligned with the coordinate axes
    // and it is centred on the origin.

    /// Half the physical size of the bounding box along each grid axis
    pub fn half_extents(&self) -> Vector {
        Vector::new(self.size[0] as Lengthf32,
                    self.size[1] as Lengthf32,
                    self.size[2] as Lengthf32)
            .component_mul(&self.spacing) / 2.0
    }

    /// Centre of the bounding box, in grid coordinates before the rotation
    /// by `direction`
    fn box_centre(&self) -> Vector {
        let centre = |d: usize| (self.index[d] as Lengthf32 + (self.size[d] as Lengthf32 - 1.0) / 2.0) * self.spacing[d];
        Vector::new(centre(0), centre(1), centre(2))
    }

    /// Express physical point `p` in the box frame
    pub fn to_box_frame(&self, p: &Point) -> Point {
        Point::from(self.direction.transpose() * (p - self.origin) - self.box_centre())
    }

    /// Position of box-frame point `q` measured in voxels from the lower
    /// corner of the box: its floor is the buffer-relative index of the voxel
    /// containing `q`.
    pub fn box_frame_to_voxel_coordinates(&self, q: &Point) -> Vector {
        (q.coords + self.half_extents()).component_div(&self.spacing)
    }
}
