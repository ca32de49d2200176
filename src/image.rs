//! Images: a voxel buffer together with the grid which places it in space.

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::grid::VolumeGeometry;
use crate::index::{index3_to_1, Index1_u, Index3_i, Index3_u};
use crate::region::SubRegion;
use units::plain::Intensityf32;

/// The coordinate space an image lives in.
///
/// Attenuation volumes live in the physical space of the scanned object.
/// Projection stacks live in detector space: their first two axes are
/// detector coordinates and their third axis counts projections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Space { Volume, Detector }

/// What to do with the values already present in an output buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accumulate {
    /// Add the newly computed value to the existing one
    Add,
    /// Replace the existing value
    Overwrite,
}

impl Accumulate {
    #[inline]
    pub fn apply(self, target: &mut Intensityf32, value: Intensityf32) {
        match self {
            Self::Add       => *target += value,
            Self::Overwrite => *target  = value,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Image<T = Intensityf32> {
    geometry: VolumeGeometry,
    data: Vec<T>,
    space: Space,
}

impl<T> Image<T> {

    /// Wrap `data` in `geometry`. The buffer must hold exactly one value per
    /// voxel, x varying fastest.
    pub fn new(geometry: VolumeGeometry, data: Vec<T>) -> Result<Self> {
        let expected = geometry.n_voxels();
        if data.len() != expected {
            return Err(Error::DataLength { expected, actual: data.len() })
        }
        Ok(Self { geometry, data, space: Space::Volume })
    }

    pub fn filled(geometry: VolumeGeometry, value: T) -> Self
    where
        T: Clone,
    {
        let data = vec![value; geometry.n_voxels()];
        Self { geometry, data, space: Space::Volume }
    }

    pub fn in_space(mut self, space: Space) -> Self {
        self.space = space;
        self
    }

    pub fn space   (&self) -> Space           { self.space }
    pub fn geometry(&self) -> &VolumeGeometry { &self.geometry }
    pub fn data    (&self) -> &[T]            { &self.data }
    pub fn data_mut(&mut self) -> &mut [T]    { &mut self.data }
    pub fn into_data(self) -> Vec<T>          { self.data }

    /// Buffer position of the voxel with absolute index `i`, if it is stored
    /// in this image
    pub fn buffer_index(&self, i: Index3_i) -> Option<Index1_u> {
        let region = self.geometry.largest_region();
        region.contains_index(i)
            .then(|| index3_to_1(region.relative(i), self.geometry.size()))
    }

    /// Value of the voxel with absolute index `i`, if it is stored in this image
    pub fn get(&self, i: Index3_i) -> Option<&T> {
        self.buffer_index(i).map(|i| &self.data[i])
    }

    /// Copy of the values in `region`, x varying fastest
    pub fn region_values(&self, region: &SubRegion) -> Result<Vec<T>>
    where
        T: Clone,
    {
        self.geometry.check_region(region)?;
        Ok(self.rows(region).flat_map(|row| row.iter().cloned()).collect())
    }

    /// Write `values` (laid out x-fastest over `region`) into the image
    pub fn paste(&mut self, region: &SubRegion, values: &[T]) -> Result<()>
    where
        T: Clone,
    {
        self.geometry.check_region(region)?;
        let expected = region.n_voxels();
        if values.len() != expected {
            return Err(Error::DataLength { expected, actual: values.len() })
        }
        if region.is_empty() { return Ok(()) }
        let nx = region.size[0];
        for (row, chunk) in self.rows_mut(region).zip(values.chunks(nx)) {
            row.clone_from_slice(chunk);
        }
        Ok(())
    }

    /// Shape-checked `ndarray` view of the buffer, indexed `[z, y, x]`
    pub fn as_array(&self) -> Result<ndarray::ArrayView3<'_, T>> {
        let [nx, ny, nz] = self.geometry.size();
        Ok(ndarray::ArrayView3::from_shape((nz, ny, nx), self.data.as_slice())?)
    }

    /// Rows of `region` in the buffer, as slices, in buffer order.
    /// The region must already have been checked.
    fn rows<'s>(&'s self, region: &SubRegion) -> impl Iterator<Item = &'s [T]> + 's {
        let (size, [x0, x1], lines) = row_layout(&self.geometry, region);
        let [nx, ny, _] = size;
        lines.map(move |(y, z)| {
            let start = index3_to_1([0, y, z], [nx, ny, 0]);
            &self.data[start + x0 .. start + x1]
        })
    }

    fn rows_mut<'s>(&'s mut self, region: &SubRegion) -> impl Iterator<Item = &'s mut [T]> + 's {
        let (size, [x0, x1], _) = row_layout(&self.geometry, region);
        let [nx, _, _] = size;
        let region = *region;
        let start = self.geometry.index();
        self.data.chunks_mut(nx).enumerate()
            .filter(move |(row, _)| row_in_region(*row, size, start, &region))
            .map(move |(_, chunk)| &mut chunk[x0..x1])
    }

    /// The rows of `region`, in parallel, each with the absolute index of its
    /// first voxel. Every row is handed out exactly once, so workers never
    /// share an output value.
    pub fn par_rows_mut<'s>(&'s mut self, region: &SubRegion)
        -> Result<impl ParallelIterator<Item = (Index3_i, &'s mut [T])> + 's>
    where
        T: Send,
    {
        self.geometry.check_region(region)?;
        let size = self.geometry.size();
        let [nx, ny, _] = size;
        let start = self.geometry.index();
        let region = *region;
        let x0 = (region.index[0] - start[0]) as usize;
        let x1 = x0 + region.size[0];
        Ok(self.data.par_chunks_mut(nx).enumerate()
           .filter(move |(row, _)| row_in_region(*row, size, start, &region))
           .map(move |(row, chunk)| {
               let y = start[1] + (row % ny) as i64;
               let z = start[2] + (row / ny) as i64;
               ([region.index[0], y, z], &mut chunk[x0..x1])
           }))
    }
}

/// Does buffer row number `row` (counting x-rows, y fastest) lie in `region`?
fn row_in_region(row: usize, [_, ny, _]: Index3_u, start: Index3_i, region: &SubRegion) -> bool {
    let y = start[1] + (row % ny) as i64;
    let z = start[2] + (row / ny) as i64;
    let (lo, hi) = (region.index, region.upper());
    lo[1] <= y && y < hi[1] && lo[2] <= z && z < hi[2]
}

/// Buffer size, relative x-range and relative (y, z) row coordinates of `region`
fn row_layout(geometry: &VolumeGeometry, region: &SubRegion)
    -> (Index3_u, [usize; 2], impl Iterator<Item = (usize, usize)>)
{
    let [x0, y0, z0] = geometry.largest_region().relative(region.index);
    let [nx, ny, nz] = region.size;
    let lines = itertools::iproduct!(z0..z0 + nz, y0..y0 + ny).map(|(z, y)| (y, z));
    (geometry.size(), [x0, x0 + nx], lines)
}

impl<T> core::ops::Index<Index1_u> for Image<T> {
    type Output = T;
    #[inline]
    fn index(&self, i: Index1_u) -> &Self::Output { &self.data[i] }
}

impl<T> core::ops::IndexMut<Index1_u> for Image<T> {
    #[inline]
    fn index_mut(&mut self, i: Index1_u) -> &mut Self::Output { &mut self.data[i] }
}

impl<T> core::ops::Index<Index3_u> for Image<T> {
    type Output = T;
    fn index(&self, i3: Index3_u) -> &Self::Output {
        &self.data[index3_to_1(i3, self.geometry.size())]
    }
}

impl<T> core::ops::IndexMut<Index3_u> for Image<T> {
    fn index_mut(&mut self, i3: Index3_u) -> &mut Self::Output {
        let i1 = index3_to_1(i3, self.geometry.size());
        &mut self.data[i1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};
    use geometry::{Matrix, Point, Vector};

    fn counting(start: Index3_i) -> Image {
        let g = VolumeGeometry::new([3, 2, 2], Vector::repeat(1.0), Point::origin(), Matrix::identity(), start).unwrap();
        Image::new(g, (0..12).map(|n| n as f32).collect()).unwrap()
    }

    #[test]
    fn buffer_length_must_match() {
        let g = VolumeGeometry::centred([2, 2, 2], Vector::repeat(1.0)).unwrap();
        let result = Image::new(g, vec![0.0; 7]);
        assert!(matches!(result, Err(Error::DataLength { expected: 8, actual: 7 })));
    }

    #[test]
    fn absolute_and_relative_indexing() {
        let image = counting([10, -1, 4]);
        assert_eq!(image[[1, 1, 1]], 10.0);
        assert_eq!(image.get([11, 0, 5]), Some(&10.0));
        assert_eq!(image.get([ 1, 1, 1]), None);
    }

    #[test]
    fn region_values_are_x_fastest() {
        let image = counting([0, 0, 0]);
        let values = image.region_values(&SubRegion::new([1, 0, 0], [2, 2, 2])).unwrap();
        assert_eq!(values, vec![1.0, 2.0, 4.0, 5.0, 7.0, 8.0, 10.0, 11.0]);
    }

    #[test]
    fn paste_writes_only_the_region() {
        let mut image = counting([0, 0, 0]);
        image.paste(&SubRegion::new([0, 1, 1], [2, 1, 1]), &[-1.0, -2.0]).unwrap();
        assert_eq!(image.data(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0,
                                   6.0, 7.0, 8.0, -1.0, -2.0, 11.0]);
    }

    #[test]
    fn region_outside_rejected() {
        let mut image = counting([0, 0, 0]);
        let region = SubRegion::new([2, 0, 0], [2, 1, 1]);
        assert!(image.region_values(&region).unwrap_err().is_range());
        assert!(image.paste(&region, &[0.0, 0.0]).unwrap_err().is_range());
        assert!(image.par_rows_mut(&region).is_err());
    }

    #[test]
    fn parallel_rows_carry_absolute_indices() {
        let mut image = counting([5, 5, 5]);
        let mut starts: Vec<_> = image.par_rows_mut(&SubRegion::new([6, 5, 5], [2, 2, 2])).unwrap()
            .map(|(start, row)| (start, row.to_vec()))
            .collect();
        starts.sort_by_key(|(start, _)| (start[2], start[1]));
        assert_eq!(starts, vec![([6, 5, 5], vec![ 1.0,  2.0]),
                                ([6, 6, 5], vec![ 4.0,  5.0]),
                                ([6, 5, 6], vec![ 7.0,  8.0]),
                                ([6, 6, 6], vec![10.0, 11.0])]);
    }

    #[test]
    fn ndarray_view_is_zyx() {
        let image = counting([0, 0, 0]);
        let view = image.as_array().unwrap();
        assert_eq!(view[[1, 0, 2]], 8.0);
    }

    #[test]
    fn accumulate_modes() {
        let mut x = 2.0;
        Accumulate::Add.apply(&mut x, 3.0);
        assert_eq!(x, 5.0);
        Accumulate::Overwrite.apply(&mut x, 3.0);
        assert_eq!(x, 3.0);
    }
}
