//! An image source which fills every voxel with the same value.
//!
//! The output can be produced one sub-region at a time, so that consumers
//! never need the whole buffer at once. Every region is generated from the
//! immutable source alone, so generation is restartable and any partition of
//! the extent, generated in any order, reassembles into the same image.

use log::debug;
use rayon::prelude::*;

use crate::error::Result;
use crate::grid::VolumeGeometry;
use crate::image::{Image, Space};
use crate::region::SubRegion;

#[derive(Clone, Debug)]
pub struct ConstantSource<T> {
    geometry: VolumeGeometry,
    value: T,
    space: Space,
}

impl<T> ConstantSource<T>
where
    T: Clone + Send + Sync,
{
    /// `geometry` has already been validated by `VolumeGeometry::new`, so a
    /// source never exists with an unusable extent.
    pub fn new(geometry: VolumeGeometry, value: T) -> Self {
        Self { geometry, value, space: Space::Volume }
    }

    /// Adopt the size, spacing, origin, direction and starting index of an
    /// existing image
    pub fn from_reference<U>(reference: &Image<U>, value: T) -> Self {
        Self::new(reference.geometry().clone(), value).in_space(reference.space())
    }

    /// Tag the generated images with `space`
    pub fn in_space(mut self, space: Space) -> Self {
        self.space = space;
        self
    }

    /// Metadata of the images produced by this source
    pub fn output_geometry(&self) -> &VolumeGeometry { &self.geometry }

    pub fn value(&self) -> &T { &self.value }

    /// The values of `region`, x varying fastest
    pub fn generate_region(&self, region: &SubRegion) -> Result<Vec<T>> {
        self.geometry.check_region(region)?;
        Ok(vec![self.value.clone(); region.n_voxels()])
    }

    /// Overwrite `region` of an existing image with the constant
    pub fn fill_region(&self, image: &mut Image<T>, region: &SubRegion) -> Result<()> {
        self.geometry.check_region(region)?;
        image.par_rows_mut(region)?
            .for_each(|(_, row)| row.fill(self.value.clone()));
        Ok(())
    }

    /// Partition the whole extent into at most `n_pieces` disjoint regions
    pub fn split(&self, n_pieces: usize) -> Vec<SubRegion> {
        self.geometry.largest_region().split(n_pieces)
    }

    /// Lazily produce the whole extent as at most `n_pieces` regions, each
    /// paired with its values
    pub fn stream(&self, n_pieces: usize) -> impl Iterator<Item = (SubRegion, Vec<T>)> + '_ {
        self.split(n_pieces).into_iter()
            .map(|region| {
                let values = vec![self.value.clone(); region.n_voxels()];
                (region, values)
            })
    }

    /// Materialize the whole image, generating one region per rayon thread
    pub fn generate(&self) -> Result<Image<T>> {
        let regions = self.split(rayon::current_num_threads());
        debug!("Generating constant image of {} voxels in {} regions",
               self.geometry.n_voxels(), regions.len());
        // Regions are slabs along the slowest axis, in order, so their values
        // concatenate into the full buffer.
        let pieces: Vec<Vec<T>> = regions.par_iter()
            .map(|region| vec![self.value.clone(); region.n_voxels()])
            .collect();
        let data = pieces.into_iter().flatten().collect();
        Ok(Image::new(self.geometry.clone(), data)?.in_space(self.space))
    }
}
