//! Forward projection: line integrals of attenuation from each projection's
//! source to every pixel of its detector.
//!
//! A `Projection` is configured once, through `Projection::builder`, with
//!
//! + the attenuation: a voxel volume sampled by one of the `Sampling`
//!   kernels, or an analytic `Phantom` integrated exactly,
//!
//! + the metadata of the projection stack that will receive the results,
//!
//! + the `ProjectionGeometry` describing where each projection's source and
//!   detector are.
//!
//! All inconsistencies between these are reported by `build`, before any
//! pixel is computed. The stack's third index selects the projection (counted
//! from the first slice of the stack's buffer); its first two indices, mapped
//! through the stack's origin and spacing, give the detector coordinates
//! `(u, v)` of the pixel.

use log::{debug, info};
use rayon::prelude::*;

use geometry::{Matrix, Point};
use units::plain::Intensityf32;

use crate::error::{Error, Result};
use crate::grid::VolumeGeometry;
use crate::image::{Accumulate, Image, Space};
use crate::phantom::Phantom;
use crate::projection_geometry::ProjectionGeometry;
use crate::region::SubRegion;

pub use analytic::Analytic;
pub use interpolated::{Trilinear, DEFAULT_STEP_FRACTION};
pub use siddon::Siddon;

pub mod analytic;
pub mod interpolated;
pub mod siddon;

/// Line integral of attenuation along a segment
pub trait ForwardProjector: Sync {
    fn line_integral(&self, source: &Point, target: &Point) -> Intensityf32;
}

/// How a voxel volume is sampled along each ray
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Sampling {
    /// Exact intersection length with every voxel crossed
    #[default]
    Siddon,
    /// Midpoint rule over trilinearly interpolated values, with a step of
    /// `step_fraction` times the smallest voxel spacing
    Trilinear { step_fraction: f32 },
}

impl Sampling {
    pub fn trilinear() -> Self { Self::Trilinear { step_fraction: DEFAULT_STEP_FRACTION } }
}

/// What the rays pass through
#[derive(Clone, Copy, Debug)]
pub enum Attenuation<'a> {
    Voxels { image: &'a Image, sampling: Sampling },
    Phantom(&'a Phantom),
}

/// Collects the inputs of a `Projection`; see `Projection::builder`
#[derive(Default)]
pub struct ProjectionBuilder<'a> {
    attenuation: Option<Attenuation<'a>>,
    stack: Option<(VolumeGeometry, Space)>,
    geometry: Option<&'a ProjectionGeometry>,
}

impl<'a> ProjectionBuilder<'a> {

    pub fn with_attenuation(self, attenuation: Attenuation<'a>) -> Self {
        Self { attenuation: Some(attenuation), ..self }
    }

    pub fn with_volume(self, image: &'a Image, sampling: Sampling) -> Self {
        self.with_attenuation(Attenuation::Voxels { image, sampling })
    }

    pub fn with_phantom(self, phantom: &'a Phantom) -> Self {
        self.with_attenuation(Attenuation::Phantom(phantom))
    }

    /// Only the metadata of `stack` are kept: the stack itself is passed to
    /// `Projection::run`
    pub fn with_projections(self, stack: &Image) -> Self {
        Self { stack: Some((stack.geometry().clone(), stack.space())), ..self }
    }

    pub fn with_geometry(self, geometry: &'a ProjectionGeometry) -> Self {
        Self { geometry: Some(geometry), ..self }
    }

    pub fn build(self) -> Result<Projection<'a>> {
        let attenuation = self.attenuation.ok_or(Error::MissingAttenuation)?;
        let (stack, stack_space) = self.stack.ok_or(Error::MissingProjections)?;
        let geometry = self.geometry.ok_or(Error::MissingGeometry)?;

        if let Attenuation::Voxels { image, sampling } = attenuation {
            if image.space() == stack_space { return Err(Error::SameSpace(stack_space)) }
            if image.space() != Space::Volume {
                return Err(Error::WrongSpace { expected: Space::Volume, actual: image.space() })
            }
            if let Sampling::Trilinear { step_fraction } = sampling {
                interpolated::check_step_fraction(step_fraction)?;
            }
        }
        if stack_space != Space::Detector {
            return Err(Error::WrongSpace { expected: Space::Detector, actual: stack_space })
        }
        if stack.direction() != Matrix::identity() { return Err(Error::RotatedDetector) }
        if geometry.is_empty() { return Err(Error::EmptyGeometry) }
        let n_projections = stack.size()[2];
        if n_projections > geometry.len() {
            return Err(Error::TooManyProjections { stack: n_projections, geometry: geometry.len() })
        }
        Ok(Projection { attenuation, stack, geometry })
    }
}

/// A validated forward projection set-up
#[derive(Debug)]
pub struct Projection<'a> {
    attenuation: Attenuation<'a>,
    stack: VolumeGeometry,
    geometry: &'a ProjectionGeometry,
}

impl<'a> Projection<'a> {

    pub fn builder() -> ProjectionBuilder<'a> { ProjectionBuilder::default() }

    pub fn attenuation   (&self) -> Attenuation<'a>          { self.attenuation }
    pub fn stack_geometry(&self) -> &VolumeGeometry          { &self.stack }
    pub fn geometry      (&self) -> &'a ProjectionGeometry   { self.geometry }

    /// The part of the attenuation volume needed to compute `output`: all of
    /// it, as any ray may cross any voxel. Analytic phantoms need no input
    /// region.
    pub fn input_requested_region(&self, output: &SubRegion) -> Result<Option<SubRegion>> {
        self.stack.check_region(output)?;
        Ok(match self.attenuation {
            Attenuation::Voxels { image, .. } => Some(image.geometry().largest_region()),
            Attenuation::Phantom(_) => None,
        })
    }

    /// Project into every pixel of `stack`
    pub fn run(&self, stack: &mut Image, accumulate: Accumulate) -> Result<()> {
        self.run_region(stack, &self.stack.largest_region(), accumulate)
    }

    /// Project into the pixels of `region` only, leaving the rest of `stack`
    /// untouched. Each pixel depends only on its own index, so the result is
    /// the same however the stack is split into regions.
    pub fn run_region(&self, stack: &mut Image, region: &SubRegion, accumulate: Accumulate) -> Result<()> {
        if stack.geometry() != &self.stack || stack.space() != Space::Detector {
            return Err(Error::StackMismatch)
        }
        self.stack.check_region(region)?;
        debug!("Projecting {} pixels of region {:?}", region.n_voxels(), region);
        match self.attenuation {
            Attenuation::Voxels { image, sampling: Sampling::Siddon } =>
                self.project_rows(&Siddon::new(image), stack, region, accumulate),
            Attenuation::Voxels { image, sampling: Sampling::Trilinear { step_fraction } } =>
                self.project_rows(&Trilinear::new(image, step_fraction)?, stack, region, accumulate),
            Attenuation::Phantom(phantom) =>
                self.project_rows(&Analytic::new(phantom), stack, region, accumulate),
        }
    }

    fn project_rows<K: ForwardProjector>(
        &self,
        kernel: &K,
        stack: &mut Image,
        region: &SubRegion,
        accumulate: Accumulate,
    ) -> Result<()> {
        let frames = self.geometry.frames();
        let first_projection = self.stack.index()[2];
        let pixels = &self.stack;
        stack.par_rows_mut(region)?
            .for_each(|([x0, y, z], row)| {
                // Bounds guaranteed by `build`'s projection count check
                let frame = &frames[(z - first_projection) as usize];
                for (dx, pixel) in row.iter_mut().enumerate() {
                    let uv = pixels.index_to_physical([x0 + dx as i64, y, z]);
                    let target = frame.detector_point(uv.x, uv.y);
                    accumulate.apply(pixel, kernel.line_integral(&frame.source, &target));
                }
            });
        Ok(())
    }
}

/// Forward project `attenuation` into a fresh zero-filled stack with the
/// given metadata
pub fn project(
    attenuation: Attenuation,
    stack_geometry: VolumeGeometry,
    geometry: &ProjectionGeometry,
) -> Result<Image> {
    let mut stack = Image::filled(stack_geometry, 0.0).in_space(Space::Detector);
    let projection = Projection::builder()
        .with_attenuation(attenuation)
        .with_projections(&stack)
        .with_geometry(geometry)
        .build()?;
    info!("Forward projecting into {:?} pixels", stack.geometry().size());
    projection.run(&mut stack, Accumulate::Overwrite)?;
    Ok(stack)
}
