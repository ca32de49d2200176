//! Errors reported by the generation and projection passes.
//!
//! Two families are distinguished:
//!
//! + configuration errors: invalid geometry, phantom or projector set-up,
//!   detected before any voxel or pixel is computed;
//!
//! + range errors: a region or projection index outside the configured
//!   bounds, rejected by the call which asked for it.
//!
//! Rays which miss the volume, or voxels outside every primitive, are not
//! errors: they simply contribute zero.

use thiserror::Error;

use crate::index::{BoxDim_u, Index3_i};
use crate::region::SubRegion;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {

    // ----- Configuration: image metadata -------------------------------------------
    #[error("Image size must be positive along every axis, got {size:?}")]
    NonPositiveSize { size: BoxDim_u },

    #[error("Voxel spacing must be positive and finite along every axis, got {spacing:?}")]
    NonPositiveSpacing { spacing: [f32; 3] },

    #[error("Origin must be finite, got {origin:?}")]
    NonFiniteOrigin { origin: [f32; 3] },

    #[error("Image direction must be an orthonormal matrix")]
    NonOrthonormalDirection,

    #[error("Buffer of {actual} values cannot hold an image of {expected} voxels")]
    DataLength { expected: usize, actual: usize },

    #[error("Image buffer does not match its shape")]
    Shape(#[from] ndarray::ShapeError),

    // ----- Configuration: phantoms -------------------------------------------------
    #[error("Semi-axes of a quadric must be positive and finite, got {semi_axes:?}")]
    InvalidSemiAxes { semi_axes: [f32; 3] },

    #[error("Rotation of a quadric must be an orthonormal matrix")]
    NonOrthonormalRotation,

    #[error("Clip plane normal must be non-zero and finite, got {normal:?}")]
    InvalidClipPlane { normal: [f32; 3] },

    #[error("Density of a quadric must be finite, got {density}")]
    NonFiniteDensity { density: f32 },

    #[error("A phantom needs at least one primitive")]
    EmptyPhantom,

    #[error("Phantom scale factor must be positive and finite, got {0}")]
    InvalidScale(f32),

    // ----- Configuration: projection geometry --------------------------------------
    #[error("Projection {index}: source to isocentre distance must be positive and finite, got {sid} mm")]
    InvalidSourceDistance { index: usize, sid: f32 },

    #[error("Projection {index}: source to detector distance must be non-zero and finite, got {sdd} mm")]
    InvalidDetectorDistance { index: usize, sdd: f32 },

    #[error("Projection {index}: offsets and angles must be finite")]
    NonFiniteProjectionParameter { index: usize },

    // ----- Configuration: forward projector ----------------------------------------
    #[error("Forward projector requires an attenuation input (volume or phantom)")]
    MissingAttenuation,

    #[error("Forward projector requires a projection stack to accumulate into")]
    MissingProjections,

    #[error("Forward projector requires a projection geometry")]
    MissingGeometry,

    #[error("Projection geometry contains no projections")]
    EmptyGeometry,

    #[error("Attenuation and projection inputs are both in {0:?} space")]
    SameSpace(crate::image::Space),

    #[error("Expected an image in {expected:?} space, got one in {actual:?} space")]
    WrongSpace { expected: crate::image::Space, actual: crate::image::Space },

    #[error("Projection stacks must have an identity direction matrix")]
    RotatedDetector,

    #[error("Projection stack holds {stack} projections but the geometry describes only {geometry}")]
    TooManyProjections { stack: usize, geometry: usize },

    #[error("Trilinear sampling step fraction must be finite and at least 1e-3, got {0}")]
    InvalidStepFraction(f32),

    #[error("Projection stack metadata differs from the one the projector was configured with")]
    StackMismatch,

    // ----- Range -------------------------------------------------------------------
    #[error("Region {region:?} is not contained in extent starting at {index:?} of size {size:?}")]
    RegionOutOfBounds { region: SubRegion, index: Index3_i, size: BoxDim_u },

    #[error("Projection index {index} out of range for geometry with {len} projections")]
    ProjectionOutOfRange { index: usize, len: usize },

    // ----- Ambient -----------------------------------------------------------------
    #[error("Could not read or write {path:?}")]
    Io { path: std::path::PathBuf, source: std::io::Error },

    #[error("Could not parse configuration")]
    Config(#[from] toml::de::Error),
}

impl Error {

    /// Invalid set-up, detected before any work was started
    pub fn is_configuration(&self) -> bool {
        !self.is_range() && !matches!(self, Self::Io { .. })
    }

    /// A request outside the configured bounds
    pub fn is_range(&self) -> bool {
        matches!(self, Self::RegionOutOfBounds { .. } | Self::ProjectionOutOfRange { .. })
    }
}
