pub use crate::error::{Error, Result};
pub use crate::grid::VolumeGeometry;
pub use crate::image::{Accumulate, Image, Space};
pub use crate::index::{BoxDim_u, Index1_u, Index3_i, Index3_u};
pub use crate::phantom::{shepp_logan, HalfSpace, Phantom, QuadricPrimitive};
pub use crate::projection_geometry::{DetectorFrame, ProjectionEntry, ProjectionGeometry};
pub use crate::projector::{Attenuation, ForwardProjector, Projection, Sampling};
pub use crate::region::SubRegion;
pub use crate::source::ConstantSource;

pub use geometry::{Matrix, Point, Vector};
pub use units::plain::{Densityf32, Intensityf32, Lengthf32, Weightf32};
pub use units::{Angle, Length};
