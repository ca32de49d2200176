/// Quantities which are simply type aliases for `f32` rather than having an
/// implementation as a `uom` `Quantity`.
///
/// These appear in the inner loops of rasterization and ray casting, where
/// every value is already expressed in millimetres (or per millimetre), and
/// where `uom` arithmetic on `nalgebra` vectors is not available. The aliases
/// still give some clues in the source as to what the numbers represent.

/// Length in mm
pub type Lengthf32    = f32;

/// Attenuation coefficient (per mm), or dimensionless phantom density
pub type Densityf32   = f32;

/// Line integral of attenuation: the value stored in a projection pixel
pub type Intensityf32 = f32;

/// Length of a ray inside one voxel, used as the weight of that voxel's value
pub type Weightf32    = f32;
