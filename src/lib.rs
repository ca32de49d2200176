//! Simulated cone-beam CT acquisitions: analytic phantoms made of quadrics,
//! their rasterization onto voxel grids, and forward projection of volumes or
//! phantoms along circular source trajectories.

mod exports;
pub use exports::*;

pub mod error;
pub mod index;
pub mod region;
pub mod grid;
pub mod image;
pub mod source;
pub mod phantom;
pub mod rasterize;
pub mod projection_geometry;
pub mod projector;
pub mod config;
pub mod io;
pub mod utils;
