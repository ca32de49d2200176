//! Reading and writing images

pub mod raw;
