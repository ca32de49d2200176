//! Configuration files

pub mod scan;

pub use scan::{read_config_file, Config};
