//! Images as raw little-endian `f32` arrays, x fastest.
//!
//! The files carry no metadata: the geometry used to write an image must be
//! supplied again when it is read back.

use std::fs::File;
use std::io::{Write, Read, BufWriter, BufReader};
use std::path::Path;

use log::info;

use crate::error::{Error, Result};
use crate::grid::VolumeGeometry;
use crate::image::Image;

type IORes<T> = std::io::Result<T>;

pub fn write(data: impl Iterator<Item = f32>, path: &Path) -> IORes<()> {
    let file = File::create(path)?;
    let mut buf = BufWriter::new(file);
    for datum in data {
        buf.write_all(&datum.to_le_bytes())?;
    }
    buf.flush()
}

pub fn read<'a>(path: &Path) -> IORes<impl Iterator<Item = IORes<f32>> + 'a> {
    let file = File::open(path)?;
    let mut buf = BufReader::new(file);
    let mut buffer = [0; 4];

    Ok(std::iter::from_fn(move || {
        use std::io::ErrorKind::UnexpectedEof;
        match buf.read_exact(&mut buffer) {
            Ok(()) => Some(Ok(f32::from_le_bytes(buffer))),
            Err(e) if e.kind() == UnexpectedEof => None,
            Err(e) => Some(Err(e)),
        }
    }))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Io { path: path.to_path_buf(), source }
}

/// Write the voxel values of `image` to `path`
pub fn write_image(image: &Image, path: &Path) -> Result<()> {
    info!("Writing {:?} voxels to {}", image.geometry().size(), path.display());
    write(image.data().iter().copied(), path).map_err(io_error(path))
}

/// Read an image with the given geometry from `path`. The file must hold
/// exactly as many values as the geometry has voxels.
pub fn read_image(geometry: VolumeGeometry, path: &Path) -> Result<Image> {
    let data = read(path)
        .and_then(|values| values.collect::<IORes<Vec<_>>>())
        .map_err(io_error(path))?;
    Image::new(geometry, data)
}
