//! Image loading into surface-ready pixmaps.
//!
//! Decoding itself is delegated to the `image` crate; this module only moves
//! bytes off disk, runs the decoder on the blocking pool and converts the
//! result to tiny-skia's premultiplied layout.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tiny_skia::Pixmap;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("I/O error reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image has no pixels")]
    Empty,

    #[error("Decode task failed: {0}")]
    Task(String),
}

/// Where an image comes from.
#[derive(Clone)]
pub enum ImageSource {
    File(PathBuf),
    Bytes(Arc<[u8]>),
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::File(path) => f.debug_tuple("File").field(path).finish(),
            ImageSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::File(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::File(path.to_path_buf())
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::File(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes.into())
    }
}

/// Read and decode `source` without blocking the async executor.
pub async fn load_image(source: impl Into<ImageSource>) -> Result<Pixmap, ImageError> {
    let bytes: Arc<[u8]> = match source.into() {
        ImageSource::File(path) => {
            let data = tokio::fs::read(&path)
                .await
                .map_err(|source| ImageError::Read { path: path.clone(), source })?;
            log::debug!("Read {} bytes from {}", data.len(), path.display());
            data.into()
        }
        ImageSource::Bytes(bytes) => bytes,
    };

    tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|e| ImageError::Task(e.to_string()))?
}

/// Decode an encoded image (PNG, JPEG) into a premultiplied pixmap.
pub fn decode_image(bytes: &[u8]) -> Result<Pixmap, ImageError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    premultiply_in_place(&mut data);

    let mut pixmap = Pixmap::new(width, height).ok_or(ImageError::Empty)?;
    pixmap.data_mut().copy_from_slice(&data);
    log::debug!("Decoded {}x{} image", width, height);
    Ok(pixmap)
}

fn premultiply_in_place(bytes: &mut [u8]) {
    for px in bytes.chunks_exact_mut(4) {
        let alpha = px[3] as u16;
        px[0] = ((px[0] as u16 * alpha + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * alpha + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * alpha + 127) / 255) as u8;
    }
}
