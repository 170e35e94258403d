//! PNG persistence.
//!
//! Pixels are streamed row by row through the encoder; a write is complete
//! only once the stream writer has been finished and the file flushed.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tiny_skia::Pixmap;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("Write task failed: {0}")]
    Task(String),
}

/// Destination for a finished raster.
#[async_trait]
pub trait Sink: std::fmt::Debug + Send + Sync {
    /// Persist `image` at `path`, returning the number of bytes written.
    async fn write(&self, image: Pixmap, path: &Path) -> Result<u64, SinkError>;
}

/// Writes PNG files to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngSink;

#[async_trait]
impl Sink for PngSink {
    async fn write(&self, image: Pixmap, path: &Path) -> Result<u64, SinkError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || write_png_file(&image, &path))
            .await
            .map_err(|e| SinkError::Task(e.to_string()))?
    }
}

fn write_png_file(image: &Pixmap, path: &Path) -> Result<u64, SinkError> {
    let io_err = |source: io::Error| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    write_png(&mut out, image)?;
    out.flush().map_err(io_err)?;

    let written = fs::metadata(path).map_err(io_err)?.len();
    log::info!("Wrote {} ({} bytes)", path.display(), written);
    Ok(written)
}

/// Encode `image` as PNG into memory.
pub fn encode_png(image: &Pixmap) -> Result<Vec<u8>, SinkError> {
    let mut buffer = Vec::new();
    write_png(&mut buffer, image)?;
    Ok(buffer)
}

/// Stream `image` as an 8-bit RGBA PNG into `out`, un-premultiplying rows.
pub fn write_png<W: Write>(out: W, image: &Pixmap) -> Result<(), SinkError> {
    let mut encoder = png::Encoder::new(out, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    let mut stream = writer.stream_writer()?;

    let mut row = Vec::with_capacity(image.width() as usize * 4);
    for pixels in image.pixels().chunks_exact(image.width() as usize) {
        row.clear();
        for px in pixels {
            let c = px.demultiply();
            row.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        stream.write_all(&row).map_err(png::EncodingError::from)?;
    }

    stream.finish()?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Pixmap {
        let mut pixmap = Pixmap::new(3, 2).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(10, 20, 30, 255));
        pixmap
    }

    #[test]
    fn test_encode_png_decodes_back() {
        let bytes = encode_png(&checker()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = crate::loader::decode_image(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        let px = decoded.pixel(2, 1).unwrap();
        assert_eq!((px.red(), px.green(), px.blue()), (10, 20, 30));
    }

    #[test]
    fn test_write_png_into_borrowed_writer() {
        let mut buffer = Vec::new();
        write_png(&mut buffer, &checker()).unwrap();
        // Trailing IEND chunk: zero length, type, fixed CRC.
        assert_eq!(&buffer[buffer.len() - 12..buffer.len() - 4], b"\0\0\0\0IEND");
        assert_eq!(buffer.windows(4).filter(|w| w == b"IEND").count(), 1);
        assert_eq!(buffer, encode_png(&checker()).unwrap());
    }

    #[tokio::test]
    async fn test_png_sink_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");

        let written = PngSink.write(checker(), &path).await.unwrap();
        assert!(written > 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), written);
    }

    #[tokio::test]
    async fn test_png_sink_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory already occupies the target path.
        let err = PngSink.write(checker(), dir.path()).await.unwrap_err();
        assert!(matches!(err, SinkError::Io { .. }));
    }
}
