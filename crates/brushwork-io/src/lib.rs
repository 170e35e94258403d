//! # Brushwork I/O
//!
//! Everything a layer touches outside its own memory: reading and decoding
//! source images, streaming the finished raster to a PNG file, choosing where
//! that file goes, and the serde settings a layer is built from.

pub mod loader;
pub mod output;
pub mod settings;
pub mod sink;

pub use loader::{decode_image, load_image, ImageError, ImageSource};
pub use output::{DirAllocator, FixedPath, OutputAllocator};
pub use settings::LayerSettings;
pub use sink::{encode_png, PngSink, Sink, SinkError};
