//! # Brushwork Core
//!
//! Geometric primitives, colours, the bounding-box accumulator and the
//! raster surface that every Brushwork layer draws onto.

pub mod color;
pub mod geometry;
pub mod surface;

pub use color::{Color, ColorStop};
pub use geometry::{BoundingBox, Point, Rect};
pub use surface::{Surface, SurfaceError, SurfaceHandle};
