//! # Brushwork Layer
//!
//! Composes one raster image from brushes. A [`Layer`] collects brushes and
//! prerequisite jobs, waits for every job, renders the brushes in order onto
//! its surface, tracks the union of what they drew and writes the result to
//! a PNG file.

pub mod brush;
pub mod error;
pub mod job;
pub mod layer;

pub use brush::{
    Brush, BrushKind, FontSource, GradientBrush, GradientKind, GradientOptions, ImageBrush,
    ImageOptions, Placement, PrinterBrush, PrinterOptions, RectBrush, RectOptions, StrokeOptions,
};
pub use error::{BrushError, LayerError};
pub use job::JobQueue;
pub use layer::{Layer, RenderOutput, RenderState};
