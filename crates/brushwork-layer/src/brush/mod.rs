//! Drawable units bound to a layer's surface.
//!
//! Every brush draws itself in `render` and reports the rectangle it touched
//! through `bounds` afterwards. The layer never looks inside a brush beyond
//! that contract.

pub mod gradient;
pub mod image;
pub mod printer;
pub mod rect;

use std::fmt::Debug;

use async_trait::async_trait;
use brushwork_core::Rect;
use serde::{Deserialize, Serialize};

use crate::error::BrushError;

pub use gradient::{GradientBrush, GradientKind, GradientOptions};
pub use image::{ImageBrush, ImageOptions};
pub use printer::{FontSource, PrinterBrush, PrinterOptions};
pub use rect::{RectBrush, RectOptions, StrokeOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushKind {
    Rectangle,
    LinearGradient,
    RadialGradient,
    Image,
    Printer,
    /// Brushes implemented outside this crate.
    Custom,
}

#[async_trait]
pub trait Brush: Debug + Send {
    fn kind(&self) -> BrushKind {
        BrushKind::Custom
    }

    /// Draw onto the bound surface.
    async fn render(&mut self) -> Result<(), BrushError>;

    /// Area affected by the last render; `None` before rendering or when
    /// nothing was drawn.
    fn bounds(&self) -> Option<Rect>;
}

/// Where an image lands on the surface.
///
/// `width` alone draws a `width x width` square; `width` and `height`
/// stretch to that box; anything else uses the image's natural size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
}

impl Placement {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            width: None,
            height: None,
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn dest_rect(&self, natural_width: u32, natural_height: u32) -> Rect {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Rect::from_xywh(self.x, self.y, w, h),
            (Some(w), None) => Rect::from_xywh(self.x, self.y, w, w),
            (None, _) => Rect::from_xywh(
                self.x,
                self.y,
                natural_width as f32,
                natural_height as f32,
            ),
        }
    }
}
