use async_trait::async_trait;
use brushwork_core::{Color, Rect, SurfaceHandle};
use serde::{Deserialize, Serialize};
use tiny_skia::{Paint, PathBuilder};

use super::{Brush, BrushKind};
use crate::error::{BrushError, LayerError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeOptions {
    pub color: Color,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectOptions {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// `None` leaves the interior untouched (outline only).
    #[serde(default = "default_fill")]
    pub fill: Option<Color>,
    #[serde(default)]
    pub stroke: Option<StrokeOptions>,
}

fn default_fill() -> Option<Color> {
    Some(Color::BLACK)
}

impl RectOptions {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            fill: default_fill(),
            stroke: None,
        }
    }

    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }

    pub fn with_stroke(mut self, color: Color, width: f32) -> Self {
        self.stroke = Some(StrokeOptions { color, width });
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::from_xywh(self.x, self.y, self.width, self.height)
    }

    pub(crate) fn validate(&self) -> Result<(), LayerError> {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(LayerError::configuration("rectangle geometry must be finite"));
        }
        if let Some(stroke) = self.stroke {
            if !(stroke.width.is_finite() && stroke.width > 0.0) {
                return Err(LayerError::configuration(format!(
                    "stroke width must be positive, got {}",
                    stroke.width
                )));
            }
        }
        Ok(())
    }
}

/// A filled and/or outlined axis-aligned rectangle.
#[derive(Debug)]
pub struct RectBrush {
    surface: SurfaceHandle,
    options: RectOptions,
    bounds: Option<Rect>,
}

impl RectBrush {
    pub fn new(surface: SurfaceHandle, options: RectOptions) -> Self {
        Self {
            surface,
            options,
            bounds: None,
        }
    }

    pub fn options(&self) -> &RectOptions {
        &self.options
    }
}

#[async_trait]
impl Brush for RectBrush {
    fn kind(&self) -> BrushKind {
        BrushKind::Rectangle
    }

    async fn render(&mut self) -> Result<(), BrushError> {
        let rect = self.options.rect();
        let mut affected = rect;

        self.surface.with(|surface| {
            if let Some(fill) = self.options.fill {
                let mut paint = Paint::default();
                paint.set_color(fill.to_skia());
                surface.fill_rect(rect, &paint);
            }
            if let Some(stroke) = self.options.stroke {
                if let Some(path) = rect.to_skia().map(PathBuilder::from_rect) {
                    let mut paint = Paint::default();
                    paint.set_color(stroke.color.to_skia());
                    surface.stroke_path(&path, &paint, stroke.width);
                }
                affected = rect.outset(stroke.width / 2.0);
            }
        })?;

        self.bounds = Some(affected);
        Ok(())
    }

    fn bounds(&self) -> Option<Rect> {
        self.bounds
    }
}
