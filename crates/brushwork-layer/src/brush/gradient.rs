use async_trait::async_trait;
use brushwork_core::{ColorStop, Point, Rect, SurfaceHandle};
use serde::{Deserialize, Serialize};
use tiny_skia::{LinearGradient, Paint, RadialGradient, SpreadMode, Transform};

use super::{Brush, BrushKind};
use crate::error::{BrushError, LayerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

impl GradientKind {
    /// Absent or empty selects linear; `radial` in any case selects radial.
    /// Anything else is a configuration error.
    pub fn from_option(kind: Option<&str>) -> Result<Self, LayerError> {
        match kind {
            None | Some("") => Ok(GradientKind::Linear),
            Some(k) if k.eq_ignore_ascii_case("radial") => Ok(GradientKind::Radial),
            Some(other) => Err(LayerError::configuration(format!(
                "unknown gradient type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientOptions {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub stops: Vec<ColorStop>,
    /// Linear only. Defaults to the middle of the left edge.
    pub start: Option<Point>,
    /// Linear only. Defaults to the middle of the right edge.
    pub end: Option<Point>,
    /// Radial only. Defaults to the centre of the area.
    pub center: Option<Point>,
    /// Radial only. Defaults to half the longer side.
    pub radius: Option<f32>,
}

impl GradientOptions {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_type(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    pub fn with_stop(mut self, stop: ColorStop) -> Self {
        self.stops.push(stop);
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::from_xywh(self.x, self.y, self.width, self.height)
    }
}

/// Fills a rectangle with a linear or radial gradient.
#[derive(Debug)]
pub struct GradientBrush {
    surface: SurfaceHandle,
    kind: GradientKind,
    options: GradientOptions,
    bounds: Option<Rect>,
}

impl GradientBrush {
    /// Validates `options` and resolves the gradient type.
    pub fn new(surface: SurfaceHandle, options: GradientOptions) -> Result<Self, LayerError> {
        let kind = GradientKind::from_option(options.kind.as_deref())?;
        if options.stops.iter().any(|s| !(0.0..=1.0).contains(&s.offset)) {
            return Err(LayerError::configuration("gradient stop offsets must lie in 0..=1"));
        }
        if let Some(radius) = options.radius {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(LayerError::configuration(format!(
                    "radial gradient radius must be positive, got {}",
                    radius
                )));
            }
        }

        Ok(Self {
            surface,
            kind,
            options,
            bounds: None,
        })
    }

    pub fn gradient_kind(&self) -> GradientKind {
        self.kind
    }

    fn paint(&self, area: Rect) -> Result<Paint<'static>, BrushError> {
        let stops = self.options.stops.iter().map(|s| s.to_skia()).collect();
        let shader = match self.kind {
            GradientKind::Linear => {
                let mid_y = area.center().y;
                let start = self.options.start.unwrap_or(Point::new(area.left, mid_y));
                let end = self.options.end.unwrap_or(Point::new(area.right, mid_y));
                LinearGradient::new(
                    start.to_skia(),
                    end.to_skia(),
                    stops,
                    SpreadMode::Pad,
                    Transform::identity(),
                )
            }
            GradientKind::Radial => {
                let center = self.options.center.unwrap_or(area.center());
                let radius = self
                    .options
                    .radius
                    .unwrap_or(area.width().max(area.height()) / 2.0);
                RadialGradient::new(
                    center.to_skia(),
                    center.to_skia(),
                    radius,
                    stops,
                    SpreadMode::Pad,
                    Transform::identity(),
                )
            }
        }
        .ok_or_else(|| BrushError::Gradient(format!("degenerate {:?} gradient", self.kind)))?;

        let mut paint = Paint::default();
        paint.shader = shader;
        Ok(paint)
    }
}

#[async_trait]
impl Brush for GradientBrush {
    fn kind(&self) -> BrushKind {
        match self.kind {
            GradientKind::Linear => BrushKind::LinearGradient,
            GradientKind::Radial => BrushKind::RadialGradient,
        }
    }

    async fn render(&mut self) -> Result<(), BrushError> {
        let area = self.options.rect();
        // Without stops there is nothing to paint, but the area still counts.
        if area.is_empty() || self.options.stops.is_empty() {
            self.bounds = Some(area);
            return Ok(());
        }

        let paint = self.paint(area)?;
        self.surface.with(|surface| surface.fill_rect(area, &paint))?;
        self.bounds = Some(area);
        Ok(())
    }

    fn bounds(&self) -> Option<Rect> {
        self.bounds
    }
}
