use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use brushwork_core::{Color, Rect, SurfaceHandle};
use serde::Deserialize;
use tiny_skia::{Paint, Path, PathBuilder};
use ttf_parser::{Face, OutlineBuilder};

use super::{Brush, BrushKind};
use crate::error::{BrushError, LayerError};

/// TrueType/OpenType font data, read lazily when the brush renders.
#[derive(Clone, Deserialize)]
#[serde(from = "PathBuf")]
pub enum FontSource {
    File(PathBuf),
    Bytes(Arc<[u8]>),
}

impl fmt::Debug for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSource::File(path) => f.debug_tuple("File").field(path).finish(),
            FontSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

impl From<PathBuf> for FontSource {
    fn from(path: PathBuf) -> Self {
        FontSource::File(path)
    }
}

impl From<Vec<u8>> for FontSource {
    fn from(bytes: Vec<u8>) -> Self {
        FontSource::Bytes(bytes.into())
    }
}

impl FontSource {
    async fn read(&self) -> Result<Arc<[u8]>, BrushError> {
        match self {
            FontSource::File(path) => tokio::fs::read(path)
                .await
                .map(Arc::from)
                .map_err(|source| BrushError::FontRead {
                    path: path.clone(),
                    source,
                }),
            FontSource::Bytes(bytes) => Ok(Arc::clone(bytes)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrinterOptions {
    pub text: String,
    /// Left edge of the first line.
    pub x: f32,
    /// Top of the first line; the baseline sits one ascender below.
    pub y: f32,
    pub font: FontSource,
    #[serde(default = "default_size")]
    pub size: f32,
    #[serde(default)]
    pub color: Color,
}

fn default_size() -> f32 {
    16.0
}

impl PrinterOptions {
    pub fn new(text: impl Into<String>, x: f32, y: f32, font: impl Into<FontSource>) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font: font.into(),
            size: default_size(),
            color: Color::BLACK,
        }
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), LayerError> {
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(LayerError::configuration(format!(
                "font size must be positive, got {}",
                self.size
            )));
        }
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(LayerError::configuration("text position must be finite"));
        }
        Ok(())
    }
}

/// Prints text by filling glyph outlines. No shaping: one glyph per char,
/// advanced by horizontal metrics, `\n` starts a new line.
#[derive(Debug)]
pub struct PrinterBrush {
    surface: SurfaceHandle,
    options: PrinterOptions,
    bounds: Option<Rect>,
}

impl PrinterBrush {
    pub fn new(surface: SurfaceHandle, options: PrinterOptions) -> Self {
        Self {
            surface,
            options,
            bounds: None,
        }
    }

    fn outline(&self, font: &[u8]) -> Result<Option<Path>, BrushError> {
        let face = Face::parse(font, 0).map_err(|e| BrushError::Font(e.to_string()))?;
        let scale = self.options.size / face.units_per_em() as f32;
        let line_height =
            (face.ascender() as f32 - face.descender() as f32 + face.line_gap() as f32) * scale;

        let mut pen = GlyphPen {
            builder: PathBuilder::new(),
            scale,
            origin_x: self.options.x,
            baseline: self.options.y + face.ascender() as f32 * scale,
        };

        for ch in self.options.text.chars() {
            if ch == '\n' {
                pen.origin_x = self.options.x;
                pen.baseline += line_height;
                continue;
            }
            let Some(glyph) = face.glyph_index(ch) else {
                log::debug!("No glyph for {:?}, skipping", ch);
                continue;
            };
            face.outline_glyph(glyph, &mut pen);
            pen.origin_x += face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
        }

        Ok(pen.builder.finish())
    }
}

#[async_trait]
impl Brush for PrinterBrush {
    fn kind(&self) -> BrushKind {
        BrushKind::Printer
    }

    async fn render(&mut self) -> Result<(), BrushError> {
        if self.options.text.trim().is_empty() {
            self.bounds = None;
            return Ok(());
        }

        let font = self.options.font.read().await?;
        let Some(path) = self.outline(&font)? else {
            self.bounds = None;
            return Ok(());
        };

        let mut paint = Paint::default();
        paint.set_color(self.options.color.to_skia());
        self.surface.with(|surface| surface.fill_path(&path, &paint))?;
        self.bounds = Some(Rect::from_skia(path.bounds()));
        Ok(())
    }

    fn bounds(&self) -> Option<Rect> {
        self.bounds
    }
}

/// Maps font units (y up) onto surface pixels (y down).
struct GlyphPen {
    builder: PathBuilder,
    scale: f32,
    origin_x: f32,
    baseline: f32,
}

impl GlyphPen {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPen {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brushwork_core::Surface;

    // Two glyphs: .notdef and "A" (units per em 1000, ascender 1024,
    // descender -400, "A" advances 540).
    const DEMO_FONT: &[u8] = include_bytes!("../../fixtures/demo.ttf");

    fn handle() -> SurfaceHandle {
        SurfaceHandle::new(Surface::new(16, 16).unwrap())
    }

    fn approx(actual: f32, expected: f32) -> bool {
        (actual - expected).abs() < 0.01
    }

    #[tokio::test]
    async fn test_renders_glyph_outline() {
        let surface = SurfaceHandle::new(Surface::new(64, 64).unwrap());
        let options = PrinterOptions::new("A", 10.0, 10.0, DEMO_FONT.to_vec())
            .with_size(50.0)
            .with_color(Color::rgb(0, 0, 255));
        let mut brush = PrinterBrush::new(surface.clone(), options);
        brush.render().await.unwrap();

        // Baseline sits at 10 + 1024 * 0.05; "A" covers 6..541 x 0..656 units.
        let bounds = brush.bounds().unwrap();
        assert!(approx(bounds.left, 10.3), "{:?}", bounds);
        assert!(approx(bounds.top, 28.4), "{:?}", bounds);
        assert!(approx(bounds.right, 37.05), "{:?}", bounds);
        assert!(approx(bounds.bottom, 61.2), "{:?}", bounds);

        let (leg, outside) = surface
            .with(|s| (s.pixel(14, 56).unwrap(), s.pixel(50, 50).unwrap()))
            .unwrap();
        assert!(leg.blue() > 200 && leg.alpha() > 200);
        assert_eq!(outside.alpha(), 0);
    }

    #[tokio::test]
    async fn test_newline_starts_next_line() {
        let options = PrinterOptions::new("A\nA", 0.0, 0.0, DEMO_FONT.to_vec()).with_size(10.0);
        let mut brush = PrinterBrush::new(handle(), options);
        brush.render().await.unwrap();

        // Second baseline is one line height (1424 units) below the first.
        let bounds = brush.bounds().unwrap();
        assert!(approx(bounds.left, 0.06), "{:?}", bounds);
        assert!(approx(bounds.right, 5.41), "{:?}", bounds);
        assert!(approx(bounds.bottom, 10.24 + 14.24), "{:?}", bounds);
    }

    #[tokio::test]
    async fn test_missing_glyphs_are_skipped() {
        let options = PrinterOptions::new("zA", 0.0, 0.0, DEMO_FONT.to_vec()).with_size(10.0);
        let mut brush = PrinterBrush::new(handle(), options);
        brush.render().await.unwrap();

        // "z" has no glyph and no advance, so "A" starts at the origin.
        assert!(approx(brush.bounds().unwrap().left, 0.06));
    }

    #[tokio::test]
    async fn test_blank_text_draws_nothing() {
        // The font is never read for blank text.
        let options = PrinterOptions::new("  \n ", 0.0, 0.0, PathBuf::from("/nonexistent.ttf"));
        let mut brush = PrinterBrush::new(handle(), options);
        brush.render().await.unwrap();
        assert_eq!(brush.bounds(), None);
    }

    #[tokio::test]
    async fn test_invalid_font_data() {
        let options = PrinterOptions::new("hi", 0.0, 0.0, b"not a font".to_vec());
        let mut brush = PrinterBrush::new(handle(), options);
        assert!(matches!(brush.render().await, Err(BrushError::Font(_))));
    }

    #[tokio::test]
    async fn test_missing_font_file() {
        let dir = tempfile::tempdir().unwrap();
        let options = PrinterOptions::new("hi", 0.0, 0.0, dir.path().join("none.ttf"));
        let mut brush = PrinterBrush::new(handle(), options);
        assert!(matches!(brush.render().await, Err(BrushError::FontRead { .. })));
    }

    #[test]
    fn test_options_from_json() {
        let options: PrinterOptions = serde_json::from_value(serde_json::json!({
            "text": "Label", "x": 4, "y": 8, "font": "fonts/Inter.ttf", "color": "#ff0000"
        }))
        .unwrap();
        assert_eq!(options.size, 16.0);
        assert_eq!(options.color, Color::rgb(255, 0, 0));
        assert!(matches!(options.font, FontSource::File(ref p) if p.ends_with("Inter.ttf")));
        assert!(options.validate().is_ok());
        assert!(options.with_size(0.0).validate().is_err());
    }

    #[test]
    fn test_pen_flips_y_axis() {
        let pen = GlyphPen {
            builder: PathBuilder::new(),
            scale: 0.5,
            origin_x: 10.0,
            baseline: 20.0,
        };
        assert_eq!(pen.map(4.0, 8.0), (12.0, 16.0));
    }
}
