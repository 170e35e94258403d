use std::sync::{Arc, Mutex};

use thiserror::Error;
use tiny_skia::{
    FillRule, FilterQuality, Paint, Path, Pixmap, PixmapPaint, PremultipliedColorU8, Stroke,
    Transform,
};

use crate::color::Color;
use crate::geometry::Rect;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Cannot allocate a {width}x{height} surface")]
    InvalidSize { width: u32, height: u32 },

    #[error("Surface lock poisoned by a panicked writer")]
    Poisoned,

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid colour: {0}")]
    InvalidColor(String),
}

/// A premultiplied RGBA raster that brushes draw onto.
#[derive(Debug, Clone)]
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        let pixmap = Pixmap::new(width, height).ok_or(SurfaceError::InvalidSize { width, height })?;
        log::debug!("Allocated {}x{} surface", width, height);
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn fill(&mut self, color: Color) {
        self.pixmap.fill(color.to_skia());
    }

    /// Fill `rect` with `paint`. Degenerate rectangles draw nothing.
    pub fn fill_rect(&mut self, rect: Rect, paint: &Paint<'_>) {
        if let Some(r) = rect.to_skia() {
            self.pixmap.fill_rect(r, paint, Transform::identity(), None);
        }
    }

    pub fn fill_path(&mut self, path: &Path, paint: &Paint<'_>) {
        self.pixmap
            .fill_path(path, paint, FillRule::Winding, Transform::identity(), None);
    }

    pub fn stroke_path(&mut self, path: &Path, paint: &Paint<'_>, width: f32) {
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(path, paint, &stroke, Transform::identity(), None);
    }

    /// Blit `image` scaled to cover `dest`.
    pub fn draw_image(&mut self, image: &Pixmap, dest: Rect) -> Result<(), SurfaceError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SurfaceError::InvalidGeometry("image has no pixels".into()));
        }
        if dest.is_empty() {
            return Ok(());
        }

        let scale_x = dest.width() / image.width() as f32;
        let scale_y = dest.height() / image.height() as f32;
        let transform = Transform::from_scale(scale_x, scale_y).post_translate(dest.left, dest.top);

        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, image.as_ref(), &paint, transform, None);
        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<PremultipliedColorU8> {
        self.pixmap.pixel(x, y)
    }

    /// Copy of the current raster, detached from further drawing.
    pub fn snapshot(&self) -> Pixmap {
        self.pixmap.clone()
    }
}

/// Shared, exclusively-locked access to a layer's surface.
///
/// Brushes hold clones of the handle; the lock is only ever taken inside
/// synchronous drawing code and never held across an await.
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    inner: Arc<Mutex<Surface>>,
}

impl SurfaceHandle {
    pub fn new(surface: Surface) -> Self {
        Self {
            inner: Arc::new(Mutex::new(surface)),
        }
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut Surface) -> T) -> Result<T, SurfaceError> {
        let mut guard = self.inner.lock().map_err(|_| SurfaceError::Poisoned)?;
        Ok(f(&mut guard))
    }

    pub fn snapshot(&self) -> Result<Pixmap, SurfaceError> {
        self.with(|surface| surface.snapshot())
    }

    pub fn dimensions(&self) -> Result<(u32, u32), SurfaceError> {
        self.with(|surface| (surface.width(), surface.height()))
    }
}
