use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use brushwork_core::{Rect, SurfaceHandle};
use brushwork_io::{load_image, ImageError, ImageSource};
use serde::{Deserialize, Serialize};
use tiny_skia::Pixmap;

use super::{Brush, BrushKind, Placement};
use crate::error::{BrushError, LayerError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOptions {
    pub source: PathBuf,
    #[serde(flatten)]
    pub placement: Placement,
}

impl ImageOptions {
    pub fn new(source: impl Into<PathBuf>, placement: Placement) -> Self {
        Self {
            source: source.into(),
            placement,
        }
    }
}

/// Draws an external image. Its pixels must be loaded before `render`.
#[derive(Debug)]
pub struct ImageBrush {
    surface: SurfaceHandle,
    source: ImageSource,
    placement: Placement,
    image: Arc<OnceLock<Pixmap>>,
    bounds: Option<Rect>,
}

impl ImageBrush {
    pub fn new(
        surface: SurfaceHandle,
        source: impl Into<ImageSource>,
        placement: Placement,
    ) -> Self {
        Self {
            surface,
            source: source.into(),
            placement,
            image: Arc::new(OnceLock::new()),
            bounds: None,
        }
    }

    pub fn from_options(surface: SurfaceHandle, options: ImageOptions) -> Self {
        Self::new(surface, options.source, options.placement)
    }

    pub fn is_loaded(&self) -> bool {
        self.image.get().is_some()
    }

    pub async fn load_image(&self) -> Result<(), ImageError> {
        self.load_job().await
    }

    /// A detached load that fills this brush's pixels when awaited.
    ///
    /// The returned future owns everything it needs, so it can sit in a job
    /// queue while the brush itself is queued separately.
    pub fn load_job(&self) -> impl Future<Output = Result<(), ImageError>> + Send + 'static {
        let source = self.source.clone();
        let slot = Arc::clone(&self.image);
        async move {
            if slot.get().is_some() {
                return Ok(());
            }
            let pixmap = load_image(source).await?;
            let _ = slot.set(pixmap);
            Ok(())
        }
    }

    pub(crate) fn layer_job(
        &self,
    ) -> impl Future<Output = Result<(), LayerError>> + Send + 'static {
        let load = self.load_job();
        async move { load.await.map_err(LayerError::from) }
    }
}

#[async_trait]
impl Brush for ImageBrush {
    fn kind(&self) -> BrushKind {
        BrushKind::Image
    }

    async fn render(&mut self) -> Result<(), BrushError> {
        let image = self.image.get().ok_or(BrushError::ImageNotLoaded)?;
        let dest = self.placement.dest_rect(image.width(), image.height());
        self.surface.with(|surface| surface.draw_image(image, dest))??;
        self.bounds = Some(dest);
        Ok(())
    }

    fn bounds(&self) -> Option<Rect> {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brushwork_core::Surface;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ::image::RgbaImage::from_pixel(width, height, ::image::Rgba([0, 255, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ::image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn handle() -> SurfaceHandle {
        SurfaceHandle::new(Surface::new(64, 64).unwrap())
    }

    #[tokio::test]
    async fn test_render_before_load_fails() {
        let mut brush = ImageBrush::new(handle(), png(2, 2), Placement::at(0.0, 0.0));
        assert!(!brush.is_loaded());
        assert!(matches!(brush.render().await, Err(BrushError::ImageNotLoaded)));
        assert_eq!(brush.bounds(), None);
    }

    #[tokio::test]
    async fn test_load_then_render_square_width() {
        let surface = handle();
        let mut brush = ImageBrush::new(
            surface.clone(),
            png(4, 2),
            Placement::at(10.0, 10.0).with_width(20.0),
        );
        brush.load_image().await.unwrap();
        assert!(brush.is_loaded());

        brush.render().await.unwrap();
        assert_eq!(brush.bounds(), Some(Rect::from_ltrb(10.0, 10.0, 30.0, 30.0)));
        let px = surface.with(|s| s.pixel(20, 25).unwrap()).unwrap();
        assert_eq!(px.green(), 255);
    }

    #[tokio::test]
    async fn test_detached_job_fills_brush() {
        let mut brush = ImageBrush::new(handle(), png(3, 3), Placement::at(1.0, 1.0));
        let job = brush.load_job();
        job.await.unwrap();

        brush.render().await.unwrap();
        assert_eq!(brush.bounds(), Some(Rect::from_ltrb(1.0, 1.0, 4.0, 4.0)));
    }

    #[tokio::test]
    async fn test_missing_file_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let options = ImageOptions::new(dir.path().join("gone.png"), Placement::at(0.0, 0.0));
        let brush = ImageBrush::from_options(handle(), options);
        assert!(matches!(brush.load_image().await, Err(ImageError::Read { .. })));
    }

    #[test]
    fn test_options_flatten_placement() {
        let options: ImageOptions = serde_json::from_value(serde_json::json!({
            "source": "tiles/a.png", "x": 5, "y": 6, "width": 7
        }))
        .unwrap();
        assert_eq!(options.placement, Placement::at(5.0, 6.0).with_width(7.0));
    }
}
