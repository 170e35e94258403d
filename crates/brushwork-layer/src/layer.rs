use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use brushwork_core::{BoundingBox, Surface, SurfaceHandle};
use brushwork_io::{load_image, ImageSource, LayerSettings, OutputAllocator, PngSink, Sink};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{watch, OnceCell};

use crate::brush::{
    Brush, GradientBrush, GradientOptions, ImageBrush, ImageOptions, Placement, PrinterBrush,
    PrinterOptions, RectBrush, RectOptions,
};
use crate::error::LayerError;
use crate::job::JobQueue;

/// Where a layer is in its single forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    Unrendered,
    Rendering,
    Done,
    /// The render pass errored; the layer must be discarded.
    Failed,
}

impl RenderState {
    pub fn is_settled(&self) -> bool {
        matches!(self, RenderState::Done | RenderState::Failed)
    }
}

/// What `render` hands back once the artifact is on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    pub name: String,
    pub bounds: BoundingBox,
}

impl RenderOutput {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

enum QueuedBrush {
    Ready(Box<dyn Brush>),
    Pending(BoxFuture<'static, Result<Box<dyn Brush>, LayerError>>),
}

impl fmt::Debug for QueuedBrush {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueuedBrush::Ready(brush) => f.debug_tuple("Ready").field(brush).finish(),
            QueuedBrush::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Composes one raster from queued brushes and persists it once drawn.
///
/// Drawing happens in a single ordered pass: every job settles, then each
/// brush renders and merges its bounds in insertion order, then the layer
/// flips to [`RenderState::Done`] and the surface is written out. Placed
/// images are the exception: [`Layer::place_image_at`] draws as soon as its
/// image loads, so placements always sit underneath queued brushes.
pub struct Layer {
    name: String,
    settings: LayerSettings,
    surface: SurfaceHandle,
    brushes: Vec<QueuedBrush>,
    jobs: JobQueue,
    bounds: BoundingBox,
    output_path: PathBuf,
    state: Arc<watch::Sender<RenderState>>,
    sink: Arc<dyn Sink>,
    /// Bytes written once the artifact has been persisted.
    saved: OnceCell<u64>,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("brushes", &self.brushes.len())
            .field("jobs", &self.jobs)
            .field("bounds", &self.bounds)
            .field("output_path", &self.output_path)
            .field("saved", &self.saved.get())
            .finish()
    }
}

impl Layer {
    /// Create a layer whose artifact goes to a fresh file in
    /// `settings.output_dir`.
    pub fn new(name: &str, settings: LayerSettings) -> Result<Self, LayerError> {
        let allocator = settings.allocator();
        Self::with_allocator(name, settings, &allocator)
    }

    pub fn with_allocator(
        name: &str,
        settings: LayerSettings,
        allocator: &dyn OutputAllocator,
    ) -> Result<Self, LayerError> {
        let mut surface = Surface::new(settings.width, settings.height)?;
        if let Some(background) = settings.background {
            surface.fill(background);
        }

        let output_path = allocator.allocate(name);
        let (state, _) = watch::channel(RenderState::Unrendered);
        log::info!(
            "Created layer '{}' ({}x{}) -> {}",
            name,
            settings.width,
            settings.height,
            output_path.display()
        );

        Ok(Self {
            name: name.to_string(),
            settings,
            surface: SurfaceHandle::new(surface),
            brushes: Vec::new(),
            jobs: JobQueue::new(),
            bounds: BoundingBox::new(),
            output_path,
            state: Arc::new(state),
            sink: Arc::new(PngSink),
            saved: OnceCell::new(),
        })
    }

    /// Replace the PNG file sink.
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = sink;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn state(&self) -> RenderState {
        *self.state.borrow()
    }

    /// Union of everything drawn so far. Only final once the state is
    /// [`RenderState::Done`].
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    pub fn brush_count(&self) -> usize {
        self.brushes.len()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Observe state transitions from another task.
    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.state.subscribe()
    }

    fn ensure_unrendered(&self) -> Result<(), LayerError> {
        match self.state() {
            RenderState::Unrendered => Ok(()),
            _ => Err(LayerError::State(
                "layer no longer accepts drawing operations",
            )),
        }
    }

    // ── Queueing ─────────────────────────────────────────────────────

    pub fn add<B: Brush + 'static>(&mut self, brush: B) -> Result<&mut Self, LayerError> {
        self.ensure_unrendered()?;
        self.brushes.push(QueuedBrush::Ready(Box::new(brush)));
        Ok(self)
    }

    /// Queue a brush that is still being produced. It is resolved in its
    /// slot of the render pass, after every job has settled.
    pub fn add_pending<F>(&mut self, pending: F) -> Result<&mut Self, LayerError>
    where
        F: Future<Output = Result<Box<dyn Brush>, LayerError>> + Send + 'static,
    {
        self.ensure_unrendered()?;
        self.brushes.push(QueuedBrush::Pending(pending.boxed()));
        Ok(self)
    }

    /// Register a prerequisite that must settle before any brush draws.
    pub fn add_job<F>(&mut self, job: F) -> Result<&mut Self, LayerError>
    where
        F: Future<Output = Result<(), LayerError>> + Send + 'static,
    {
        self.ensure_unrendered()?;
        self.jobs.push(job);
        Ok(self)
    }

    /// Load an image and draw it straight onto the surface, bypassing the
    /// brush queue. `width` alone draws a square; both stretch to the box;
    /// neither keeps the natural size.
    pub async fn place_image_at(
        &mut self,
        source: impl Into<ImageSource>,
        x: f32,
        y: f32,
        width: Option<f32>,
        height: Option<f32>,
    ) -> Result<&mut Self, LayerError> {
        self.ensure_unrendered()?;
        let image = load_image(source).await?;
        let dest = Placement {
            x,
            y,
            width,
            height,
        }
        .dest_rect(image.width(), image.height());

        self.surface.with(|surface| surface.draw_image(&image, dest))??;
        self.bounds.merge(dest);
        log::debug!("Placed image on '{}' at {:?}", self.name, dest);
        Ok(self)
    }

    // ── Brush factories ──────────────────────────────────────────────

    pub fn create_rect(&self, options: RectOptions) -> Result<RectBrush, LayerError> {
        self.ensure_unrendered()?;
        options.validate()?;
        Ok(RectBrush::new(self.surface.clone(), options))
    }

    pub fn create_gradient(&self, options: GradientOptions) -> Result<GradientBrush, LayerError> {
        self.ensure_unrendered()?;
        GradientBrush::new(self.surface.clone(), options)
    }

    /// The brush's image load is queued as a job; the brush itself still has
    /// to be passed to [`Layer::add`].
    pub fn create_image(&mut self, options: ImageOptions) -> Result<ImageBrush, LayerError> {
        self.ensure_unrendered()?;
        let brush = ImageBrush::from_options(self.surface.clone(), options);
        self.jobs.push(brush.layer_job());
        Ok(brush)
    }

    pub fn create_printer(&self, options: PrinterOptions) -> Result<PrinterBrush, LayerError> {
        self.ensure_unrendered()?;
        options.validate()?;
        Ok(PrinterBrush::new(self.surface.clone(), options))
    }

    // ── Render / save ────────────────────────────────────────────────

    /// Settle jobs, draw every brush in order, then persist. Callable once.
    pub async fn render(&mut self) -> Result<RenderOutput, LayerError> {
        if self.state() != RenderState::Unrendered {
            return Err(LayerError::State("render may only be called once"));
        }
        self.state.send_replace(RenderState::Rendering);
        let _abandoned = FailIfAbandoned(Arc::clone(&self.state));
        log::info!(
            "Rendering layer '{}': {} jobs, {} brushes",
            self.name,
            self.jobs.len(),
            self.brushes.len()
        );

        if let Err(err) = self.draw().await {
            self.state.send_replace(RenderState::Failed);
            log::warn!("Layer '{}' failed to render: {}", self.name, err);
            return Err(err);
        }
        self.state.send_replace(RenderState::Done);
        log::info!("Layer '{}' drawn, bounds {:?}", self.name, self.bounds.rect());

        self.save().await?;
        Ok(RenderOutput {
            name: self.name.clone(),
            bounds: self.bounds,
        })
    }

    async fn draw(&mut self) -> Result<(), LayerError> {
        let job_timeout = self.settings.job_timeout();
        let settled = bounded(job_timeout, "job barrier", self.jobs.settle()).await??;
        log::debug!("Job barrier passed for '{}' ({} jobs)", self.name, settled);

        let queued = std::mem::take(&mut self.brushes);
        for (index, entry) in queued.into_iter().enumerate() {
            let mut brush = match entry {
                QueuedBrush::Ready(brush) => brush,
                QueuedBrush::Pending(pending) => pending.await?,
            };
            brush.render().await?;
            if let Some(rect) = brush.bounds() {
                self.bounds.merge(rect);
            }
            log::debug!(
                "Brush #{} ({:?}) rendered on '{}', bounds {:?}",
                index,
                brush.kind(),
                self.name,
                brush.bounds()
            );
        }
        Ok(())
    }

    /// Write the surface to the output path once drawing is done.
    ///
    /// Fails straight away if `render` was never called, and waits for the
    /// render pass to settle otherwise. The file is written once; later calls
    /// return without touching it.
    pub async fn save(&self) -> Result<(), LayerError> {
        if self.state() == RenderState::Unrendered {
            return Err(LayerError::State("render must be called first"));
        }

        let mut changes = self.state.subscribe();
        let wait = async {
            changes
                .wait_for(RenderState::is_settled)
                .await
                .map(|state| *state)
        };
        let settled = bounded(self.settings.save_timeout(), "render completion", wait)
            .await?
            .map_err(|_| LayerError::State("layer dropped while saving"))?;
        if settled == RenderState::Failed {
            return Err(LayerError::State("layer failed to render"));
        }

        self.saved
            .get_or_try_init(|| async {
                let image = self.surface.snapshot()?;
                let written = self.sink.write(image, &self.output_path).await?;
                Ok::<_, LayerError>(written)
            })
            .await?;
        Ok(())
    }
}

/// Moves a render that never settled (its future was dropped mid-pass) to
/// [`RenderState::Failed`] so waiting saves do not hang.
struct FailIfAbandoned(Arc<watch::Sender<RenderState>>);

impl Drop for FailIfAbandoned {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            if *state == RenderState::Rendering {
                *state = RenderState::Failed;
                true
            } else {
                false
            }
        });
    }
}

async fn bounded<F: Future>(
    limit: Option<Duration>,
    stage: &'static str,
    fut: F,
) -> Result<F::Output, LayerError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| LayerError::Timeout { stage, limit }),
        None => Ok(fut.await),
    }
}
