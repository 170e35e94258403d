use std::io;
use std::path::PathBuf;
use std::time::Duration;

use brushwork_core::SurfaceError;
use brushwork_io::{ImageError, SinkError};
use thiserror::Error;

/// Failures raised while a brush draws itself.
#[derive(Error, Debug)]
pub enum BrushError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("Image has not been loaded; run its load job first")]
    ImageNotLoaded,

    #[error("I/O error reading font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid font: {0}")]
    Font(String),

    #[error("Cannot build gradient: {0}")]
    Gradient(String),
}

/// Everything a layer operation can fail with.
#[derive(Error, Debug)]
pub enum LayerError {
    /// Invalid brush options, reported when the brush is created.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A job or image load failed before drawing could start.
    #[error("Prerequisite failed: {0}")]
    Prerequisite(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid layer state: {0}")]
    State(&'static str),

    #[error("Failed to persist layer: {0}")]
    Io(#[from] SinkError),

    #[error("Timed out after {limit:?} waiting for {stage}")]
    Timeout { stage: &'static str, limit: Duration },

    #[error("Brush failed to render: {0}")]
    Brush(#[from] BrushError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

impl LayerError {
    pub fn prerequisite(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        LayerError::Prerequisite(err.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        LayerError::Configuration(message.into())
    }
}

impl From<ImageError> for LayerError {
    fn from(err: ImageError) -> Self {
        LayerError::Prerequisite(Box::new(err))
    }
}
