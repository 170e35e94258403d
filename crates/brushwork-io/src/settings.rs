use std::path::PathBuf;
use std::time::Duration;

use brushwork_core::Color;
use serde::{Deserialize, Serialize};

use crate::output::DirAllocator;

/// Construction-time settings for a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerSettings {
    pub width: u32,
    pub height: u32,
    /// Painted before anything else; never counted in the layer's bounds.
    pub background: Option<Color>,
    /// Directory artifacts are allocated in.
    pub output_dir: PathBuf,
    /// Upper bound on the job barrier, in milliseconds.
    pub job_timeout_ms: Option<u64>,
    /// Upper bound on waiting for render completion before saving.
    pub save_timeout_ms: Option<u64>,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            background: None,
            output_dir: std::env::temp_dir(),
            job_timeout_ms: None,
            save_timeout_ms: None,
        }
    }
}

impl LayerSettings {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_save_timeout(mut self, timeout: Duration) -> Self {
        self.save_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_ms.map(Duration::from_millis)
    }

    pub fn save_timeout(&self) -> Option<Duration> {
        self.save_timeout_ms.map(Duration::from_millis)
    }

    pub fn allocator(&self) -> DirAllocator {
        DirAllocator::new(self.output_dir.clone())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = LayerSettings::from_json(
            r##"{"width": 64, "background": "#ffffff", "job_timeout_ms": 250}"##,
        )
        .unwrap();
        assert_eq!(settings.width, 64);
        assert_eq!(settings.height, 512);
        assert_eq!(settings.background, Some(Color::WHITE));
        assert_eq!(settings.job_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(settings.save_timeout(), None);
    }

    #[test]
    fn test_json_roundtrip() {
        let settings = LayerSettings::new(10, 20)
            .with_output_dir("/srv/out")
            .with_save_timeout(Duration::from_secs(2));
        let back = LayerSettings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(back, settings);
        assert_eq!(back.allocator().dir(), std::path::Path::new("/srv/out"));
    }
}
