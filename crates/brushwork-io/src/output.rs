use std::fmt::Debug;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Hands out the destination path for a layer's artifact.
///
/// Each call must return a path no other layer will be given.
pub trait OutputAllocator: Debug + Send + Sync {
    fn allocate(&self, layer_name: &str) -> PathBuf;
}

/// Allocates `<dir>/<uuid-v4>.png`.
#[derive(Debug, Clone)]
pub struct DirAllocator {
    dir: PathBuf,
}

impl DirAllocator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputAllocator for DirAllocator {
    fn allocate(&self, layer_name: &str) -> PathBuf {
        let path = self.dir.join(format!("{}.png", Uuid::new_v4()));
        log::debug!("Allocated {} for layer '{}'", path.display(), layer_name);
        path
    }
}

/// Always returns the same path. Uniqueness is the caller's problem.
#[derive(Debug, Clone)]
pub struct FixedPath(pub PathBuf);

impl OutputAllocator for FixedPath {
    fn allocate(&self, _layer_name: &str) -> PathBuf {
        self.0.clone()
    }
}
