//! Image loading seam
//!
//! The verdict engine never opens files directly. It asks an
//! [`ImageAccess`] for decoded buffers, which lets tests substitute an
//! in-memory store for the filesystem.

use crate::error::{TestError, TestResult};
use imgreg_core::PixelBuffer;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source of decoded images
///
/// Implementations must be shareable across worker threads.
pub trait ImageAccess: Sync {
    /// Load and decode the image at `path`
    fn load(&self, path: &Path) -> TestResult<PixelBuffer>;
}

impl<T: ImageAccess + ?Sized> ImageAccess for &T {
    fn load(&self, path: &Path) -> TestResult<PixelBuffer> {
        (**self).load(path)
    }
}

/// Loads images from disk with format detection
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageAccess;

impl ImageAccess for FileImageAccess {
    fn load(&self, path: &Path) -> TestResult<PixelBuffer> {
        imgreg_io::read_image(path).map_err(|e| TestError::ImageLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Serves buffers from memory, keyed by path
///
/// Paths not inserted fail with `TestError::ImageLoad`.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageAccess {
    images: HashMap<PathBuf, PixelBuffer>,
}

impl MemoryImageAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `buffer` under `path`, replacing any previous entry
    pub fn insert(&mut self, path: impl Into<PathBuf>, buffer: PixelBuffer) {
        self.images.insert(path.into(), buffer);
    }

    pub fn with(mut self, path: impl Into<PathBuf>, buffer: PixelBuffer) -> Self {
        self.insert(path, buffer);
        self
    }
}

impl ImageAccess for MemoryImageAccess {
    fn load(&self, path: &Path) -> TestResult<PixelBuffer> {
        self.images
            .get(path)
            .cloned()
            .ok_or_else(|| TestError::ImageLoad {
                path: path.display().to_string(),
                message: "no such image".to_string(),
            })
    }
}
