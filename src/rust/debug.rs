use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};

use crate::raster::RasterImage;

/// Receives the normalized raster of every guess for offline inspection.
///
/// Sinks are fire-and-forget: they cannot fail a guess, so implementations
/// report their own problems through logging.
pub trait DebugSink: Send + Sync {
    fn record(&self, raster: &RasterImage);
}

/// Writes each raster as `resizedImage-<unix millis>-<n>.png` into a directory.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    counter: AtomicU64,
}

impl DirectorySink {
    /// Creates the sink, creating `dir` if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!("resizedImage-{}-{}.png", millis, n))
    }
}

impl DebugSink for DirectorySink {
    fn record(&self, raster: &RasterImage) {
        let path = self.next_path();
        match raster.as_rgba().save_with_format(&path, image::ImageFormat::Png) {
            Ok(()) => debug!("Saved debug raster to {:?}", path),
            Err(e) => warn!("Failed to save debug raster to {:?}: {}", path, e),
        }
    }
}
