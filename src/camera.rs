use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use image::RgbImage;

/// One camera frame as handed to the classifier.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: Utc::now(),
        }
    }
}

/// Where frames come from. Grabbing may block on device I/O, so the
/// feed loop always calls this off the scheduler thread.
pub trait FrameSource: Send {
    fn grab(&mut self) -> Result<Frame>;
}

/// Stand-in source that re-reads a still image from disk on every grab.
/// Useful on bench rigs without a camera attached; a real camera driver
/// plugs in behind the same trait.
pub struct StillFrameSource {
    path: PathBuf,
}

impl StillFrameSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FrameSource for StillFrameSource {
    fn grab(&mut self) -> Result<Frame> {
        let image = image::open(&self.path)
            .with_context(|| format!("failed to load frame from {}", self.path.display()))?
            .to_rgb8();
        Ok(Frame::new(image))
    }
}
