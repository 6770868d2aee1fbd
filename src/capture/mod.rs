//! Frame Capture Layer
//!
//! Camera acquisition lives outside this crate. Anything that can hand over
//! RGBA frames implements [`FrameSource`]; [`ImageFileSource`] replays still
//! images from disk for diagnostics and benchmarking.

pub mod frame;

pub use frame::Frame;

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Producer of camera frames, polled once per pipeline invocation
pub trait FrameSource {
    /// Next available frame, or `None` when the source is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Frame source backed by a list of image files
pub struct ImageFileSource {
    pending: VecDeque<PathBuf>,
    current: Option<PathBuf>,
}

impl ImageFileSource {
    /// Create a source that yields the given files in order
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            pending: paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
            current: None,
        }
    }

    /// Path of the most recently returned frame
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Number of files not yet read
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageFileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.pending.pop_front() else {
            self.current = None;
            return Ok(None);
        };

        let image = image::open(&path)
            .with_context(|| format!("Failed to load frame image: {:?}", path))?
            .to_rgba8();
        debug!("Loaded frame {:?} ({}x{})", path, image.width(), image.height());

        self.current = Some(path);
        Ok(Some(Frame::from_image(image)))
    }
}
