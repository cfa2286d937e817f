//! Editing surface collaborator: where frames come from and where they are shown.

mod import;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pixmatrix_types::{
    color::Rgba,
    frame::{FrameBuffer, GridSize},
    PixmatrixError, Result,
};
use tracing::debug;

pub use import::{frame_from_image, import_image};

/// Capture/render counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SurfaceMetrics {
    pub captures: u64,
    pub renders: u64,
}

/// The pixel editing surface the session reads edits from and displays frames on.
///
/// Painting itself belongs to the surface; the session only snapshots the
/// current edit and pushes frames to display.
#[async_trait]
pub trait EditingSurface: Send + Sync {
    async fn capture_current_edit(&self) -> Result<FrameBuffer>;
    async fn render_frame(&self, frame: &FrameBuffer) -> Result<()>;
    fn metrics(&self) -> SurfaceMetrics;
}

#[derive(Debug)]
struct SurfaceState {
    frame: FrameBuffer,
    metrics: SurfaceMetrics,
}

/// In-memory surface holding the frame being edited.
///
/// Clones share state, so a front-end can keep painting on one handle while
/// the session owns another.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    size: GridSize,
    state: Arc<Mutex<SurfaceState>>,
}

impl MemorySurface {
    /// Surface starting from an all-black frame.
    pub fn new(size: GridSize) -> Self {
        Self::with_frame(FrameBuffer::black(size))
    }

    pub fn with_frame(frame: FrameBuffer) -> Self {
        Self {
            size: frame.size(),
            state: Arc::new(Mutex::new(SurfaceState {
                frame,
                metrics: SurfaceMetrics::default(),
            })),
        }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Frame currently shown, without counting as a capture.
    pub fn current(&self) -> Result<FrameBuffer> {
        let state = self.lock()?;
        Ok(state.frame.clone())
    }

    pub fn paint(&self, x: u32, y: u32, color: Rgba) -> Result<()> {
        let mut state = self.lock()?;
        state.frame = state.frame.with_pixel(x, y, color);
        Ok(())
    }

    pub fn fill_rect(&self, x: u32, y: u32, width: u32, height: u32, color: Rgba) -> Result<()> {
        let mut state = self.lock()?;
        state.frame = state.frame.with_rect(x, y, width, height, color);
        Ok(())
    }

    pub fn fill(&self, color: Rgba) -> Result<()> {
        let mut state = self.lock()?;
        state.frame = FrameBuffer::filled(self.size, color);
        Ok(())
    }

    /// Replace the whole edit, e.g. with an imported image.
    pub fn load(&self, frame: FrameBuffer) -> Result<()> {
        ensure_size(self.size, &frame)?;
        let mut state = self.lock()?;
        state.frame = frame;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SurfaceState>> {
        self.state
            .lock()
            .map_err(|_| surface_error("failed to lock surface state"))
    }
}

#[async_trait]
impl EditingSurface for MemorySurface {
    async fn capture_current_edit(&self) -> Result<FrameBuffer> {
        let mut state = self.lock()?;
        state.metrics.captures += 1;
        Ok(state.frame.clone())
    }

    async fn render_frame(&self, frame: &FrameBuffer) -> Result<()> {
        ensure_size(self.size, frame)?;
        let mut state = self.lock()?;
        state.frame = frame.clone();
        state.metrics.renders += 1;
        debug!(renders = state.metrics.renders, "surface rendered frame");
        Ok(())
    }

    fn metrics(&self) -> SurfaceMetrics {
        self.state
            .lock()
            .map(|s| s.metrics.clone())
            .unwrap_or_default()
    }
}

/// Generate an error aligned with surface semantics.
pub fn surface_error(message: impl Into<String>) -> PixmatrixError {
    PixmatrixError::Surface(message.into())
}

fn ensure_size(expected: GridSize, frame: &FrameBuffer) -> Result<()> {
    if frame.size() == expected {
        Ok(())
    } else {
        Err(surface_error(format!(
            "frame is {}x{}, surface is {}x{}",
            frame.width(),
            frame.height(),
            expected.width,
            expected.height
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capture_reflects_paint() {
        let surface = MemorySurface::new(GridSize::new(4, 4));
        let red = Rgba::opaque(255, 0, 0);
        surface.paint(1, 2, red).expect("paint");

        let frame = surface.capture_current_edit().await.expect("capture");
        assert_eq!(frame.pixel(1, 2), red);
        assert_eq!(surface.metrics().captures, 1);

        // Later paints do not reach an earlier capture.
        surface.paint(0, 0, red).expect("paint");
        assert_eq!(frame.pixel(0, 0), Rgba::default());
    }

    #[tokio::test]
    async fn render_replaces_edit() {
        let surface = MemorySurface::new(GridSize::new(2, 2));
        let frame = FrameBuffer::filled(GridSize::new(2, 2), Rgba::opaque(0, 0, 255));
        surface.render_frame(&frame).await.expect("render");
        assert_eq!(surface.current().expect("current"), frame);
        assert_eq!(surface.metrics().renders, 1);
    }

    #[tokio::test]
    async fn reject_mismatched_frames() {
        let surface = MemorySurface::new(GridSize::new(2, 2));
        let wrong = FrameBuffer::black(GridSize::new(3, 3));
        assert!(surface.render_frame(&wrong).await.is_err());
        assert!(surface.load(wrong).is_err());
        assert_eq!(surface.metrics().renders, 0);
    }

    #[test]
    fn clones_share_state() {
        let surface = MemorySurface::new(GridSize::new(3, 3));
        let handle = surface.clone();
        handle.fill(Rgba::opaque(9, 9, 9)).expect("fill");
        handle
            .fill_rect(0, 0, 1, 1, Rgba::opaque(1, 2, 3))
            .expect("fill rect");
        let frame = surface.current().expect("current");
        assert_eq!(frame.pixel(0, 0), Rgba::opaque(1, 2, 3));
        assert_eq!(frame.pixel(2, 2), Rgba::opaque(9, 9, 9));
    }
}
