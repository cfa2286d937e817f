use std::sync::Arc;

use crate::{color::Rgba, PixmatrixError, Result};

/// Grid dimensions shared by every frame of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub const DEFAULT_WIDTH: u32 = 16;
    pub const DEFAULT_HEIGHT: u32 = 16;

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT)
    }
}

/// Immutable snapshot of a W×H RGBA grid.
///
/// Pixels are stored row-major starting at the top-left corner. The pixel
/// storage is shared, so cloning a frame is cheap and never copies the grid.
/// Edits go through [`FrameBuffer::with_pixel`] and friends, which return a new
/// value and leave the original untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    size: GridSize,
    pixels: Arc<[Rgba]>,
}

impl FrameBuffer {
    /// All-zero frame, the state of a freshly opened session.
    pub fn black(size: GridSize) -> Self {
        Self::filled(size, Rgba::default())
    }

    pub fn filled(size: GridSize, color: Rgba) -> Self {
        Self {
            size,
            pixels: vec![color; size.pixel_count()].into(),
        }
    }

    pub fn from_pixels(size: GridSize, pixels: Vec<Rgba>) -> Result<Self> {
        if pixels.len() != size.pixel_count() {
            return Err(PixmatrixError::Frame(format!(
                "expected {} pixels for a {}x{} grid, got {}",
                size.pixel_count(),
                size.width,
                size.height,
                pixels.len()
            )));
        }
        Ok(Self {
            size,
            pixels: pixels.into(),
        })
    }

    /// Build from a raw RGBA byte buffer (4 bytes per pixel).
    pub fn from_rgba_bytes(size: GridSize, data: &[u8]) -> Result<Self> {
        if data.len() != size.pixel_count() * 4 {
            return Err(PixmatrixError::Frame(format!(
                "expected {} RGBA bytes for a {}x{} grid, got {}",
                size.pixel_count() * 4,
                size.width,
                size.height,
                data.len()
            )));
        }
        let pixels = data
            .chunks_exact(4)
            .map(|px| Rgba::new(px[0], px[1], px[2], px[3]))
            .collect();
        Self::from_pixels(size, pixels)
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if self.size.contains(x, y) {
            Some(y as usize * self.size.width as usize + x as usize)
        } else {
            None
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgba> {
        self.offset(x, y).map(|idx| self.pixels[idx])
    }

    /// Pixel at `(x, y)`. Panics when the coordinate lies outside the grid.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        match self.get(x, y) {
            Some(px) => px,
            None => panic!(
                "pixel ({x},{y}) outside {}x{} grid",
                self.size.width, self.size.height
            ),
        }
    }

    /// Copy of this frame with one pixel replaced. Out-of-grid coordinates
    /// yield an unchanged copy.
    pub fn with_pixel(&self, x: u32, y: u32, color: Rgba) -> Self {
        let Some(idx) = self.offset(x, y) else {
            return self.clone();
        };
        let mut pixels = self.pixels.to_vec();
        pixels[idx] = color;
        Self {
            size: self.size,
            pixels: pixels.into(),
        }
    }

    /// Copy of this frame with a `width`×`height` rectangle at `(x, y)` filled,
    /// clipped to the grid.
    pub fn with_rect(&self, x: u32, y: u32, width: u32, height: u32, color: Rgba) -> Self {
        let x_end = x.saturating_add(width).min(self.size.width);
        let y_end = y.saturating_add(height).min(self.size.height);
        let mut pixels = self.pixels.to_vec();
        for row in y..y_end {
            for col in x..x_end {
                pixels[row as usize * self.size.width as usize + col as usize] = color;
            }
        }
        Self {
            size: self.size,
            pixels: pixels.into(),
        }
    }

    /// True when both frames share the same pixel storage.
    pub fn shares_storage(&self, other: &FrameBuffer) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_frame_has_full_grid() {
        let frame = FrameBuffer::black(GridSize::default());
        assert_eq!(frame.pixels().len(), 256);
        assert!(frame.pixels().iter().all(|px| *px == Rgba::default()));
    }

    #[test]
    fn reject_wrong_pixel_count() {
        let size = GridSize::new(4, 4);
        assert!(FrameBuffer::from_pixels(size, vec![Rgba::BLACK; 15]).is_err());
        assert!(FrameBuffer::from_rgba_bytes(size, &[0; 63]).is_err());
        assert!(FrameBuffer::from_rgba_bytes(size, &[0; 64]).is_ok());
    }

    #[test]
    fn edits_produce_new_values() {
        let size = GridSize::new(4, 3);
        let original = FrameBuffer::black(size);
        let red = Rgba::opaque(255, 0, 0);
        let edited = original.with_pixel(3, 2, red);

        assert_eq!(edited.pixel(3, 2), red);
        assert_eq!(original.pixel(3, 2), Rgba::default());
        assert!(!edited.shares_storage(&original));

        let untouched = original.with_pixel(9, 9, red);
        assert_eq!(untouched, original);
    }

    #[test]
    fn rect_fill_clips_to_grid() {
        let size = GridSize::new(4, 4);
        let blue = Rgba::opaque(0, 0, 255);
        let frame = FrameBuffer::black(size).with_rect(2, 2, 10, 10, blue);
        let painted = frame.pixels().iter().filter(|px| **px == blue).count();
        assert_eq!(painted, 4);
        assert_eq!(frame.get(1, 1), Some(Rgba::default()));
        assert_eq!(frame.get(4, 0), None);
    }

    #[test]
    fn clones_share_storage() {
        let frame = FrameBuffer::black(GridSize::new(2, 2));
        let copy = frame.clone();
        assert!(copy.shares_storage(&frame));
    }
}
