use std::path::Path;

use anyhow::Context;
use image::{imageops::FilterType, DynamicImage};
use pixmatrix_types::{
    frame::{FrameBuffer, GridSize},
    Result,
};
use tracing::info;

/// Scale an image onto the grid, one image pixel per LED.
pub fn frame_from_image(image: &DynamicImage, size: GridSize) -> Result<FrameBuffer> {
    let scaled = if image.width() == size.width && image.height() == size.height {
        image.to_rgba8()
    } else {
        image
            .resize_exact(size.width, size.height, FilterType::Triangle)
            .to_rgba8()
    };
    FrameBuffer::from_rgba_bytes(size, scaled.as_raw())
}

/// Decode a PNG or JPEG file and scale it onto the grid.
pub fn import_image<P: AsRef<Path>>(path: P, size: GridSize) -> Result<FrameBuffer> {
    let path_ref = path.as_ref();
    let image = image::open(path_ref)
        .with_context(|| format!("failed to decode image {}", path_ref.display()))?;
    info!(
        "Importing {}x{} image {:?} onto {}x{} grid",
        image.width(),
        image.height(),
        path_ref,
        size.width,
        size.height
    );
    frame_from_image(&image, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba as ImageRgba};
    use pixmatrix_types::{color::Rgba, PixmatrixError};

    #[test]
    fn same_size_image_is_copied() {
        let mut buffer = ImageBuffer::from_pixel(4, 4, ImageRgba([0u8, 0, 0, 255]));
        buffer.put_pixel(3, 1, ImageRgba([200, 100, 50, 255]));
        let frame = frame_from_image(&DynamicImage::ImageRgba8(buffer), GridSize::new(4, 4))
            .expect("convert image");
        assert_eq!(frame.pixel(3, 1), Rgba::opaque(200, 100, 50));
        assert_eq!(frame.pixel(0, 0), Rgba::opaque(0, 0, 0));
    }

    #[test]
    fn larger_image_is_scaled_down() {
        let buffer = ImageBuffer::from_pixel(64, 32, ImageRgba([10u8, 220, 30, 255]));
        let frame = frame_from_image(&DynamicImage::ImageRgba8(buffer), GridSize::new(16, 16))
            .expect("convert image");
        assert_eq!(frame.size(), GridSize::new(16, 16));
        assert!(frame
            .pixels()
            .iter()
            .all(|px| *px == Rgba::opaque(10, 220, 30)));
    }

    #[test]
    fn import_png_from_disk() {
        let path = std::env::temp_dir().join("pixmatrix-import-test.png");
        let buffer = ImageBuffer::from_pixel(8, 8, ImageRgba([255u8, 0, 0, 255]));
        buffer.save(&path).expect("write png");

        let frame = import_image(&path, GridSize::new(8, 8)).expect("import png");
        assert_eq!(frame.pixel(7, 7), Rgba::opaque(255, 0, 0));
        std::fs::remove_file(&path).expect("cleanup png");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = import_image("/nonexistent/frame.png", GridSize::default()).unwrap_err();
        assert!(matches!(err, PixmatrixError::Other(_)));
    }
}
