//! PNG export of rendered overlays.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, ImageOutputFormat, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::raster::RenderedOverlay;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("overlay of {width}x{height} does not fit an image buffer")]
    Dimensions { width: usize, height: usize },

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Copy an overlay into an `image` buffer.
pub fn to_image(overlay: &RenderedOverlay) -> Result<RgbaImage, ExportError> {
    let dims = || ExportError::Dimensions {
        width: overlay.width(),
        height: overlay.height(),
    };
    let width = u32::try_from(overlay.width()).map_err(|_| dims())?;
    let height = u32::try_from(overlay.height()).map_err(|_| dims())?;
    RgbaImage::from_raw(width, height, overlay.pixels().to_vec()).ok_or_else(dims)
}

/// Encode an overlay as an RGBA PNG in memory.
pub fn encode_png(overlay: &RenderedOverlay) -> Result<Vec<u8>, ExportError> {
    let image = to_image(overlay)?;
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageOutputFormat::Png)?;
    Ok(buf.into_inner())
}

/// Write an overlay to `path` as PNG.
pub fn write_png(overlay: &RenderedOverlay, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let path = path.as_ref();
    to_image(overlay)?.save_with_format(path, ImageFormat::Png)?;
    debug!(kind = %overlay.kind(), path = %path.display(), "Wrote overlay PNG");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solar_common::{GeoBoundingBox, LayerKind};

    fn overlay() -> RenderedOverlay {
        let bounds = GeoBoundingBox::from_degrees(40.0, -74.0, 40.001, -73.999).unwrap();
        let pixels = vec![
            255, 0, 0, 200, 0, 0, 0, 0, //
            0, 255, 0, 200, 0, 0, 255, 128,
        ];
        RenderedOverlay::new(LayerKind::BuildingMask, bounds, 2, 2, pixels).unwrap()
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&overlay()).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_write_png_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        write_png(&overlay(), &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(1, 1).0, [0, 0, 255, 128]);
        assert_eq!(decoded.get_pixel(1, 0).0[3], 0);
    }
}
