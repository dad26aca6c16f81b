//! Test data generators for rasters and grids.
//!
//! GeoTIFF fixtures are encoded in memory with the `tiff` encoder so tests
//! never depend on binary files being present.

use std::io::Cursor;

use tiff::encoder::{colortype, TiffEncoder};

/// Encode a single-band float raster, the layout of the flux rasters.
///
/// # Panics
///
/// Panics if `data.len() != width * height`.
pub fn geotiff_f32(width: u32, height: u32, data: &[f32]) -> Vec<u8> {
    assert_eq!(data.len(), (width * height) as usize, "data does not match dimensions");
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).expect("create TIFF encoder");
        encoder
            .write_image::<colortype::Gray32Float>(width, height, data)
            .expect("encode Gray32Float image");
    }
    buf.into_inner()
}

/// Encode a single-band 8-bit raster, the layout of the building mask.
pub fn geotiff_u8(width: u32, height: u32, data: &[u8]) -> Vec<u8> {
    assert_eq!(data.len(), (width * height) as usize, "data does not match dimensions");
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).expect("create TIFF encoder");
        encoder
            .write_image::<colortype::Gray8>(width, height, data)
            .expect("encode Gray8 image");
    }
    buf.into_inner()
}

/// Encode a 16-bit single-band raster.
pub fn geotiff_u16(width: u32, height: u32, data: &[u16]) -> Vec<u8> {
    assert_eq!(data.len(), (width * height) as usize, "data does not match dimensions");
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).expect("create TIFF encoder");
        encoder
            .write_image::<colortype::Gray16>(width, height, data)
            .expect("encode Gray16 image");
    }
    buf.into_inner()
}

/// Encode a pixel-interleaved 3-band 8-bit raster.
///
/// `data` holds `[b0, b1, b2]` triples per pixel.
pub fn geotiff_rgb8(width: u32, height: u32, data: &[u8]) -> Vec<u8> {
    assert_eq!(data.len(), (width * height * 3) as usize, "data does not match dimensions");
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).expect("create TIFF encoder");
        encoder
            .write_image::<colortype::RGB8>(width, height, data)
            .expect("encode RGB8 image");
    }
    buf.into_inner()
}

/// Repeat `pattern` until `len` values have been produced.
///
/// # Example
///
/// ```
/// use test_utils::repeat_pattern;
///
/// let grid = repeat_pattern(&[-9999.0, 0.0, 50.0, 100.0], 16);
/// assert_eq!(grid.len(), 16);
/// assert_eq!(grid[4], -9999.0);
/// assert_eq!(grid[15], 100.0);
/// ```
pub fn repeat_pattern(pattern: &[f32], len: usize) -> Vec<f32> {
    pattern.iter().copied().cycle().take(len).collect()
}

/// Creates a flux-like grid ramping from 0 (left) to `max` (right), with a
/// no-data border of `-9999` one pixel wide.
pub fn flux_grid(width: usize, height: usize, max: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let border = row == 0 || col == 0 || row + 1 == height || col + 1 == width;
            if border {
                data.push(-9999.0);
            } else {
                let x = col as f32 / (width.max(2) - 1) as f32;
                data.push(x * max);
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flux_grid_border() {
        let grid = flux_grid(5, 4, 1800.0);
        assert_eq!(grid.len(), 20);
        assert_eq!(grid[0], -9999.0);
        assert_eq!(grid[19], -9999.0);
        assert!(grid[6] >= 0.0);
    }

    #[test]
    fn test_tiff_magic() {
        let bytes = geotiff_f32(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        assert!(bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*"));
    }
}
