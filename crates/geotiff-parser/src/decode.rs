//! TIFF container parsing into single-band grids.

use std::io::Cursor;
use std::sync::Arc;

use num_traits::ToPrimitive;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tracing::{debug, instrument};

use solar_common::{DecodedGrid, LayerError};

use crate::fetch::{redact_url, RasterFetcher};

/// Fetches raster resources and decodes them into grids.
#[derive(Clone)]
pub struct GridDecoder {
    fetcher: Arc<dyn RasterFetcher>,
}

impl GridDecoder {
    pub fn new(fetcher: Arc<dyn RasterFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch `url` (token already included) and decode `band` from it.
    #[instrument(skip(self, url), fields(url = %redact_url(url)))]
    pub async fn fetch_grid(&self, url: &str, band: usize) -> Result<DecodedGrid, LayerError> {
        let bytes = self.fetcher.fetch(url).await?;
        decode_grid(&bytes, band)
    }
}

/// Decode one band of a TIFF/GeoTIFF byte buffer.
///
/// Pixel-interleaved multi-band images (e.g. the 12-band monthly flux
/// rasters) are de-interleaved to the requested band. Integer and float
/// sample formats are widened to `f32`. The decoder's default buffer
/// limits apply, so a header declaring oversized dimensions is a parse
/// error rather than an allocation.
pub fn decode_grid(bytes: &[u8], band: usize) -> Result<DecodedGrid, LayerError> {
    if bytes.is_empty() {
        return Err(LayerError::parse("raster response body is empty"));
    }

    let mut decoder = Decoder::new(Cursor::new(bytes))
        .map_err(|e| LayerError::parse(format!("not a TIFF container: {}", e)))?
        .with_limits(Limits::default());

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| LayerError::parse(format!("missing image dimensions: {}", e)))?;

    let samples = match decoder
        .read_image()
        .map_err(|e| LayerError::parse(format!("failed to read raster data: {}", e)))?
    {
        DecodingResult::U8(v) => widen(v),
        DecodingResult::U16(v) => widen(v),
        DecodingResult::U32(v) => widen(v),
        DecodingResult::U64(v) => widen(v),
        DecodingResult::I8(v) => widen(v),
        DecodingResult::I16(v) => widen(v),
        DecodingResult::I32(v) => widen(v),
        DecodingResult::I64(v) => widen(v),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => widen(v),
    };

    let (width, height) = (width as usize, height as usize);
    let pixels = width * height;

    if pixels == 0 || samples.is_empty() {
        return Err(LayerError::empty(format!(
            "raster {}x{} decoded to {} samples",
            width,
            height,
            samples.len()
        )));
    }

    if samples.len() % pixels != 0 {
        return Err(LayerError::empty(format!(
            "{} samples cannot be split into {}x{} pixels",
            samples.len(),
            width,
            height
        )));
    }

    let bands = samples.len() / pixels;
    if band >= bands {
        return Err(LayerError::empty(format!(
            "band {} requested but raster has {} band(s)",
            band, bands
        )));
    }

    debug!(width, height, bands, band, "Decoded raster");

    let data = if bands == 1 {
        samples
    } else {
        samples.into_iter().skip(band).step_by(bands).collect()
    };

    DecodedGrid::new(width, height, data)
}

/// Widen integer/float samples to f32. Unrepresentable values become NaN,
/// which the normalizer treats as no-data.
fn widen<T: ToPrimitive>(values: Vec<T>) -> Vec<f32> {
    values
        .into_iter()
        .map(|v| v.to_f32().unwrap_or(f32::NAN))
        .collect()
}
