//! Grid → RGBA rendering.

use std::time::Instant;

use metrics::{counter, histogram};
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use geotiff_parser::{redact_url, with_access_token, GridDecoder};
use solar_common::{DecodedGrid, GeoBoundingBox, LayerError, LayerKind, RasterLayer};

use crate::normalize::normalize;
use crate::palette::{Palette, PaletteMode};

/// Grids with at least this many pixels are colored row-parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 65_536;

/// Renderer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub parallel_threshold: usize,
    pub palette_mode: PaletteMode,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            palette_mode: PaletteMode::Floor,
        }
    }
}

impl RenderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RENDER_PARALLEL_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                config.parallel_threshold = threshold;
            }
        }

        if let Ok(val) = std::env::var("RENDER_PALETTE_MODE") {
            match val.parse() {
                Ok(mode) => config.palette_mode = mode,
                Err(e) => tracing::warn!(error = %e, "Ignoring RENDER_PALETTE_MODE"),
            }
        }

        config
    }
}

/// An RGBA buffer covering a geographic extent.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOverlay {
    kind: LayerKind,
    bounds: GeoBoundingBox,
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl RenderedOverlay {
    /// Fails with `EmptyRaster` when `pixels` is not `width * height * 4`
    /// bytes or the image has no pixels.
    pub fn new(
        kind: LayerKind,
        bounds: GeoBoundingBox,
        width: usize,
        height: usize,
        pixels: Vec<u8>,
    ) -> Result<Self, LayerError> {
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(4))
            .filter(|&n| n > 0);
        if expected != Some(pixels.len()) {
            return Err(LayerError::empty(format!(
                "{} bytes cannot hold a {}x{} RGBA image",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            kind,
            bounds,
            width,
            height,
            pixels,
        })
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn bounds(&self) -> &GeoBoundingBox {
        &self.bounds
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major RGBA bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn transparent_pixels(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|px| px[3] == 0).count()
    }
}

/// Per-pixel value → RGBA mapping for one layer.
#[derive(Debug, Clone)]
pub struct PixelMapper {
    min: f32,
    max: f32,
    opacity: u8,
    palette: Palette,
}

impl PixelMapper {
    pub fn new(min: f32, max: f32, opacity: u8, palette: Palette) -> Self {
        Self {
            min,
            max,
            opacity,
            palette,
        }
    }

    pub fn for_layer(layer: &RasterLayer, mode: PaletteMode) -> Self {
        Self::new(
            layer.min,
            layer.max,
            layer.opacity,
            Palette::from_layer(layer).with_mode(mode),
        )
    }

    /// No-data values become `[0, 0, 0, 0]`.
    #[inline]
    pub fn map(&self, value: f32) -> [u8; 4] {
        match normalize(value, self.min, self.max) {
            Some(n) => {
                let c = self.palette.color_for(n);
                [c.r, c.g, c.b, self.opacity]
            }
            None => [0, 0, 0, 0],
        }
    }
}

/// Color every pixel of `grid`.
///
/// Rows are processed in parallel once the grid reaches
/// `parallel_threshold` pixels; the output is identical either way.
pub fn render_grid(grid: &DecodedGrid, mapper: &PixelMapper, parallel_threshold: usize) -> Vec<u8> {
    let mut pixels = vec![0u8; grid.len() * 4];
    let row_bytes = grid.width() * 4;

    if grid.len() >= parallel_threshold {
        pixels
            .par_chunks_mut(row_bytes)
            .zip(grid.data().par_chunks(grid.width()))
            .for_each(|(out, row)| color_row(out, row, mapper));
    } else {
        pixels
            .chunks_mut(row_bytes)
            .zip(grid.rows())
            .for_each(|(out, row)| color_row(out, row, mapper));
    }

    pixels
}

#[inline]
fn color_row(out: &mut [u8], row: &[f32], mapper: &PixelMapper) {
    for (px, &value) in out.chunks_exact_mut(4).zip(row) {
        px.copy_from_slice(&mapper.map(value));
    }
}

/// Fetches, decodes and colors layers.
#[derive(Clone)]
pub struct RasterRenderer {
    decoder: GridDecoder,
    access_token: Option<String>,
    config: RenderConfig,
}

impl RasterRenderer {
    pub fn new(decoder: GridDecoder, config: RenderConfig) -> Self {
        Self {
            decoder,
            access_token: None,
            config,
        }
    }

    /// Token appended as `key=` to every raster URL.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `layer` over `bounds`.
    ///
    /// Any fetch or decode failure aborts the render; no partial overlay is
    /// produced.
    #[instrument(skip(self, layer, bounds), fields(kind = %layer.kind))]
    pub async fn render(
        &self,
        layer: &RasterLayer,
        bounds: GeoBoundingBox,
    ) -> Result<RenderedOverlay, LayerError> {
        let url = layer
            .source_url
            .as_deref()
            .ok_or(LayerError::Unavailable(layer.kind))?;

        let start = Instant::now();
        info!(url = %redact_url(url), band = layer.band, "Fetching raster");

        let request_url = with_access_token(url, self.access_token.as_deref())?;
        let grid = self.decoder.fetch_grid(&request_url, layer.band).await?;

        let mapper = PixelMapper::for_layer(layer, self.config.palette_mode);
        let pixels = render_grid(&grid, &mapper, self.config.parallel_threshold);
        let overlay = RenderedOverlay::new(layer.kind, bounds, grid.width(), grid.height(), pixels)?;

        let elapsed = start.elapsed();
        counter!("overlay_render_total", "kind" => layer.kind.as_str()).increment(1);
        histogram!("overlay_render_duration_seconds").record(elapsed.as_secs_f64());

        debug!(mode = %self.config.palette_mode, stops = layer.ramp().len(), "Colored grid");
        info!(
            width = overlay.width(),
            height = overlay.height(),
            transparent = overlay.transparent_pixels(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Rendered overlay"
        );

        Ok(overlay)
    }
}
