//! Raster rendering for solar data layers.
//!
//! The pipeline for one layer:
//! - [`normalize`](normalize::normalize) maps a raw value into `[0, 1]`, or
//!   rejects it as no-data
//! - [`Palette`] quantizes the normalized value onto the layer's color ramp
//! - [`render_grid`] applies both to every pixel of a decoded grid
//! - [`RasterRenderer`] drives fetch, decode and coloring for a layer
//!
//! [`export`] writes finished overlays as PNG.

pub mod export;
pub mod normalize;
pub mod palette;
pub mod raster;

pub use normalize::normalize;
pub use palette::{Palette, PaletteMode};
pub use raster::{render_grid, PixelMapper, RasterRenderer, RenderConfig, RenderedOverlay};
