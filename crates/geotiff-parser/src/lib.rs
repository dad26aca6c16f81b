//! GeoTIFF grid decoding.
//!
//! Fetches a raster resource through a [`RasterFetcher`] and parses the
//! tagged-image container into a single-band [`DecodedGrid`].
//!
//! Failures map onto the layer error taxonomy:
//! - transport errors and non-2xx responses → `LayerError::Fetch`
//! - bytes that are not a readable TIFF → `LayerError::Parse`
//! - zero-length bands or length mismatches → `LayerError::EmptyRaster`
//!
//! There is no retry at this level.

pub mod decode;
pub mod fetch;

pub use decode::{decode_grid, GridDecoder};
pub use fetch::{redact_url, with_access_token, FetchConfig, HttpFetcher, RasterFetcher};
pub use solar_common::{DecodedGrid, LayerError};
