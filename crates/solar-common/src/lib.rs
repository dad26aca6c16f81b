//! Common types shared across the solar overlay crates.
//!
//! Everything that crosses a crate boundary lives here: the closed set of
//! layer kinds, the per-location bundle of layer URLs, the geographic extent
//! a raster covers, decoded grids, layer styles and the layer-scoped error
//! taxonomy.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod layer;
pub mod style;

pub use bbox::{BboxError, GeoBoundingBox, LatLng};
pub use error::{LayerError, LayerResult};
pub use grid::DecodedGrid;
pub use layer::{DataLayers, LayerKind, RasterLayer};
pub use style::{LayerStyle, Rgb, StyleConfig, StyleError};
