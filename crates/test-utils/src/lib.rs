//! Shared test utilities for the solar overlay workspace.
//!
//! This crate provides common testing infrastructure including:
//! - In-memory GeoTIFF builders (no binary fixtures in the repo)
//! - Grid value generators
//! - A scriptable raster fetcher with call counting and gating
//! - A linear projector with call counting
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your integration tests:
//!
//! ```ignore
//! use test_utils::{geotiff_f32, MockFetcher};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
