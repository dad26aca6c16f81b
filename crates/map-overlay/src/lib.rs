//! Map overlay compositing and layer state.
//!
//! - [`surface`]: the map-side element capability ([`MapSurface`]) and a
//!   software backend ([`RasterSurface`]) that composes overlays into an image
//! - [`compositor`]: [`GeoOverlay`], which keeps one rendered overlay aligned
//!   with its geographic extent as the view changes
//! - [`layers`]: [`LayerStateManager`], the toggle/cache/render coordinator
//!   for the four solar layers
//! - [`init`]: owned one-shot initialization of the map backend

pub mod compositor;
pub mod init;
pub mod layers;
pub mod surface;

pub use compositor::{CompositorError, GeoOverlay, OverlayState};
pub use init::{InitState, MapContext, MapInitError};
pub use layers::{
    CompletionOutcome, LayerStateManager, LayerView, RenderCompletion, SetupError, ToggleOutcome,
};
pub use surface::{ElementId, MapSurface, RasterSurface};
