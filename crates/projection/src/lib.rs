//! Geographic to screen-space projection.
//!
//! The overlay compositor needs exactly one capability from a map backend:
//! turning a latitude/longitude into a pixel position under the map's
//! *current* view. That capability is the [`Projector`] trait. A projector
//! describes a single view; when the view changes (pan, zoom, tilt) the map
//! hands out a new one.

pub mod mercator;

pub use mercator::WebMercatorProjector;

use serde::{Deserialize, Serialize};
use solar_common::{GeoBoundingBox, LatLng};

/// A position in screen pixels, origin at the top-left of the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    /// Rectangle spanned by the projected south-west and north-east corners.
    ///
    /// Screen y grows downward, so the north-east corner gives the top edge
    /// and the south-west corner gives the left edge.
    pub fn from_corners(sw: ScreenPoint, ne: ScreenPoint) -> Self {
        Self {
            left: sw.x,
            top: ne.y,
            width: ne.x - sw.x,
            height: sw.y - ne.y,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Whether the rectangle has positive area.
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Map-specific conversion from geographic to screen coordinates.
///
/// Returns `None` when the point cannot be projected under the current view.
pub trait Projector {
    fn project_geo_to_screen(&self, lat: f64, lng: f64) -> Option<ScreenPoint>;

    fn project(&self, point: LatLng) -> Option<ScreenPoint> {
        self.project_geo_to_screen(point.latitude, point.longitude)
    }

    /// Project both corners of `bounds` into a screen rectangle.
    fn project_bounds(&self, bounds: &GeoBoundingBox) -> Option<ScreenRect> {
        let sw = self.project(bounds.south_west())?;
        let ne = self.project(bounds.north_east())?;
        Some(ScreenRect::from_corners(sw, ne))
    }
}

impl<F> Projector for F
where
    F: Fn(f64, f64) -> Option<ScreenPoint>,
{
    fn project_geo_to_screen(&self, lat: f64, lng: f64) -> Option<ScreenPoint> {
        self(lat, lng)
    }
}
