//! Web Mercator (EPSG:3857) viewport projection.
//!
//! This is the projection used by slippy-map widgets: the world is a square
//! of `256 * 2^zoom` pixels, longitude maps linearly to x and latitude maps
//! through the Mercator stretch to y. A viewport is a window of that world
//! centered on a geographic point.

use std::f64::consts::PI;

use solar_common::LatLng;

use crate::{Projector, ScreenPoint};

/// Tile edge length in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Projection for one map view: center, zoom and viewport size.
///
/// Views are immutable; panning or zooming produces a new projector.
#[derive(Debug, Clone, PartialEq)]
pub struct WebMercatorProjector {
    center: LatLng,
    zoom: f64,
    viewport_width: u32,
    viewport_height: u32,
    /// World pixel position of the center, cached per view
    center_world: (f64, f64),
}

impl WebMercatorProjector {
    pub fn new(center: LatLng, zoom: f64, viewport_width: u32, viewport_height: u32) -> Self {
        let center_world = world_pixel(center.latitude, center.longitude, zoom);
        Self {
            center,
            zoom,
            viewport_width,
            viewport_height,
            center_world,
        }
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    /// The view after dragging the map by `(dx, dy)` screen pixels.
    ///
    /// Dragging right moves the center west, dragging down moves it north.
    pub fn panned(&self, dx: f64, dy: f64) -> Self {
        let (cx, cy) = self.center_world;
        let center = geo_from_world(cx - dx, cy - dy, self.zoom);
        Self::new(center, self.zoom, self.viewport_width, self.viewport_height)
    }

    /// The view at another zoom level, keeping the center fixed.
    pub fn zoomed(&self, zoom: f64) -> Self {
        Self::new(self.center, zoom, self.viewport_width, self.viewport_height)
    }

    /// Inverse projection of a screen position.
    pub fn screen_to_geo(&self, point: ScreenPoint) -> LatLng {
        let (cx, cy) = self.center_world;
        let wx = cx + point.x - self.viewport_width as f64 / 2.0;
        let wy = cy + point.y - self.viewport_height as f64 / 2.0;
        geo_from_world(wx, wy, self.zoom)
    }

    /// Ground resolution in meters per pixel at `latitude`.
    pub fn meters_per_pixel(&self, latitude: f64) -> f64 {
        const EARTH_CIRCUMFERENCE_M: f64 = 40_075_016.686;
        EARTH_CIRCUMFERENCE_M * latitude.to_radians().cos() / world_size(self.zoom)
    }
}

impl Projector for WebMercatorProjector {
    fn project_geo_to_screen(&self, lat: f64, lng: f64) -> Option<ScreenPoint> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        let (wx, wy) = world_pixel(lat, lng, self.zoom);
        let (cx, cy) = self.center_world;
        Some(ScreenPoint::new(
            wx - cx + self.viewport_width as f64 / 2.0,
            wy - cy + self.viewport_height as f64 / 2.0,
        ))
    }
}

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Geographic → world pixel coordinates at `zoom`.
fn world_pixel(lat: f64, lng: f64, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let sin_lat = lat.to_radians().sin();

    let x = (lng + 180.0) / 360.0 * size;
    let y = (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)) * size;
    (x, y)
}

/// World pixel → geographic coordinates at `zoom`.
fn geo_from_world(x: f64, y: f64, zoom: f64) -> LatLng {
    let size = world_size(zoom);
    let lng = x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / size;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> WebMercatorProjector {
        WebMercatorProjector::new(LatLng::new(40.0005, -73.9995), 20.0, 800, 600)
    }

    #[test]
    fn test_center_maps_to_viewport_center() {
        let p = view();
        let c = p.project(p.center()).unwrap();
        assert!((c.x - 400.0).abs() < 1e-6);
        assert!((c.y - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_north_is_up_east_is_right() {
        let p = view();
        let north = p.project_geo_to_screen(40.001, -73.9995).unwrap();
        let east = p.project_geo_to_screen(40.0005, -73.999).unwrap();
        assert!(north.y < 300.0);
        assert!(east.x > 400.0);
    }

    #[test]
    fn test_zoom_doubles_distances() {
        let p = view();
        let q = p.zoomed(21.0);
        let a = p.project_geo_to_screen(40.001, -73.999).unwrap();
        let b = q.project_geo_to_screen(40.001, -73.999).unwrap();
        assert!(((b.x - 400.0) - 2.0 * (a.x - 400.0)).abs() < 1e-6);
        assert!(((b.y - 300.0) - 2.0 * (a.y - 300.0)).abs() < 1e-6);
    }

    #[test]
    fn test_pan_shifts_points() {
        let p = view();
        let q = p.panned(25.0, -10.0);
        let a = p.project_geo_to_screen(40.0, -74.0).unwrap();
        let b = q.project_geo_to_screen(40.0, -74.0).unwrap();
        assert!((b.x - a.x - 25.0).abs() < 1e-6);
        assert!((b.y - a.y + 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_screen_round_trip() {
        let p = view();
        let geo = p.screen_to_geo(ScreenPoint::new(123.0, 456.0));
        let back = p.project(geo).unwrap();
        assert!((back.x - 123.0).abs() < 1e-6);
        assert!((back.y - 456.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_input() {
        assert!(view().project_geo_to_screen(f64::NAN, 0.0).is_none());
    }
}
