//! Overlay positioning against a projector, across view changes.

mod common;

use std::sync::Arc;

use common::{fetcher, manager_with, bundle, RecordingSurface, SurfaceEvent};
use map_overlay::{GeoOverlay, LayerStateManager, OverlayState, RasterSurface};
use geotiff_parser::GridDecoder;
use projection::{Projector, ScreenRect, WebMercatorProjector};
use renderer::{RasterRenderer, RenderConfig, RenderedOverlay};
use solar_common::{LayerKind, StyleConfig};
use test_utils::{sample_bounds, LinearProjector};

fn overlay() -> Arc<RenderedOverlay> {
    Arc::new(RenderedOverlay::new(LayerKind::AnnualFlux, sample_bounds(), 2, 2, vec![255; 16]).unwrap())
}

fn expected_rect(projector: &LinearProjector) -> ScreenRect {
    let sw = projector.expected(40.0, -74.0);
    let ne = projector.expected(40.001, -73.999);
    ScreenRect {
        left: sw.x,
        top: ne.y,
        width: ne.x - sw.x,
        height: sw.y - ne.y,
    }
}

// ============================================================================
// GeoOverlay against a linear projector
// ============================================================================

#[test]
fn test_rect_matches_projected_corners() {
    let projector = LinearProjector::new(sample_bounds(), 1000.0);
    let mut surface = RecordingSurface::new();
    let mut ov = GeoOverlay::new(overlay());

    ov.attach(&mut surface, &projector).unwrap();

    let rect = ov.screen_rect().unwrap();
    assert_eq!(rect, expected_rect(&projector));
    assert_eq!(rect.left, projector.expected(40.0, -74.0).x);
    assert_eq!(rect.top, projector.expected(40.001, -73.999).y);
    assert_eq!(rect.right(), projector.expected(40.001, -73.999).x);
    assert_eq!(rect.bottom(), projector.expected(40.0, -74.0).y);
    assert!((rect.width - 1000.0).abs() < 1e-6);
    assert!((rect.height - 1000.0).abs() < 1e-6);
    assert_eq!(projector.calls(), 2);
}

#[test]
fn test_rect_recomputed_after_view_change() {
    let first = LinearProjector::new(sample_bounds(), 1000.0);
    let mut surface = RecordingSurface::new();
    let mut ov = GeoOverlay::new(overlay());
    ov.attach(&mut surface, &first).unwrap();
    let before = ov.screen_rect().unwrap();

    let panned = first.panned(120.0, -35.0).zoomed(1.5);
    ov.draw(&mut surface, &panned).unwrap();
    let after = ov.screen_rect().unwrap();

    assert_ne!(before, after);
    assert_eq!(after, expected_rect(&panned));
    // Two corners per draw, shared counter across derived views.
    assert_eq!(first.calls(), 4);

    let id = ov.element().unwrap();
    assert_eq!(surface.positions(id), vec![before, after]);
}

#[test]
fn test_every_draw_projects_again() {
    let projector = LinearProjector::new(sample_bounds(), 1000.0);
    let mut surface = RecordingSurface::new();
    let mut ov = GeoOverlay::new(overlay());
    ov.attach(&mut surface, &projector).unwrap();

    for _ in 0..3 {
        ov.draw(&mut surface, &projector).unwrap();
    }

    assert_eq!(projector.calls(), 8);
}

#[test]
fn test_remove_twice_discards_once() {
    let projector = LinearProjector::new(sample_bounds(), 1000.0);
    let mut surface = RecordingSurface::new();
    let mut ov = GeoOverlay::new(overlay());
    ov.attach(&mut surface, &projector).unwrap();

    ov.remove(&mut surface);
    ov.remove(&mut surface);

    assert_eq!(ov.state(), OverlayState::Removed);
    let discards = surface
        .events
        .iter()
        .filter(|e| matches!(e, SurfaceEvent::Discarded(_)))
        .count();
    assert_eq!(discards, 1);
}

// ============================================================================
// View changes through the layer manager
// ============================================================================

#[tokio::test]
async fn test_manager_redraws_on_view_change() {
    let projector = LinearProjector::new(sample_bounds(), 1000.0);
    let mut mgr = manager_with(Arc::new(fetcher()), &bundle(), projector.clone());
    mgr.toggle(LayerKind::AnnualFlux).unwrap();
    mgr.settle().await;

    let initial = mgr.attached_overlay(LayerKind::AnnualFlux).unwrap().screen_rect();
    assert_eq!(initial, Some(expected_rect(&projector)));

    let zoomed = projector.zoomed(2.0);
    mgr.on_view_changed(Box::new(zoomed.clone()));

    let redrawn = mgr.attached_overlay(LayerKind::AnnualFlux).unwrap().screen_rect();
    assert_eq!(redrawn, Some(expected_rect(&zoomed)));
    assert_ne!(initial, redrawn);
}

#[tokio::test]
async fn test_reattach_from_cache_uses_current_view() {
    let projector = LinearProjector::new(sample_bounds(), 1000.0);
    let mut mgr = manager_with(Arc::new(fetcher()), &bundle(), projector.clone());
    mgr.toggle(LayerKind::BuildingMask).unwrap();
    mgr.settle().await;
    mgr.toggle(LayerKind::BuildingMask).unwrap();

    let panned = projector.panned(-400.0, 60.0);
    mgr.on_view_changed(Box::new(panned.clone()));
    mgr.toggle(LayerKind::BuildingMask).unwrap();

    let rect = mgr.attached_overlay(LayerKind::BuildingMask).unwrap().screen_rect();
    assert_eq!(rect, Some(expected_rect(&panned)));
}

// ============================================================================
// Software surface with Web Mercator
// ============================================================================

#[tokio::test]
async fn test_raster_surface_composes_rendered_layer() {
    let bounds = sample_bounds();
    let view = WebMercatorProjector::new(bounds.center(), 19.0, 400, 400);
    let rect = view.project_bounds(&bounds).unwrap();
    assert!(rect.is_visible());

    let renderer = RasterRenderer::new(GridDecoder::new(Arc::new(fetcher())), RenderConfig::default());
    let styles = StyleConfig::builtin().unwrap();
    let mut mgr = LayerStateManager::from_bundle(
        &bundle(),
        &styles,
        renderer,
        RasterSurface::new(400, 400),
        Box::new(view),
    )
    .unwrap();

    mgr.toggle(LayerKind::BuildingMask).unwrap();
    mgr.settle().await;

    let canvas = mgr.surface().compose();
    let (cx, cy) = (200, 200);
    assert!(canvas.get_pixel(cx, cy).0[3] > 0, "center of the extent is covered");
    assert_eq!(canvas.get_pixel(0, 0).0[3], 0, "outside the extent stays clear");
    assert_eq!(mgr.surface().attached_kinds(), vec![LayerKind::BuildingMask]);
}
