//! Shared helpers for the map-overlay integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use geotiff_parser::GridDecoder;
use map_overlay::{ElementId, LayerStateManager, MapSurface};
use projection::ScreenRect;
use renderer::{RasterRenderer, RenderConfig, RenderedOverlay};
use solar_common::{DataLayers, LayerKind, StyleConfig};
use test_utils::{flux_grid, geotiff_f32, geotiff_u8, sample_bounds, LinearProjector, MockFetcher};

pub const ANNUAL_URL: &str = "https://solar.test/geoTiff:get?id=annual";
pub const MONTHLY_URL: &str = "https://solar.test/geoTiff:get?id=monthly";
pub const MASK_URL: &str = "https://solar.test/geoTiff:get?id=mask";

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Created(ElementId, LayerKind),
    Attached(ElementId),
    Positioned(ElementId, ScreenRect),
    Discarded(ElementId),
}

/// Surface that records every call made to it.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    next_id: u64,
    pub events: Vec<SurfaceEvent>,
    live: Vec<(ElementId, LayerKind, bool)>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kinds currently attached, in attach order.
    pub fn attached_kinds(&self) -> Vec<LayerKind> {
        self.live
            .iter()
            .filter(|(_, _, attached)| *attached)
            .map(|(_, kind, _)| *kind)
            .collect()
    }

    pub fn created_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::Created(..)))
            .count()
    }

    /// Every rectangle applied to `id`, oldest first.
    pub fn positions(&self, id: ElementId) -> Vec<ScreenRect> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Positioned(eid, rect) if *eid == id => Some(*rect),
                _ => None,
            })
            .collect()
    }
}

impl MapSurface for RecordingSurface {
    fn create_element(&mut self, overlay: Arc<RenderedOverlay>) -> ElementId {
        self.next_id += 1;
        let id = ElementId(self.next_id);
        self.events.push(SurfaceEvent::Created(id, overlay.kind()));
        self.live.push((id, overlay.kind(), false));
        id
    }

    fn attach(&mut self, id: ElementId) {
        self.events.push(SurfaceEvent::Attached(id));
        if let Some(entry) = self.live.iter_mut().find(|(eid, _, _)| *eid == id) {
            entry.2 = true;
        }
    }

    fn position(&mut self, id: ElementId, rect: ScreenRect) {
        self.events.push(SurfaceEvent::Positioned(id, rect));
    }

    fn discard(&mut self, id: ElementId) {
        self.events.push(SurfaceEvent::Discarded(id));
        self.live.retain(|(eid, _, _)| *eid != id);
    }
}

/// Bundle with annual flux, one monthly flux raster and a mask; no hourly shade.
pub fn bundle() -> DataLayers {
    DataLayers {
        annual_solar_flux_url: Some(ANNUAL_URL.to_string()),
        monthly_solar_flux_urls: vec![MONTHLY_URL.to_string()],
        building_mask_url: Some(MASK_URL.to_string()),
        bounding_box: Some(sample_bounds()),
        ..Default::default()
    }
}

/// Fetcher answering every URL in [`bundle`] with a small raster.
pub fn fetcher() -> MockFetcher {
    scripted(MockFetcher::new())
}

pub fn scripted(fetcher: MockFetcher) -> MockFetcher {
    fetcher
        .with_raster(ANNUAL_URL, geotiff_f32(6, 6, &flux_grid(6, 6, 1800.0)))
        .with_raster(MONTHLY_URL, geotiff_f32(6, 6, &flux_grid(6, 6, 200.0)))
        .with_raster(MASK_URL, geotiff_u8(2, 2, &[0, 1, 1, 0]))
}

pub fn manager_with(
    fetcher: Arc<MockFetcher>,
    bundle: &DataLayers,
    projector: LinearProjector,
) -> LayerStateManager<RecordingSurface> {
    let renderer = RasterRenderer::new(GridDecoder::new(fetcher), RenderConfig::default())
        .with_access_token("test-key");
    let styles = StyleConfig::builtin().expect("builtin styles");
    LayerStateManager::from_bundle(bundle, &styles, renderer, RecordingSurface::new(), Box::new(projector))
        .expect("manager setup")
}

pub fn manager(fetcher: Arc<MockFetcher>) -> LayerStateManager<RecordingSurface> {
    manager_with(fetcher, &bundle(), LinearProjector::new(sample_bounds(), 1000.0))
}
