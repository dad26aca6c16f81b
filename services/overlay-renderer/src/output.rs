//! PNG and summary output.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use serde::Serialize;
use tracing::info;

use map_overlay::{LayerStateManager, RasterSurface};
use renderer::export::write_png;
use solar_common::LayerKind;

/// Opaque backdrop standing in for satellite imagery in the composite.
pub const BASEMAP: Rgba<u8> = Rgba([38, 42, 48, 255]);

/// Per-layer result written to `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerReport {
    pub kind: LayerKind,
    pub label: &'static str,
    pub status: LayerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparent_pixels: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerStatus {
    Rendered,
    Failed,
    Unavailable,
    Inactive,
}

/// Write `<kind>.png` for every rendered layer and report on all four.
pub fn write_layers(manager: &LayerStateManager<RasterSurface>, dir: &Path) -> Result<Vec<LayerReport>> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut reports = Vec::with_capacity(LayerKind::COUNT);
    for view in manager.layer_states() {
        let mut report = LayerReport {
            kind: view.kind,
            label: view.label,
            status: LayerStatus::Inactive,
            file: None,
            width: None,
            height: None,
            transparent_pixels: None,
            error: view.error.clone(),
        };

        if let Some(overlay) = manager.cached_overlay(view.kind) {
            let path = dir.join(format!("{}.png", view.kind.as_str()));
            write_png(overlay, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(kind = %view.kind, path = %path.display(), "Wrote layer overlay");

            report.status = LayerStatus::Rendered;
            report.file = Some(path);
            report.width = Some(overlay.width());
            report.height = Some(overlay.height());
            report.transparent_pixels = Some(overlay.transparent_pixels());
        } else if view.disabled {
            report.status = LayerStatus::Unavailable;
        } else if view.error.is_some() {
            report.status = LayerStatus::Failed;
        }

        reports.push(report);
    }

    Ok(reports)
}

/// Compose the attached overlays over the basemap colour and save it.
pub fn write_composite(surface: &RasterSurface, path: &Path) -> Result<()> {
    let (width, height) = surface.dimensions();
    let mut canvas = RgbaImage::from_pixel(width, height, BASEMAP);
    surface.compose_onto(&mut canvas);
    canvas
        .save(path)
        .with_context(|| format!("Failed to write composite {}", path.display()))?;
    info!(path = %path.display(), layers = surface.attached_kinds().len(), "Wrote composite view");
    Ok(())
}

pub fn write_summary(reports: &[LayerReport], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use map_overlay::MapSurface;
    use projection::ScreenRect;
    use renderer::RenderedOverlay;
    use solar_common::GeoBoundingBox;

    #[test]
    fn test_composite_keeps_basemap_outside_overlays() {
        let bounds = GeoBoundingBox::from_degrees(40.0, -74.0, 40.001, -73.999).unwrap();
        let overlay = RenderedOverlay::new(LayerKind::BuildingMask, bounds, 1, 1, vec![255, 0, 255, 255]).unwrap();
        let mut surface = RasterSurface::new(8, 8);
        let id = surface.create_element(Arc::new(overlay));
        surface.attach(id);
        surface.position(
            id,
            ScreenRect {
                left: 2.0,
                top: 2.0,
                width: 4.0,
                height: 4.0,
            },
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composite.png");
        write_composite(&surface, &path).unwrap();

        let image = image::open(&path).unwrap().to_rgba8();
        assert_eq!(*image.get_pixel(0, 0), BASEMAP);
        assert_eq!(image.get_pixel(3, 3).0, [255, 0, 255, 255]);
    }

    #[test]
    fn test_summary_serialization() {
        let reports = vec![LayerReport {
            kind: LayerKind::HourlyShade,
            label: LayerKind::HourlyShade.label(),
            status: LayerStatus::Unavailable,
            file: None,
            width: None,
            height: None,
            transparent_pixels: None,
            error: None,
        }];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary(&reports, &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["kind"], "hourly_shade");
        assert_eq!(value[0]["status"], "unavailable");
        assert!(value[0].get("file").is_none());
    }
}
