//! Application context: configuration plus the lazily built HTTP backend.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use geotiff_parser::{FetchConfig, HttpFetcher};
use map_overlay::{MapContext, MapInitError};
use renderer::RenderConfig;
use solar_common::{DataLayers, StyleConfig};

pub struct AppContext {
    pub styles: StyleConfig,
    pub fetch_config: FetchConfig,
    pub render_config: RenderConfig,
    map: MapContext<Arc<HttpFetcher>>,
}

impl AppContext {
    pub fn new(api_key: Option<String>, styles: StyleConfig) -> Self {
        Self {
            styles,
            fetch_config: FetchConfig::from_env(),
            render_config: RenderConfig::from_env(),
            map: MapContext::new(api_key),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.map.api_key()
    }

    /// HTTP client for raster downloads, built on first use.
    pub async fn fetcher(&self) -> Result<Arc<HttpFetcher>, MapInitError> {
        let config = self.fetch_config.clone();
        let fetcher = self
            .map
            .ensure_initialized(|_key| async move {
                HttpFetcher::new(&config)
                    .map(Arc::new)
                    .map_err(|e| MapInitError::Load(e.to_string()))
            })
            .await?;
        Ok(Arc::clone(fetcher))
    }
}

/// Built-in styles, optionally overridden by a JSON/YAML file.
pub fn load_styles(path: Option<&Path>) -> Result<StyleConfig> {
    match path {
        Some(path) => {
            let styles = StyleConfig::from_file(path)
                .with_context(|| format!("Failed to load layer styles from {}", path.display()))?;
            info!(path = %path.display(), "Loaded layer style overrides");
            Ok(styles)
        }
        None => StyleConfig::builtin().context("Built-in layer styles are invalid"),
    }
}

/// Read a data-layers bundle (the analysis API's JSON shape).
pub fn load_bundle(path: &Path) -> Result<DataLayers> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bundle {}", path.display()))?;
    let bundle: DataLayers = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse bundle {}", path.display()))?;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solar_common::LayerKind;
    use std::io::Write;

    #[test]
    fn test_missing_api_key_fails_init() {
        let ctx = AppContext::new(None, StyleConfig::builtin().unwrap());
        let err = tokio_test::block_on(ctx.fetcher()).unwrap_err();
        assert_eq!(err, MapInitError::MissingApiKey);
    }

    #[test]
    fn test_fetcher_is_built_once() {
        let ctx = AppContext::new(Some("key".into()), StyleConfig::builtin().unwrap());
        let a = tokio_test::block_on(ctx.fetcher()).unwrap();
        let b = tokio_test::block_on(ctx.fetcher()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_load_bundle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "annualSolarFluxUrl": "https://solar.test/annual",
                "monthlySolarFluxUrls": ["https://solar.test/m1", "https://solar.test/m2"],
                "hourlyShadeUrls": [],
                "buildingMaskUrl": null,
                "boundingBox": {{
                    "sw": {{"latitude": 40.0, "longitude": -74.0}},
                    "ne": {{"latitude": 40.001, "longitude": -73.999}}
                }}
            }}"#
        )
        .unwrap();

        let bundle = load_bundle(file.path()).unwrap();

        assert_eq!(bundle.source_url(LayerKind::MonthlyFlux), Some("https://solar.test/m1"));
        assert!(!bundle.is_available(LayerKind::HourlyShade));
        assert!(bundle.bounding_box.is_some());
    }

    #[test]
    fn test_load_bundle_rejects_inverted_bounds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"boundingBox": {{"sw": {{"lat": 41.0, "lng": -74.0}}, "ne": {{"lat": 40.0, "lng": -73.0}}}}}}"#
        )
        .unwrap();

        assert!(load_bundle(file.path()).is_err());
    }
}
