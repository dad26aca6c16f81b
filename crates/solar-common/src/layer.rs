//! Raster layer kinds and the per-location bundle of layer sources.

use serde::{Deserialize, Serialize};

use crate::bbox::GeoBoundingBox;
use crate::style::{LayerStyle, Rgb, StyleError};

/// The closed set of raster layers the report view can overlay.
///
/// Declaration order doubles as the arena index used by the layer state
/// manager; see [`LayerKind::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    AnnualFlux,
    MonthlyFlux,
    HourlyShade,
    BuildingMask,
}

impl LayerKind {
    pub const COUNT: usize = 4;

    /// All kinds, in arena order.
    pub const ALL: [LayerKind; Self::COUNT] = [
        LayerKind::AnnualFlux,
        LayerKind::MonthlyFlux,
        LayerKind::HourlyShade,
        LayerKind::BuildingMask,
    ];

    /// Order in which the layer menu lists the kinds.
    pub const DISPLAY_ORDER: [LayerKind; Self::COUNT] = [
        LayerKind::AnnualFlux,
        LayerKind::BuildingMask,
        LayerKind::MonthlyFlux,
        LayerKind::HourlyShade,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::AnnualFlux => "annual_flux",
            LayerKind::MonthlyFlux => "monthly_flux",
            LayerKind::HourlyShade => "hourly_shade",
            LayerKind::BuildingMask => "building_mask",
        }
    }

    /// Label shown in the layer menu.
    pub fn label(self) -> &'static str {
        match self {
            LayerKind::AnnualFlux => "Annual Sun Exposure",
            LayerKind::MonthlyFlux => "Monthly Sun Exposure",
            LayerKind::HourlyShade => "Hourly Shade (Dec)",
            LayerKind::BuildingMask => "Building Mask",
        }
    }

    /// Mask layers sit under the flux/shade layers and use a lower alpha.
    pub fn is_mask(self) -> bool {
        matches!(self, LayerKind::BuildingMask)
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "annual_flux" | "annualflux" => Ok(LayerKind::AnnualFlux),
            "monthly_flux" | "monthlyflux" => Ok(LayerKind::MonthlyFlux),
            "hourly_shade" | "hourlyshade" => Ok(LayerKind::HourlyShade),
            "building_mask" | "buildingmask" | "mask" => Ok(LayerKind::BuildingMask),
            other => Err(format!(
                "unknown layer '{}', expected one of annual_flux, monthly_flux, hourly_shade, building_mask",
                other
            )),
        }
    }
}

/// Layer source URLs and extent for one location, as returned by the
/// data-layers analysis call.
///
/// Empty strings are treated the same as missing URLs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataLayers {
    #[serde(default)]
    pub rgb_imagery_url: Option<String>,
    #[serde(default)]
    pub digital_surface_model_url: Option<String>,
    #[serde(default)]
    pub annual_solar_flux_url: Option<String>,
    #[serde(default)]
    pub monthly_solar_flux_urls: Vec<String>,
    #[serde(default)]
    pub hourly_shade_urls: Vec<String>,
    #[serde(default)]
    pub building_mask_url: Option<String>,
    #[serde(default)]
    pub bounding_box: Option<GeoBoundingBox>,
}

/// One entry of the raw `dataLayers` list.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiDataLayer {
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default)]
    pub source: Option<ApiLayerSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiLayerSource {
    #[serde(default)]
    pub uri: Option<String>,
}

impl ApiDataLayer {
    fn uri(&self) -> Option<String> {
        self.source
            .as_ref()
            .and_then(|s| s.uri.clone())
            .filter(|u| !u.is_empty())
    }
}

impl DataLayers {
    /// Build the bundle from the raw layer list returned by the analysis API.
    pub fn from_layer_list(layers: &[ApiDataLayer], bounding_box: Option<GeoBoundingBox>) -> Self {
        let first = |ty: &str| {
            layers
                .iter()
                .filter(|l| l.layer_type == ty)
                .find_map(|l| l.uri())
        };
        let all = |ty: &str| {
            layers
                .iter()
                .filter(|l| l.layer_type == ty)
                .filter_map(|l| l.uri())
                .collect::<Vec<_>>()
        };

        Self {
            rgb_imagery_url: first("RGB_IMAGERY"),
            digital_surface_model_url: first("DIGITAL_SURFACE_MODEL"),
            annual_solar_flux_url: first("ANNUAL_SOLAR_FLUX"),
            monthly_solar_flux_urls: all("MONTHLY_SOLAR_FLUX"),
            hourly_shade_urls: all("HOURLY_SHADE"),
            building_mask_url: first("BUILDING_MASK"),
            bounding_box,
        }
    }

    /// Source URL for a layer kind, if this location has one.
    ///
    /// Monthly flux uses the first monthly raster and hourly shade uses the
    /// first (December) shade raster.
    pub fn source_url(&self, kind: LayerKind) -> Option<&str> {
        let url = match kind {
            LayerKind::AnnualFlux => self.annual_solar_flux_url.as_deref(),
            LayerKind::MonthlyFlux => self.monthly_solar_flux_urls.first().map(String::as_str),
            LayerKind::HourlyShade => self.hourly_shade_urls.first().map(String::as_str),
            LayerKind::BuildingMask => self.building_mask_url.as_deref(),
        };
        url.filter(|u| !u.trim().is_empty())
    }

    pub fn is_available(&self, kind: LayerKind) -> bool {
        self.source_url(kind).is_some()
    }
}

/// Everything needed to fetch and color one layer.
///
/// Values below `min` are no-data and render fully transparent; they are
/// never clamped into the ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    pub kind: LayerKind,
    /// Absent when this location has no raster of this kind.
    pub source_url: Option<String>,
    pub min: f32,
    pub max: f32,
    /// Alpha applied to every colored pixel.
    pub opacity: u8,
    /// Band to read from multi-band rasters.
    pub band: usize,
    ramp: Vec<Rgb>,
}

impl RasterLayer {
    /// Resolve a layer from its style and an optional source URL.
    pub fn from_style(
        kind: LayerKind,
        source_url: Option<String>,
        style: &LayerStyle,
    ) -> Result<Self, StyleError> {
        style.validate()?;
        Ok(Self {
            kind,
            source_url: source_url.filter(|u| !u.trim().is_empty()),
            min: style.min,
            max: style.max,
            opacity: style.opacity,
            band: style.band,
            ramp: style.ramp()?,
        })
    }

    /// Build all four layers for a location.
    pub fn resolve_all(
        bundle: &DataLayers,
        styles: &crate::style::StyleConfig,
    ) -> Result<Vec<RasterLayer>, StyleError> {
        LayerKind::ALL
            .iter()
            .map(|&kind| {
                let style = styles.get(kind)?;
                RasterLayer::from_style(kind, bundle.source_url(kind).map(str::to_string), style)
            })
            .collect()
    }

    /// Color ramp; never empty.
    pub fn ramp(&self) -> &[Rgb] {
        &self.ramp
    }

    pub fn is_available(&self) -> bool {
        self.source_url.is_some()
    }
}
