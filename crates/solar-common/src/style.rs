//! Layer style configuration.
//!
//! Styles are loaded from JSON (or YAML) files. The production defaults live
//! in `config/styles/solar_layers.json` and are compiled in, so a style file
//! only needs to list the layers it overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::layer::LayerKind;

const BUILTIN_STYLES: &str = include_str!("../../../config/styles/solar_layers.json");

/// Root style configuration, one entry per layer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Version of the style schema
    #[serde(default = "default_version")]
    pub version: String,

    pub layers: HashMap<LayerKind, LayerStyle>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl StyleConfig {
    /// The compiled-in production styles.
    pub fn builtin() -> Result<Self, StyleError> {
        Self::from_json(BUILTIN_STYLES)
    }

    /// Load a style file; `.yaml`/`.yml` files are parsed as YAML, anything
    /// else as JSON. Layers missing from the file fall back to the builtin
    /// style.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StyleError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| StyleError::Io(e.to_string()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let config = if is_yaml {
            Self::from_yaml(&content)?
        } else {
            Self::from_json(&content)?
        };

        config.with_defaults(Self::builtin()?)
    }

    /// Parse and validate a JSON style document.
    pub fn from_json(json: &str) -> Result<Self, StyleError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| StyleError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML style document.
    pub fn from_yaml(yaml: &str) -> Result<Self, StyleError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| StyleError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Fill in any layer this config does not define from `defaults`.
    pub fn with_defaults(mut self, defaults: StyleConfig) -> Result<Self, StyleError> {
        for (kind, style) in defaults.layers {
            self.layers.entry(kind).or_insert(style);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn get(&self, kind: LayerKind) -> Result<&LayerStyle, StyleError> {
        self.layers.get(&kind).ok_or(StyleError::Missing(kind))
    }

    /// Validate all styles in the configuration.
    pub fn validate(&self) -> Result<(), StyleError> {
        for (kind, style) in &self.layers {
            style
                .validate()
                .map_err(|e| StyleError::Validation(format!("{}: {}", kind, e)))?;
        }
        Ok(())
    }
}

/// Rendering parameters for a single layer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerStyle {
    pub title: String,

    #[serde(default)]
    pub units: Option<String>,

    /// Values below this are no-data.
    pub min: f32,

    /// Values at or above this map to the last stop.
    pub max: f32,

    /// Alpha (0-255) for every colored pixel.
    pub opacity: u8,

    /// Band index for multi-band rasters.
    #[serde(default)]
    pub band: usize,

    /// Ordered color ramp as hex strings.
    pub stops: Vec<String>,
}

impl LayerStyle {
    pub fn validate(&self) -> Result<(), StyleError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(StyleError::Validation(format!(
                "range ({}, {}) must be finite",
                self.min, self.max
            )));
        }
        if self.max < self.min {
            return Err(StyleError::Validation(format!(
                "max {} is below min {}",
                self.max, self.min
            )));
        }
        if self.stops.is_empty() {
            return Err(StyleError::Validation("color ramp has no stops".to_string()));
        }
        for stop in &self.stops {
            if Rgb::from_hex(stop).is_none() {
                return Err(StyleError::Validation(format!("invalid color '{}'", stop)));
            }
        }
        Ok(())
    }

    /// Parsed color ramp.
    pub fn ramp(&self) -> Result<Vec<Rgb>, StyleError> {
        self.stops
            .iter()
            .map(|s| Rgb::from_hex(s).ok_or_else(|| StyleError::Validation(format!("invalid color '{}'", s))))
            .collect()
    }
}

/// An opaque RGB color stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `RRGGBB` (case-insensitive).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

        Some(Self { r, g, b })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StyleError {
    #[error("Failed to read style file: {0}")]
    Io(String),

    #[error("Failed to parse style: {0}")]
    Parse(String),

    #[error("Invalid style: {0}")]
    Validation(String),

    #[error("No style defined for layer {0}")]
    Missing(LayerKind),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_styles() {
        let config = StyleConfig::builtin().unwrap();
        assert_eq!(config.layers.len(), LayerKind::COUNT);

        let annual = config.get(LayerKind::AnnualFlux).unwrap();
        assert_eq!((annual.min, annual.max), (0.0, 1800.0));
        assert_eq!(annual.opacity, 200);
        assert_eq!(annual.ramp().unwrap().first(), Some(&Rgb::BLACK));
        assert_eq!(annual.ramp().unwrap().last(), Some(&Rgb::WHITE));

        let mask = config.get(LayerKind::BuildingMask).unwrap();
        assert_eq!(mask.opacity, 128);
        assert_eq!(mask.ramp().unwrap(), vec![Rgb::new(255, 0, 255)]);
    }

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Rgb::from_hex("#643CBb"), Some(Rgb::new(0x64, 0x3C, 0xBB)));
        assert_eq!(Rgb::from_hex("FFBF42"), Some(Rgb::new(255, 191, 66)));
        assert_eq!(Rgb::from_hex("#FFF"), None);
        assert_eq!(Rgb::from_hex("#GG0000"), None);
        assert_eq!(Rgb::new(255, 191, 66).to_hex(), "#FFBF42");
    }

    #[test]
    fn test_validation_rejects_empty_ramp() {
        let json = r#"{"layers": {"building_mask": {"title": "Mask", "min": 0, "max": 1, "opacity": 128, "stops": []}}}"#;
        assert!(matches!(
            StyleConfig::from_json(json),
            Err(StyleError::Validation(_))
        ));
    }

    #[test]
    fn test_validation_rejects_inverted_range() {
        let json = r##"{"layers": {"annual_flux": {"title": "Flux", "min": 10, "max": 1, "opacity": 200, "stops": ["#000000"]}}}"##;
        assert!(StyleConfig::from_json(json).is_err());
    }

    #[test]
    fn test_unknown_layer_rejected() {
        let json = r##"{"layers": {"rgb_imagery": {"title": "RGB", "min": 0, "max": 1, "opacity": 255, "stops": ["#000000"]}}}"##;
        assert!(matches!(StyleConfig::from_json(json), Err(StyleError::Parse(_))));
    }

    #[test]
    fn test_partial_file_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("override.yaml");
        std::fs::write(
            &path,
            "layers:\n  monthly_flux:\n    title: Monthly\n    min: 0\n    max: 150\n    opacity: 180\n    band: 6\n    stops: ['#000000', '#FFFFFF']\n",
        )
        .unwrap();

        let config = StyleConfig::from_file(&path).unwrap();
        let monthly = config.get(LayerKind::MonthlyFlux).unwrap();
        assert_eq!(monthly.max, 150.0);
        assert_eq!(monthly.band, 6);
        assert_eq!(config.get(LayerKind::AnnualFlux).unwrap().max, 1800.0);
    }
}
