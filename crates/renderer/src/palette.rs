//! Color ramps and normalized-value lookup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solar_common::{RasterLayer, Rgb};

/// How a normalized value selects a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteMode {
    /// `floor(n * (N - 1))` picks a stop; hard color bands
    #[default]
    Floor,
    /// Blend the two stops around `n * (N - 1)`
    Linear,
}

impl FromStr for PaletteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "floor" | "step" => Ok(PaletteMode::Floor),
            "linear" | "smooth" => Ok(PaletteMode::Linear),
            other => Err(format!("unknown palette mode '{}'", other)),
        }
    }
}

impl fmt::Display for PaletteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaletteMode::Floor => write!(f, "floor"),
            PaletteMode::Linear => write!(f, "linear"),
        }
    }
}

/// An ordered, non-empty color ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    stops: Vec<Rgb>,
    mode: PaletteMode,
}

impl Palette {
    /// Build a floor-quantized palette. Returns `None` for an empty ramp.
    pub fn new(stops: Vec<Rgb>) -> Option<Self> {
        if stops.is_empty() {
            return None;
        }
        Some(Self {
            stops,
            mode: PaletteMode::Floor,
        })
    }

    /// Palette for a resolved layer. Layer ramps are never empty.
    pub fn from_layer(layer: &RasterLayer) -> Self {
        Self {
            stops: layer.ramp().to_vec(),
            mode: PaletteMode::Floor,
        }
    }

    pub fn with_mode(mut self, mode: PaletteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> PaletteMode {
        self.mode
    }

    pub fn stops(&self) -> &[Rgb] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Stop index selected by floor quantization of `normalized`.
    #[inline]
    pub fn index_for(&self, normalized: f32) -> usize {
        let last = self.stops.len() - 1;
        let scaled = (normalized.clamp(0.0, 1.0) * last as f32).floor();
        (scaled as usize).min(last)
    }

    /// Color for a normalized value in `[0, 1]`.
    #[inline]
    pub fn color_for(&self, normalized: f32) -> Rgb {
        match self.mode {
            PaletteMode::Floor => self.stops[self.index_for(normalized)],
            PaletteMode::Linear => self.interpolate(normalized),
        }
    }

    fn interpolate(&self, normalized: f32) -> Rgb {
        let last = self.stops.len() - 1;
        let position = normalized.clamp(0.0, 1.0) * last as f32;
        let lower = (position.floor() as usize).min(last);
        let upper = (lower + 1).min(last);
        let t = position - lower as f32;

        let a = self.stops[lower];
        let b = self.stops[upper];
        Rgb::new(lerp(a.r, b.r, t), lerp(a.g, b.g, t), lerp(a.b, b.b, t))
    }
}

#[inline]
fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8
}
