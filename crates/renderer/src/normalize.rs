//! Value normalization against a layer's data range.

/// Normalize `value` into `[0, 1]` for the range `(min, max)`.
///
/// Returns `None` for values below `min` (the no-data sentinels sit there)
/// and for NaN. Values above `max` clamp to `1.0`. A degenerate range
/// (`max == min`) maps every accepted value to `1.0`.
#[inline]
pub fn normalize(value: f32, min: f32, max: f32) -> Option<f32> {
    if value.is_nan() || value < min {
        return None;
    }

    let range = max - min;
    if range == 0.0 {
        return Some(1.0);
    }

    Some(((value - min) / range).clamp(0.0, 1.0))
}
