//! Geographic extents for georeferenced rasters.

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in degrees.
///
/// Accepts both `{latitude, longitude}` (analysis API) and `{lat, lng}`
/// (map widget) spellings when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng")]
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// The rectangular geographic extent covered by a rendered raster.
///
/// Invariant: `sw.latitude < ne.latitude` and `sw.longitude < ne.longitude`,
/// all coordinates finite and within WGS84 limits. Deserialization goes
/// through the same validation as [`GeoBoundingBox::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBoundingBox")]
pub struct GeoBoundingBox {
    sw: LatLng,
    ne: LatLng,
}

#[derive(Deserialize)]
struct RawBoundingBox {
    sw: LatLng,
    ne: LatLng,
}

impl TryFrom<RawBoundingBox> for GeoBoundingBox {
    type Error = BboxError;

    fn try_from(raw: RawBoundingBox) -> Result<Self, Self::Error> {
        GeoBoundingBox::new(raw.sw, raw.ne)
    }
}

impl GeoBoundingBox {
    /// Create a bounding box from its south-west and north-east corners.
    ///
    /// Boxes crossing the antimeridian (west longitude east of the east
    /// longitude) are rejected with [`BboxError::CrossesAntimeridian`]; the
    /// overlay math assumes `sw.longitude < ne.longitude`.
    pub fn new(sw: LatLng, ne: LatLng) -> Result<Self, BboxError> {
        for corner in [sw, ne] {
            if !corner.latitude.is_finite() || !corner.longitude.is_finite() {
                return Err(BboxError::NonFinite);
            }
            if corner.latitude.abs() > 90.0 || corner.longitude.abs() > 180.0 {
                return Err(BboxError::OutOfRange {
                    latitude: corner.latitude,
                    longitude: corner.longitude,
                });
            }
        }

        if sw.latitude >= ne.latitude {
            return Err(BboxError::InvertedLatitude {
                south: sw.latitude,
                north: ne.latitude,
            });
        }

        if sw.longitude > ne.longitude {
            return Err(BboxError::CrossesAntimeridian {
                west: sw.longitude,
                east: ne.longitude,
            });
        }

        if sw.longitude == ne.longitude {
            return Err(BboxError::DegenerateLongitude {
                west: sw.longitude,
                east: ne.longitude,
            });
        }

        Ok(Self { sw, ne })
    }

    /// Convenience constructor from raw degrees.
    pub fn from_degrees(
        sw_lat: f64,
        sw_lng: f64,
        ne_lat: f64,
        ne_lng: f64,
    ) -> Result<Self, BboxError> {
        Self::new(LatLng::new(sw_lat, sw_lng), LatLng::new(ne_lat, ne_lng))
    }

    pub fn south_west(&self) -> LatLng {
        self.sw
    }

    pub fn north_east(&self) -> LatLng {
        self.ne
    }

    /// Latitude span in degrees.
    pub fn height_deg(&self) -> f64 {
        self.ne.latitude - self.sw.latitude
    }

    /// Longitude span in degrees.
    pub fn width_deg(&self) -> f64 {
        self.ne.longitude - self.sw.longitude
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.sw.latitude + self.ne.latitude) / 2.0,
            (self.sw.longitude + self.ne.longitude) / 2.0,
        )
    }

    /// Check if a point falls inside this extent (edges inclusive).
    pub fn contains(&self, point: LatLng) -> bool {
        point.latitude >= self.sw.latitude
            && point.latitude <= self.ne.latitude
            && point.longitude >= self.sw.longitude
            && point.longitude <= self.ne.longitude
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BboxError {
    #[error("bounding box coordinates must be finite")]
    NonFinite,

    #[error("coordinate ({latitude}, {longitude}) is outside WGS84 limits")]
    OutOfRange { latitude: f64, longitude: f64 },

    #[error("south-west latitude {south} must be below north-east latitude {north}")]
    InvertedLatitude { south: f64, north: f64 },

    #[error("longitudes {west}..{east} do not define a rectangle")]
    DegenerateLongitude { west: f64, east: f64 },

    #[error("longitudes {west}..{east} cross the antimeridian, which is not supported")]
    CrossesAntimeridian { west: f64, east: f64 },
}
