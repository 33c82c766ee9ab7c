//! Coordinate types, parsing and projection.

use schemars::JsonSchema;

use crate::prelude::*;

pub mod parse;
pub mod projection;

/// A northing/easting pair as printed on a survey document, in meters.
#[derive(Clone, Copy, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawCoordinatePair {
    /// Distance north of the zone's false origin.
    pub northing: f64,
    /// Distance east of the zone's false origin.
    pub easting: f64,
}

/// A geographic point in degrees, serialized as `[latitude, longitude]`.
#[derive(Clone, Copy, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
pub struct GeoPoint(pub f64, pub f64);

impl GeoPoint {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }

    /// Do both components hold real numbers?
    pub fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }
}
