//! UTM ⇄ geographic coordinate conversion on the WGS84 ellipsoid.
//!
//! This is the "exact" transverse Mercator of Poder and Engsager: a 6th-order
//! Krüger series evaluated with Clenshaw summation, mapping between the
//! ellipsoid and a conformal sphere. It is the same algorithm PROJ uses for
//! `+proj=utm`, and agrees with it to floating-point precision.
//!
//! References:
//!
//! - Krüger, L. (1912). _Konforme Abbildung des Erdellipsoids in der Ebene_.
//! - Poder, K. and Engsager, K. (1998). _Some Conformal Mappings and
//!   Transformations for Geodesy and Topographic Cartography_.

use std::f64::consts::PI;

use schemars::JsonSchema;

use super::{GeoPoint, RawCoordinatePair};
use crate::prelude::*;

/// UTM scale factor on the central meridian.
const UTM_SCALE_FACTOR: f64 = 0.9996;

/// UTM false easting, in meters.
const UTM_FALSE_EASTING: f64 = 500_000.0;

/// UTM false northing for the southern hemisphere, in meters.
const UTM_SOUTH_FALSE_NORTHING: f64 = 10_000_000.0;

/// Largest normalized easting for which the series is valid.
const MAX_NORMALIZED_EASTING: f64 = 2.623395162778;

/// A reference ellipsoid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    /// Equatorial radius, in meters.
    pub semi_major_axis: f64,
    /// Flattening, `(a - b) / a`.
    pub flattening: f64,
}

/// The WGS84 ellipsoid.
pub const WGS84: Ellipsoid = Ellipsoid {
    semi_major_axis: 6_378_137.0,
    flattening: 1.0 / 298.257_223_563,
};

/// Which false northing convention a UTM zone uses.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Hemisphere {
    #[default]
    North,
    South,
}

/// A UTM zone: a 6° band of longitude plus a hemisphere.
#[derive(Clone, Copy, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UtmZone {
    /// Zone number, from 1 to 60.
    pub number: u8,
    /// Hemisphere.
    #[serde(default)]
    pub hemisphere: Hemisphere,
}

impl Default for UtmZone {
    fn default() -> Self {
        Self {
            number: 40,
            hemisphere: Hemisphere::North,
        }
    }
}

impl UtmZone {
    /// The central meridian of this zone, in degrees.
    pub fn central_meridian(&self) -> f64 {
        f64::from(self.number) * 6.0 - 183.0
    }

    fn false_northing(&self) -> f64 {
        match self.hemisphere {
            Hemisphere::North => 0.0,
            Hemisphere::South => UTM_SOUTH_FALSE_NORTHING,
        }
    }
}

/// Why a coordinate could not be converted.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("UTM zone {0} is not between 1 and 60")]
    InvalidZone(u8),

    #[error("coordinate ({0}, {1}) is not a finite number")]
    NonFinite(f64, f64),

    #[error("coordinate ({0}, {1}) is outside the valid area of UTM zone {2}")]
    OutOfDomain(f64, f64, u8),
}

/// A UTM projection for a single zone, with all series coefficients
/// precomputed.
#[derive(Clone, Debug)]
pub struct UtmProjection {
    zone: UtmZone,
    semi_major_axis: f64,
    /// Central meridian, in radians.
    lon0: f64,
    /// Meridian quadrant, scaled by `k0` and normalized by `a`.
    qn: f64,
    /// Gaussian latitude → geodetic latitude.
    cgb: [f64; 6],
    /// Geodetic latitude → Gaussian latitude.
    cbg: [f64; 6],
    /// Ellipsoidal TM → spherical TM.
    utg: [f64; 6],
    /// Spherical TM → ellipsoidal TM.
    gtu: [f64; 6],
}

impl UtmProjection {
    /// Create a projection for `zone` on WGS84.
    pub fn new(zone: UtmZone) -> Result<Self, ProjectionError> {
        Self::with_ellipsoid(zone, WGS84)
    }

    /// Create a projection for `zone` on an arbitrary ellipsoid.
    pub fn with_ellipsoid(
        zone: UtmZone,
        ellipsoid: Ellipsoid,
    ) -> Result<Self, ProjectionError> {
        if !(1..=60).contains(&zone.number) {
            return Err(ProjectionError::InvalidZone(zone.number));
        }

        let f = ellipsoid.flattening;
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let cgb = [
            n * (2.0
                + n * (-2.0 / 3.0
                    + n * (-2.0
                        + n * (116.0 / 45.0 + n * (26.0 / 45.0 + n * (-2854.0 / 675.0)))))),
            n2 * (7.0 / 3.0
                + n * (-8.0 / 5.0
                    + n * (-227.0 / 45.0 + n * (2704.0 / 315.0 + n * (2323.0 / 945.0))))),
            n3 * (56.0 / 15.0
                + n * (-136.0 / 35.0 + n * (-1262.0 / 105.0 + n * (73814.0 / 2835.0)))),
            n4 * (4279.0 / 630.0 + n * (-332.0 / 35.0 + n * (-399572.0 / 14175.0))),
            n5 * (4174.0 / 315.0 + n * (-144838.0 / 6237.0)),
            n6 * (601676.0 / 22275.0),
        ];
        let cbg = [
            n * (-2.0
                + n * (2.0 / 3.0
                    + n * (4.0 / 3.0
                        + n * (-82.0 / 45.0 + n * (32.0 / 45.0 + n * (4642.0 / 4725.0)))))),
            n2 * (5.0 / 3.0
                + n * (-16.0 / 15.0
                    + n * (-13.0 / 9.0 + n * (904.0 / 315.0 + n * (-1522.0 / 945.0))))),
            n3 * (-26.0 / 15.0
                + n * (34.0 / 21.0 + n * (8.0 / 5.0 + n * (-12686.0 / 2835.0)))),
            n4 * (1237.0 / 630.0 + n * (-12.0 / 5.0 + n * (-24832.0 / 14175.0))),
            n5 * (-734.0 / 315.0 + n * (109598.0 / 31185.0)),
            n6 * (444337.0 / 155925.0),
        ];
        let utg = [
            n * (-0.5
                + n * (2.0 / 3.0
                    + n * (-37.0 / 96.0
                        + n * (1.0 / 360.0
                            + n * (81.0 / 512.0 + n * (-96199.0 / 604800.0)))))),
            n2 * (-1.0 / 48.0
                + n * (-1.0 / 15.0
                    + n * (437.0 / 1440.0
                        + n * (-46.0 / 105.0 + n * (1118711.0 / 3870720.0))))),
            n3 * (-17.0 / 480.0
                + n * (37.0 / 840.0 + n * (209.0 / 4480.0 + n * (-5569.0 / 90720.0)))),
            n4 * (-4397.0 / 161280.0 + n * (11.0 / 504.0 + n * (830251.0 / 7257600.0))),
            n5 * (-4583.0 / 161280.0 + n * (108847.0 / 3991680.0)),
            n6 * (-20648693.0 / 638668800.0),
        ];
        let gtu = [
            n * (0.5
                + n * (-2.0 / 3.0
                    + n * (5.0 / 16.0
                        + n * (41.0 / 180.0
                            + n * (-127.0 / 288.0 + n * (7891.0 / 37800.0)))))),
            n2 * (13.0 / 48.0
                + n * (-3.0 / 5.0
                    + n * (557.0 / 1440.0
                        + n * (281.0 / 630.0 + n * (-1983433.0 / 1935360.0))))),
            n3 * (61.0 / 240.0
                + n * (-103.0 / 140.0
                    + n * (15061.0 / 26880.0 + n * (167603.0 / 181440.0)))),
            n4 * (49561.0 / 161280.0
                + n * (-179.0 / 168.0 + n * (6601661.0 / 7257600.0))),
            n5 * (34729.0 / 80640.0 + n * (-3418889.0 / 1995840.0)),
            n6 * (212378941.0 / 319334400.0),
        ];

        let qn = UTM_SCALE_FACTOR / (1.0 + n)
            * (1.0 + n2 * (1.0 / 4.0 + n2 * (1.0 / 64.0 + n2 / 256.0)));

        Ok(Self {
            zone,
            semi_major_axis: ellipsoid.semi_major_axis,
            lon0: zone.central_meridian().to_radians(),
            qn,
            cgb,
            cbg,
            utg,
            gtu,
        })
    }

    /// The zone this projection was built for.
    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    /// Convert a northing/easting pair in this zone to latitude/longitude.
    pub fn to_geo(&self, pair: RawCoordinatePair) -> Result<GeoPoint, ProjectionError> {
        let RawCoordinatePair { northing, easting } = pair;
        if !northing.is_finite() || !easting.is_finite() {
            return Err(ProjectionError::NonFinite(northing, easting));
        }

        let x = (easting - UTM_FALSE_EASTING) / self.semi_major_axis;
        let y = (northing - self.zone.false_northing()) / self.semi_major_axis;

        // Normalize to the spherical TM plane.
        let mut cn = y / self.qn;
        let mut ce = x / self.qn;
        if ce.abs() > MAX_NORMALIZED_EASTING {
            return Err(ProjectionError::OutOfDomain(northing, easting, self.zone.number));
        }

        // Ellipsoidal TM → spherical TM.
        let (d_cn, d_ce) = clenshaw_complex(&self.utg, 2.0 * cn, 2.0 * ce);
        cn += d_cn;
        ce += d_ce;
        ce = ce.sinh().atan();

        // Spherical TM → Gaussian latitude/longitude.
        let (sin_cn, cos_cn) = cn.sin_cos();
        let (sin_ce, cos_ce) = ce.sin_cos();
        let lam = sin_ce.atan2(cos_ce * cos_cn);
        let gaussian_lat = (sin_cn * cos_ce).atan2(sin_ce.hypot(cos_ce * cos_cn));

        // Gaussian latitude → geodetic latitude.
        let phi = clenshaw(&self.cgb, gaussian_lat);
        let lon = normalize_longitude(lam + self.lon0);
        Ok(GeoPoint(phi.to_degrees(), lon.to_degrees()))
    }

    /// Convert latitude/longitude to a northing/easting pair in this zone.
    pub fn from_geo(&self, point: GeoPoint) -> Result<RawCoordinatePair, ProjectionError> {
        if !point.is_finite() {
            return Err(ProjectionError::NonFinite(point.lat(), point.lon()));
        }
        if point.lat().abs() > 90.0 {
            return Err(ProjectionError::OutOfDomain(
                point.lat(),
                point.lon(),
                self.zone.number,
            ));
        }

        let phi = point.lat().to_radians();
        let lam = normalize_longitude(point.lon().to_radians() - self.lon0);

        // Geodetic latitude → Gaussian latitude.
        let mut cn = clenshaw(&self.cbg, phi);

        // Gaussian latitude/longitude → spherical TM.
        let (sin_cn, cos_cn) = cn.sin_cos();
        let (sin_ce, cos_ce) = lam.sin_cos();
        cn = sin_cn.atan2(cos_ce * cos_cn);
        let mut ce = (sin_ce * cos_cn).atan2(sin_cn.hypot(cos_cn * cos_ce));
        ce = ce.tan().asinh();

        // Spherical TM → ellipsoidal TM.
        let (d_cn, d_ce) = clenshaw_complex(&self.gtu, 2.0 * cn, 2.0 * ce);
        cn += d_cn;
        ce += d_ce;
        if ce.abs() > MAX_NORMALIZED_EASTING {
            return Err(ProjectionError::OutOfDomain(
                point.lat(),
                point.lon(),
                self.zone.number,
            ));
        }

        let a = self.semi_major_axis;
        Ok(RawCoordinatePair {
            northing: a * self.qn * cn + self.zone.false_northing(),
            easting: a * self.qn * ce + UTM_FALSE_EASTING,
        })
    }
}

/// Evaluate `b + Σ coeffs[k] · sin(2(k+1)b)` by Clenshaw summation.
fn clenshaw(coeffs: &[f64; 6], b: f64) -> f64 {
    let (sin_2b, cos_2b) = (2.0 * b).sin_cos();
    let two_cos_2b = 2.0 * cos_2b;
    let mut h1 = coeffs[5];
    let mut h2 = 0.0;
    let mut h = h1;
    for &c in coeffs[..5].iter().rev() {
        h = -h2 + two_cos_2b * h1 + c;
        h2 = h1;
        h1 = h;
    }
    b + h * sin_2b
}

/// Complex Clenshaw summation of `Σ coeffs[k] · sin((k+1)(arg_r + i·arg_i))`.
///
/// Returns the real and imaginary parts.
fn clenshaw_complex(coeffs: &[f64; 6], arg_r: f64, arg_i: f64) -> (f64, f64) {
    let (sin_r, cos_r) = arg_r.sin_cos();
    let (sinh_i, cosh_i) = (arg_i.sinh(), arg_i.cosh());
    let r = 2.0 * cos_r * cosh_i;
    let i = -2.0 * sin_r * sinh_i;

    let mut hr = coeffs[5];
    let mut hi = 0.0;
    let mut hr1 = 0.0;
    let mut hi1 = 0.0;
    for &c in coeffs[..5].iter().rev() {
        let hr2 = hr1;
        let hi2 = hi1;
        hr1 = hr;
        hi1 = hi;
        hr = -hr2 + r * hr1 - i * hi1 + c;
        hi = -hi2 + i * hr1 + r * hi1;
    }

    let r = sin_r * cosh_i;
    let i = cos_r * sinh_i;
    (r * hr - i * hi, r * hi + i * hr)
}

/// Wrap a longitude in radians into `[-π, π]`.
fn normalize_longitude(lon: f64) -> f64 {
    if lon.abs() <= PI {
        lon
    } else {
        lon - 2.0 * PI * ((lon + PI) / (2.0 * PI)).floor()
    }
}
