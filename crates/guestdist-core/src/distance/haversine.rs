use super::{check_alt, check_finite, DistanceMetric};
use crate::error::{GdcError, GdcResult};
use crate::types::{Point, Unit};

/// Mean Earth radius, metres.
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance on a sphere, in metres. Altitude is validated but
/// does not contribute to the distance.
pub struct Haversine {
    radius_m: f64,
}

impl Haversine {
    pub fn new() -> Self {
        Self {
            radius_m: MEAN_EARTH_RADIUS_M,
        }
    }

    pub fn with_radius(radius_m: f64) -> GdcResult<Self> {
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(GdcError::InvalidArgument(format!(
                "sphere radius must be positive and finite, got {}",
                radius_m
            )));
        }
        Ok(Self { radius_m })
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }
}

impl Default for Haversine {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceMetric for Haversine {
    fn distance(&self, a: &Point, b: &Point) -> f64 {
        let lat1 = a.lat.to_radians();
        let lat2 = b.lat.to_radians();
        let d_lat = (b.lat - a.lat).to_radians();
        let d_lon = (b.lon - a.lon).to_radians();

        let h = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);
        // rounding can push h a hair outside [0, 1] near antipodes
        let h = h.clamp(0.0, 1.0);

        2.0 * self.radius_m * h.sqrt().atan2((1.0 - h).sqrt())
    }

    fn validate(&self, point: &Point) -> GdcResult<()> {
        check_finite("lat", point.lat)?;
        check_finite("lon", point.lon)?;
        if !(-90.0..=90.0).contains(&point.lat) {
            return Err(GdcError::InvalidCoordinate {
                axis: "lat",
                value: point.lat,
                reason: "outside [-90, 90]",
            });
        }
        if !(-180.0..=180.0).contains(&point.lon) {
            return Err(GdcError::InvalidCoordinate {
                axis: "lon",
                value: point.lon,
                reason: "outside [-180, 180]",
            });
        }
        check_alt(point)
    }

    fn unit(&self) -> Unit {
        Unit::Meters
    }
}
