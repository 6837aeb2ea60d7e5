use super::{check_alt, check_finite, DistanceMetric};
use crate::error::GdcResult;
use crate::types::{Point, Unit};

/// Straight-line distance. A missing altitude counts as zero, so two points
/// without altitude reduce to the 2-D case.
pub struct Planar;

impl DistanceMetric for Planar {
    fn distance(&self, a: &Point, b: &Point) -> f64 {
        let dx = a.lon - b.lon;
        let dy = a.lat - b.lat;
        let dz = a.alt.unwrap_or(0.0) - b.alt.unwrap_or(0.0);
        dx.hypot(dy).hypot(dz)
    }

    fn validate(&self, point: &Point) -> GdcResult<()> {
        check_finite("lat", point.lat)?;
        check_finite("lon", point.lon)?;
        check_alt(point)
    }

    fn unit(&self) -> Unit {
        Unit::Units
    }
}
