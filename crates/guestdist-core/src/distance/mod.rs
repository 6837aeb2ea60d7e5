mod haversine;
mod planar;

pub use haversine::{Haversine, MEAN_EARTH_RADIUS_M};
pub use planar::Planar;

use crate::error::{GdcError, GdcResult};
use crate::types::{DistanceMode, Point, Unit};

/// All metrics return a non-negative distance for points that passed
/// [`DistanceMetric::validate`]. Calling `distance` on unvalidated input is
/// allowed but the result is unspecified.
pub trait DistanceMetric: Send + Sync {
    fn distance(&self, a: &Point, b: &Point) -> f64;
    fn validate(&self, point: &Point) -> GdcResult<()>;
    fn unit(&self) -> Unit;
}

pub fn metric_for_mode(mode: DistanceMode) -> Box<dyn DistanceMetric> {
    match mode {
        DistanceMode::Planar => Box::new(Planar),
        DistanceMode::Geodesic => Box::new(Haversine::default()),
    }
}

fn check_finite(axis: &'static str, value: f64) -> GdcResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GdcError::InvalidCoordinate {
            axis,
            value,
            reason: "not finite",
        })
    }
}

fn check_alt(point: &Point) -> GdcResult<()> {
    match point.alt {
        Some(alt) => check_finite("alt", alt),
        None => Ok(()),
    }
}
