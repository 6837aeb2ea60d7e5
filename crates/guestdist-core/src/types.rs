use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GdcError, GdcResult};

/// A coordinate pair with optional altitude.
///
/// In geodesic mode `lat`/`lon` are decimal degrees. In planar mode they are
/// the y and x axes of a Cartesian plane and may take any finite value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon, alt: None }
    }

    pub fn with_alt(mut self, alt: f64) -> Self {
        self.alt = Some(alt);
        self
    }

    /// Builds a point from `[lat, lon]` or `[lat, lon, alt]`.
    pub fn from_slice(coords: &[f64]) -> GdcResult<Self> {
        match *coords {
            [lat, lon] => Ok(Self::new(lat, lon)),
            [lat, lon, alt] => Ok(Self::new(lat, lon).with_alt(alt)),
            _ => Err(GdcError::InvalidArgument(format!(
                "a point needs 2 or 3 coordinates, got {}",
                coords.len()
            ))),
        }
    }
}

/// A point tagged with a caller-supplied identifier. Ids are not required to
/// be unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestRecord {
    pub id: String,
    pub point: Point,
}

impl GuestRecord {
    pub fn new(id: impl Into<String>, point: Point) -> Self {
        Self {
            id: id.into(),
            point,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMode {
    Planar,
    Geodesic,
}

impl FromStr for DistanceMode {
    type Err = GdcError;

    fn from_str(s: &str) -> GdcResult<Self> {
        match s.to_lowercase().as_str() {
            "planar" | "euclidean" | "l2" => Ok(DistanceMode::Planar),
            "geodesic" | "haversine" | "spherical" => Ok(DistanceMode::Geodesic),
            _ => Err(GdcError::InvalidArgument(format!(
                "unknown mode: '{}'. Use 'planar' or 'geodesic'",
                s
            ))),
        }
    }
}

impl fmt::Display for DistanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMode::Planar => f.write_str("planar"),
            DistanceMode::Geodesic => f.write_str("geodesic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Meters,
    Units,
    Score,
}

impl Unit {
    /// Same spelling as the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Meters => "meters",
            Unit::Units => "units",
            Unit::Score => "score",
        }
    }
}

/// A distance between two identified guests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub guest_a_id: String,
    pub guest_b_id: String,
    pub distance: f64,
    pub unit: Unit,
}

impl Distance {
    pub fn new(
        guest_a_id: impl Into<String>,
        guest_b_id: impl Into<String>,
        distance: f64,
        unit: Unit,
    ) -> Self {
        Self {
            guest_a_id: guest_a_id.into(),
            guest_b_id: guest_b_id.into(),
            distance,
            unit,
        }
    }
}

/// One ranked hit of a nearest-neighbour search. `position` is the index of
/// the candidate in the input slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: String,
    pub position: usize,
    pub distance: f64,
    pub unit: Unit,
}

pub const DEFAULT_MATCH_THRESHOLD: f64 = 2.0;
pub const DEFAULT_MATCHES_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub threshold: f64,
    pub matches_limit: usize,
}

impl MatcherConfig {
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            matches_limit: DEFAULT_MATCHES_LIMIT,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_matches_limit(mut self, matches_limit: usize) -> Self {
        self.matches_limit = matches_limit;
        self
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self::new()
    }
}
