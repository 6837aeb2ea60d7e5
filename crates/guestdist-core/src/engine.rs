//! Stateless entry points for point distances and nearest-neighbour search.
//!
//! Every function validates all of its inputs before computing anything; a
//! single bad coordinate fails the whole call.

use crate::distance::{metric_for_mode, DistanceMetric};
use crate::error::{GdcError, GdcResult};
use crate::search::select_nearest;
use crate::types::{Distance, DistanceMode, GuestRecord, Neighbor, Point};

pub fn distance(a: &Point, b: &Point, mode: DistanceMode) -> GdcResult<f64> {
    distance_with(metric_for_mode(mode).as_ref(), a, b)
}

pub fn distance_with(metric: &dyn DistanceMetric, a: &Point, b: &Point) -> GdcResult<f64> {
    metric.validate(a)?;
    metric.validate(b)?;
    Ok(metric.distance(a, b))
}

pub fn guest_distance(a: &GuestRecord, b: &GuestRecord, mode: DistanceMode) -> GdcResult<Distance> {
    let metric = metric_for_mode(mode);
    let d = distance_with(metric.as_ref(), &a.point, &b.point)?;
    Ok(Distance::new(a.id.clone(), b.id.clone(), d, metric.unit()))
}

/// Converts a host-supplied signed `k`; negative values are rejected.
pub fn neighbor_count(k: i64) -> GdcResult<usize> {
    usize::try_from(k)
        .map_err(|_| GdcError::InvalidArgument(format!("k must be at least 1, got {}", k)))
}

/// Returns exactly `k` candidates closest to `query`, ascending by distance,
/// with ties in input order. Fails with `InsufficientCandidates` rather than
/// returning a shorter list.
pub fn nearest_neighbors(
    query: &Point,
    candidates: &[GuestRecord],
    k: usize,
    mode: DistanceMode,
) -> GdcResult<Vec<Neighbor>> {
    nearest_neighbors_with(metric_for_mode(mode).as_ref(), query, candidates, k)
}

pub fn nearest_neighbors_with(
    metric: &dyn DistanceMetric,
    query: &Point,
    candidates: &[GuestRecord],
    k: usize,
) -> GdcResult<Vec<Neighbor>> {
    if k == 0 {
        return Err(GdcError::InvalidArgument("k must be at least 1".into()));
    }
    metric.validate(query)?;
    for (position, candidate) in candidates.iter().enumerate() {
        if let Err(e) = metric.validate(&candidate.point) {
            tracing::debug!(position, id = %candidate.id, error = %e, "rejecting candidate");
            return Err(e);
        }
    }
    if candidates.len() < k {
        return Err(GdcError::InsufficientCandidates {
            requested: k,
            available: candidates.len(),
        });
    }

    let unit = metric.unit();
    let neighbors = select_nearest(metric, query, candidates, k)
        .into_iter()
        .map(|s| Neighbor {
            id: candidates[s.position].id.clone(),
            position: s.position,
            distance: s.distance,
            unit,
        })
        .collect();
    Ok(neighbors)
}
