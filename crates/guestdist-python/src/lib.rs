use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use tracing_subscriber::EnvFilter;

use guestdist_core::types::{DistanceMode, GuestRecord, MatcherConfig, Point};
use guestdist_core::{engine, GdcError, GuestMatcher as CoreMatcher};

fn gdc_err(e: GdcError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_mode(s: &str) -> PyResult<DistanceMode> {
    s.parse().map_err(gdc_err)
}

fn parse_point(coords: &[f64]) -> PyResult<Point> {
    Point::from_slice(coords).map_err(gdc_err)
}

/// Distance between two points given as `(lat, lon)` or `(lat, lon, alt)`.
/// Geodesic results are in metres.
#[pyfunction]
#[pyo3(signature = (a, b, mode = "geodesic"))]
fn distance(a: Vec<f64>, b: Vec<f64>, mode: &str) -> PyResult<f64> {
    let mode = parse_mode(mode)?;
    let a = parse_point(&a)?;
    let b = parse_point(&b)?;
    engine::distance(&a, &b, mode).map_err(gdc_err)
}

/// The `k` candidates closest to `query` as `(id, distance)` pairs, nearest
/// first. `candidates` is a list of `(id, point)`. A `k` below 1 raises
/// `ValueError`.
#[pyfunction]
#[pyo3(signature = (query, candidates, k = 1, mode = "geodesic"))]
fn nearest_neighbors(
    py: Python<'_>,
    query: Vec<f64>,
    candidates: Vec<(String, Vec<f64>)>,
    k: i64,
    mode: &str,
) -> PyResult<Vec<(String, f64)>> {
    let k = engine::neighbor_count(k).map_err(gdc_err)?;
    let mode = parse_mode(mode)?;
    let query = parse_point(&query)?;
    let records = candidates
        .into_iter()
        .map(|(id, coords)| Ok(GuestRecord::new(id, parse_point(&coords)?)))
        .collect::<PyResult<Vec<_>>>()?;

    let neighbors = py
        .allow_threads(|| engine::nearest_neighbors(&query, &records, k, mode))
        .map_err(gdc_err)?;

    Ok(neighbors.into_iter().map(|n| (n.id, n.distance)).collect())
}

/// Installs a stderr `tracing` subscriber. `filter` takes `RUST_LOG`
/// directives and wins over the environment. Later calls are no-ops.
#[pyfunction]
#[pyo3(signature = (filter = None))]
fn init_logging(filter: Option<&str>) -> PyResult<()> {
    let env_filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| PyValueError::new_err(format!("invalid log filter: {}", e)))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    match tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(()) => tracing::debug!("guestdist logging initialised"),
        Err(e) => tracing::debug!(error = %e, "subscriber already installed, keeping it"),
    }
    Ok(())
}

#[pyclass]
struct GuestMatcher {
    inner: CoreMatcher,
}

#[pymethods]
impl GuestMatcher {
    #[new]
    #[pyo3(signature = (threshold = 2.0, matches_limit = 20))]
    fn new(threshold: f64, matches_limit: usize) -> PyResult<Self> {
        if !threshold.is_finite() {
            return Err(PyValueError::new_err(format!(
                "threshold must be finite, got {}",
                threshold
            )));
        }
        let config = MatcherConfig::new()
            .with_threshold(threshold)
            .with_matches_limit(matches_limit);
        Ok(Self {
            inner: CoreMatcher::new(config),
        })
    }

    fn insert_score(&self, guest_id: String, thematic_id: String, score: f64) -> PyResult<()> {
        self.inner
            .insert_score(guest_id, thematic_id, score)
            .map_err(gdc_err)
    }

    fn insert_thematic_ids(&self, ids: Vec<String>) -> usize {
        self.inner.insert_thematic_ids(ids)
    }

    fn insert_other_guest_ids(&self, ids: Vec<String>) -> usize {
        self.inner.insert_other_guest_ids(ids)
    }

    fn get_score(&self, guest_id: &str, thematic_id: &str) -> Option<f64> {
        self.inner.get_score(guest_id, thematic_id)
    }

    fn total_distance(&self, guest_a_id: &str, guest_b_id: &str) -> f64 {
        self.inner.total_distance(guest_a_id, guest_b_id)
    }

    fn calculate_distances(&self, py: Python<'_>, guest_ids: Vec<String>) -> PyResult<Vec<PyObject>> {
        let distances = py.allow_threads(|| self.inner.calculate_distances(&guest_ids));
        distances
            .into_iter()
            .map(|d| {
                let dict = PyDict::new_bound(py);
                dict.set_item("guest_a_id", d.guest_a_id)?;
                dict.set_item("guest_b_id", d.guest_b_id)?;
                dict.set_item("distance", d.distance)?;
                dict.set_item("unit", d.unit.as_str())?;
                Ok(dict.into_any().unbind())
            })
            .collect()
    }

    fn calculate_distances_json(&self, py: Python<'_>, guest_ids: Vec<String>) -> PyResult<String> {
        py.allow_threads(|| self.inner.calculate_distances_json(&guest_ids))
            .map_err(gdc_err)
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn __repr__(&self) -> String {
        let config = self.inner.config();
        format!(
            "GuestMatcher(guests={}, thematics={}, threshold={}, matches_limit={})",
            self.inner.guest_count(),
            self.inner.thematics_count(),
            config.threshold,
            config.matches_limit
        )
    }
}

#[pymodule]
fn _guestdist(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(distance, m)?)?;
    m.add_function(wrap_pyfunction!(nearest_neighbors, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    m.add_class::<GuestMatcher>()?;
    Ok(())
}
