use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rayon::prelude::*;

use crate::distance::DistanceMetric;
use crate::types::{GuestRecord, Point};

/// Candidate sets at least this large are scanned on the rayon pool.
pub const PARALLEL_SCAN_THRESHOLD: usize = 4096;

const CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Scored {
    pub distance: f64,
    pub position: usize,
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Farther first; on equal distance the later input position is "worse",
/// which keeps the selection stable.
impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.position.cmp(&other.position))
    }
}

fn push_bounded(heap: &mut BinaryHeap<Scored>, item: Scored, k: usize) {
    if heap.len() < k {
        heap.push(item);
    } else if let Some(mut worst) = heap.peek_mut() {
        if item < *worst {
            *worst = item;
        }
    }
}

fn scan_chunk(
    metric: &dyn DistanceMetric,
    query: &Point,
    chunk: &[GuestRecord],
    offset: usize,
    k: usize,
) -> BinaryHeap<Scored> {
    let mut heap = BinaryHeap::with_capacity(k.min(chunk.len()) + 1);
    for (i, candidate) in chunk.iter().enumerate() {
        let item = Scored {
            distance: metric.distance(query, &candidate.point),
            position: offset + i,
        };
        push_bounded(&mut heap, item, k);
    }
    heap
}

pub(crate) fn scan_sequential(
    metric: &dyn DistanceMetric,
    query: &Point,
    candidates: &[GuestRecord],
    k: usize,
) -> Vec<Scored> {
    scan_chunk(metric, query, candidates, 0, k).into_sorted_vec()
}

pub(crate) fn scan_parallel(
    metric: &dyn DistanceMetric,
    query: &Point,
    candidates: &[GuestRecord],
    k: usize,
) -> Vec<Scored> {
    candidates
        .par_chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(i, chunk)| scan_chunk(metric, query, chunk, i * CHUNK_SIZE, k))
        .reduce(BinaryHeap::new, |mut acc, other| {
            for item in other {
                push_bounded(&mut acc, item, k);
            }
            acc
        })
        .into_sorted_vec()
}

/// Returns the `k` closest candidates as `(distance, position)` pairs in
/// ascending order. Inputs must already be validated against `metric`.
pub(crate) fn select_nearest(
    metric: &dyn DistanceMetric,
    query: &Point,
    candidates: &[GuestRecord],
    k: usize,
) -> Vec<Scored> {
    if candidates.len() >= PARALLEL_SCAN_THRESHOLD {
        tracing::trace!(candidates = candidates.len(), k, "parallel nearest-neighbour scan");
        scan_parallel(metric, query, candidates, k)
    } else {
        scan_sequential(metric, query, candidates, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{Haversine, Planar};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn line(xs: &[f64]) -> Vec<GuestRecord> {
        xs.iter()
            .enumerate()
            .map(|(i, &x)| GuestRecord::new(format!("g{i}"), Point::new(0.0, x)))
            .collect()
    }

    fn positions(scored: &[Scored]) -> Vec<usize> {
        scored.iter().map(|s| s.position).collect()
    }

    #[test]
    fn test_selects_k_closest_in_order() {
        let candidates = line(&[5.0, 1.0, 9.0, 3.0, 7.0]);
        let result = scan_sequential(&Planar, &Point::new(0.0, 0.0), &candidates, 3);
        assert_eq!(positions(&result), vec![1, 3, 0]);
        assert_eq!(result[0].distance, 1.0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let candidates = line(&[2.0, -1.0, 1.0, -2.0, 1.0]);
        let result = scan_sequential(&Planar, &Point::new(0.0, 0.0), &candidates, 4);
        assert_eq!(positions(&result), vec![1, 2, 4, 0]);
    }

    #[test]
    fn test_k_equal_to_len_returns_all_sorted() {
        let candidates = line(&[3.0, 2.0, 1.0]);
        let result = scan_sequential(&Planar, &Point::new(0.0, 0.0), &candidates, 3);
        assert_eq!(positions(&result), vec![2, 1, 0]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates: Vec<GuestRecord> = (0..10_000)
            .map(|i| {
                // coarse grid so plenty of exact ties cross chunk boundaries
                let lat = rng.gen_range(-20i32..=20) as f64;
                let lon = rng.gen_range(-20i32..=20) as f64;
                GuestRecord::new(format!("g{i}"), Point::new(lat, lon))
            })
            .collect();
        let query = Point::new(0.5, -0.5);

        for k in [1, 10, 257, 3000] {
            let seq = scan_sequential(&Haversine::new(), &query, &candidates, k);
            let par = scan_parallel(&Haversine::new(), &query, &candidates, k);
            assert_eq!(seq.len(), k);
            assert_eq!(seq, par, "k = {k}");
        }
    }

    #[test]
    fn test_select_nearest_uses_parallel_above_threshold() {
        let xs: Vec<f64> = (0..PARALLEL_SCAN_THRESHOLD + 10).rev().map(|x| x as f64).collect();
        let candidates = line(&xs);
        let result = select_nearest(&Planar, &Point::new(0.0, 0.0), &candidates, 2);
        assert_eq!(positions(&result), vec![candidates.len() - 1, candidates.len() - 2]);
    }
}
