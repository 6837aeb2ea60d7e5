//! Thematic-score matching between guests.
//!
//! Each guest may score any number of thematics. The distance between two
//! guests is the mean absolute score difference over the registered
//! thematics, counting only thematics both guests scored but always dividing
//! by the full thematic count.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use rayon::prelude::*;

use crate::error::{GdcError, GdcResult};
use crate::types::{Distance, MatcherConfig, Unit};

#[derive(Default)]
struct MatcherState {
    scores: HashMap<String, HashMap<String, f64>>,
    thematic_ids: HashSet<String>,
    other_guest_ids: HashSet<String>,
}

impl MatcherState {
    fn score(&self, guest_id: &str, thematic_id: &str) -> Option<f64> {
        self.scores
            .get(guest_id)
            .and_then(|thematics| thematics.get(thematic_id).copied())
    }

    fn total_distance(&self, guest_a_id: &str, guest_b_id: &str) -> f64 {
        if self.thematic_ids.is_empty() {
            return 0.0;
        }
        let (Some(a), Some(b)) = (self.scores.get(guest_a_id), self.scores.get(guest_b_id)) else {
            return 0.0;
        };

        let sum: f64 = self
            .thematic_ids
            .iter()
            .filter_map(|t| Some((a.get(t)? - b.get(t)?).abs()))
            .sum();
        sum / self.thematic_ids.len() as f64
    }

    fn matches_for(&self, guest_id: &str, config: &MatcherConfig) -> Vec<Distance> {
        let mut matches: Vec<Distance> = self
            .other_guest_ids
            .iter()
            .filter_map(|other| {
                let d = self.total_distance(guest_id, other);
                (d <= config.threshold)
                    .then(|| Distance::new(guest_id, other.as_str(), d, Unit::Score))
            })
            .collect();

        matches.sort_by(|x, y| {
            x.distance
                .total_cmp(&y.distance)
                .then_with(|| x.guest_b_id.cmp(&y.guest_b_id))
        });
        matches.truncate(config.matches_limit);
        matches
    }
}

/// Instance-scoped score store. Writers are serialised; readers run
/// concurrently.
pub struct GuestMatcher {
    config: MatcherConfig,
    state: RwLock<MatcherState>,
}

impl GuestMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            config,
            state: RwLock::new(MatcherState::default()),
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Inserts or overwrites a guest's score on one thematic.
    pub fn insert_score(
        &self,
        guest_id: impl Into<String>,
        thematic_id: impl Into<String>,
        score: f64,
    ) -> GdcResult<()> {
        let guest_id = guest_id.into();
        let thematic_id = thematic_id.into();
        if !score.is_finite() {
            return Err(GdcError::InvalidScore {
                guest_id,
                thematic_id,
                score,
            });
        }
        let mut state = self.state.write();
        state
            .scores
            .entry(guest_id)
            .or_default()
            .insert(thematic_id, score);
        Ok(())
    }

    /// Registers thematics and returns how many were new.
    pub fn insert_thematic_ids<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut state = self.state.write();
        ids.into_iter()
            .map(|id| state.thematic_ids.insert(id))
            .filter(|&added| added)
            .count()
    }

    /// Registers the pool of guests that `calculate_distances` matches
    /// against. Returns how many were new.
    pub fn insert_other_guest_ids<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut state = self.state.write();
        ids.into_iter()
            .map(|id| state.other_guest_ids.insert(id))
            .filter(|&added| added)
            .count()
    }

    pub fn get_score(&self, guest_id: &str, thematic_id: &str) -> Option<f64> {
        self.state.read().score(guest_id, thematic_id)
    }

    pub fn total_distance(&self, guest_a_id: &str, guest_b_id: &str) -> f64 {
        self.state.read().total_distance(guest_a_id, guest_b_id)
    }

    /// `Some` when the pair is within the configured threshold.
    pub fn match_pair(&self, guest_a_id: &str, guest_b_id: &str) -> Option<Distance> {
        let d = self.total_distance(guest_a_id, guest_b_id);
        (d <= self.config.threshold)
            .then(|| Distance::new(guest_a_id, guest_b_id, d, Unit::Score))
    }

    /// For each guest, in the given order, its closest matches among the
    /// registered other guests: ascending by distance, ties by the other
    /// guest's id, at most `matches_limit` each.
    pub fn calculate_distances(&self, guest_ids: &[String]) -> Vec<Distance> {
        let state = self.state.read();
        let state: &MatcherState = &state;
        let config = &self.config;

        let per_guest: Vec<Vec<Distance>> = guest_ids
            .par_iter()
            .map(|guest_id| state.matches_for(guest_id, config))
            .collect();

        let distances: Vec<Distance> = per_guest.into_iter().flatten().collect();
        tracing::debug!(
            guests = guest_ids.len(),
            pool = state.other_guest_ids.len(),
            matches = distances.len(),
            "calculated guest distances"
        );
        distances
    }

    pub fn calculate_distances_json(&self, guest_ids: &[String]) -> GdcResult<String> {
        Ok(serde_json::to_string(&self.calculate_distances(guest_ids))?)
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.scores.clear();
        state.thematic_ids.clear();
        state.other_guest_ids.clear();
        tracing::trace!("matcher cleared");
    }

    pub fn guest_count(&self) -> usize {
        self.state.read().scores.len()
    }

    pub fn thematics_count(&self) -> usize {
        self.state.read().thematic_ids.len()
    }
}

impl Default for GuestMatcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn seeded() -> GuestMatcher {
        let m = GuestMatcher::default();
        m.insert_thematic_ids(ids(&["music", "food", "sport"]));
        m.insert_score("alice", "music", 4.0).unwrap();
        m.insert_score("alice", "food", 2.0).unwrap();
        m.insert_score("alice", "sport", 1.0).unwrap();
        m.insert_score("bob", "music", 3.0).unwrap();
        m.insert_score("bob", "food", 2.0).unwrap();
        m.insert_score("carol", "music", 0.0).unwrap();
        m.insert_score("carol", "food", 5.0).unwrap();
        m.insert_score("carol", "sport", 5.0).unwrap();
        m
    }

    #[test]
    fn test_insert_and_get_score() {
        let m = seeded();
        assert_eq!(m.get_score("alice", "music"), Some(4.0));
        assert_eq!(m.get_score("bob", "sport"), None);
        assert_eq!(m.get_score("nobody", "music"), None);

        m.insert_score("alice", "music", 1.5).unwrap();
        assert_eq!(m.get_score("alice", "music"), Some(1.5));
        assert_eq!(m.guest_count(), 3);
    }

    #[test]
    fn test_non_finite_score_rejected() {
        let m = GuestMatcher::default();
        let result = m.insert_score("alice", "music", f64::NAN);
        assert!(matches!(result, Err(GdcError::InvalidScore { .. })));
        assert_eq!(m.get_score("alice", "music"), None);
    }

    #[test]
    fn test_thematic_ids_deduplicated() {
        let m = GuestMatcher::default();
        assert_eq!(m.insert_thematic_ids(ids(&["a", "b", "a"])), 2);
        assert_eq!(m.insert_thematic_ids(ids(&["b", "c"])), 1);
        assert_eq!(m.thematics_count(), 3);
    }

    #[test]
    fn test_total_distance_divides_by_all_thematics() {
        let m = seeded();
        // music |4-3| + food |2-2| ; sport unscored by bob ; / 3
        assert!((m.total_distance("alice", "bob") - 1.0 / 3.0).abs() < 1e-12);
        // |4-0| + |2-5| + |1-5| = 11 ; / 3
        assert!((m.total_distance("alice", "carol") - 11.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_total_distance_symmetric_and_zero_on_self() {
        let m = seeded();
        assert_eq!(m.total_distance("alice", "carol"), m.total_distance("carol", "alice"));
        assert_eq!(m.total_distance("alice", "alice"), 0.0);
    }

    #[test]
    fn test_total_distance_without_thematics() {
        let m = GuestMatcher::default();
        m.insert_score("alice", "music", 4.0).unwrap();
        m.insert_score("bob", "music", 0.0).unwrap();
        assert_eq!(m.total_distance("alice", "bob"), 0.0);
    }

    #[test]
    fn test_scores_on_unregistered_thematics_ignored() {
        let m = seeded();
        m.insert_score("alice", "travel", 10.0).unwrap();
        m.insert_score("bob", "travel", 0.0).unwrap();
        assert!((m.total_distance("alice", "bob") - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_match_pair_threshold() {
        let m = seeded();
        let d = m.match_pair("alice", "bob").unwrap();
        assert_eq!(d.guest_a_id, "alice");
        assert_eq!(d.guest_b_id, "bob");
        assert_eq!(d.unit, Unit::Score);
        // 11/3 > 2.0
        assert!(m.match_pair("alice", "carol").is_none());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let m = GuestMatcher::new(MatcherConfig::new().with_threshold(1.0));
        m.insert_thematic_ids(ids(&["t"]));
        m.insert_score("a", "t", 0.0).unwrap();
        m.insert_score("b", "t", 1.0).unwrap();
        assert!(m.match_pair("a", "b").is_some());
    }

    #[test]
    fn test_calculate_distances_sorted_and_filtered() {
        let m = seeded();
        m.insert_other_guest_ids(ids(&["alice", "bob", "carol"]));

        let result = m.calculate_distances(&ids(&["alice"]));
        let others: Vec<&str> = result.iter().map(|d| d.guest_b_id.as_str()).collect();
        // alice matches herself at 0, bob at 1/3; carol is over threshold
        assert_eq!(others, vec!["alice", "bob"]);
        assert!(result.iter().all(|d| d.guest_a_id == "alice"));
    }

    #[test]
    fn test_calculate_distances_preserves_guest_order() {
        let m = seeded();
        m.insert_other_guest_ids(ids(&["alice", "bob"]));

        let result = m.calculate_distances(&ids(&["bob", "alice"]));
        let firsts: Vec<&str> = result.iter().map(|d| d.guest_a_id.as_str()).collect();
        assert_eq!(firsts, vec!["bob", "bob", "alice", "alice"]);
    }

    #[test]
    fn test_calculate_distances_respects_limit_and_ties() {
        let m = GuestMatcher::new(MatcherConfig::new().with_matches_limit(3));
        m.insert_thematic_ids(ids(&["t"]));
        m.insert_score("me", "t", 1.0).unwrap();
        let pool: Vec<String> = (0..10).map(|i| format!("g{i}")).collect();
        for id in &pool {
            m.insert_score(id.as_str(), "t", 1.5).unwrap();
        }
        m.insert_other_guest_ids(pool);

        let result = m.calculate_distances(&ids(&["me"]));
        let others: Vec<&str> = result.iter().map(|d| d.guest_b_id.as_str()).collect();
        assert_eq!(others, vec!["g0", "g1", "g2"]);
    }

    #[test]
    fn test_calculate_distances_json_shape() {
        let m = seeded();
        m.insert_other_guest_ids(ids(&["bob"]));

        let json = m.calculate_distances_json(&ids(&["alice"])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let arr = value.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["guest_a_id"], "alice");
        assert_eq!(arr[0]["guest_b_id"], "bob");
        assert_eq!(arr[0]["unit"], "score");
        assert!((arr[0]["distance"].as_f64().unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_clear() {
        let m = seeded();
        m.insert_other_guest_ids(ids(&["alice", "bob"]));
        m.clear();

        assert_eq!(m.guest_count(), 0);
        assert_eq!(m.thematics_count(), 0);
        assert!(m.get_score("alice", "music").is_none());
        assert!(m.calculate_distances(&ids(&["alice"])).is_empty());
    }

    #[test]
    fn test_concurrent_writers() {
        let m = std::sync::Arc::new(GuestMatcher::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let m = m.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        m.insert_score(format!("g{t}-{i}"), "t", i as f64).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(m.guest_count(), 800);
    }
}
