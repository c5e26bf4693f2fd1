/// Priority- and load-aware failover target selection
use crate::metrics::DecisionMetrics;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const BASE_SCORE: i64 = 1000;
const PRIORITY_WEIGHT: i64 = 10;
const NEAR_CEILING_PENALTY: i64 = 500;
/// Fraction of the load ceiling above which a candidate is penalized
const NEAR_CEILING_FRACTION: f64 = 0.9;

/// One instance the caller could fail over to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverCandidate {
    pub id: String,
    pub healthy: bool,
    /// 1 is the highest priority
    pub priority: u32,
    pub load_fraction: f64,
}

impl FailoverCandidate {
    pub fn new(id: impl Into<String>, healthy: bool, priority: u32, load_fraction: f64) -> Self {
        Self {
            id: id.into(),
            healthy,
            priority,
            load_fraction,
        }
    }
}

/// Pick the best healthy candidate under `max_load_fraction`.
///
/// Score is `1000 - priority * 10`, minus 500 when the candidate is above 90%
/// of the ceiling. Ties go to the earliest candidate. Returns `None` when every
/// candidate is unhealthy or over the ceiling.
pub fn select_failover(candidates: &[FailoverCandidate], max_load_fraction: f64) -> Option<&str> {
    let mut best: Option<(&FailoverCandidate, i64)> = None;

    for candidate in candidates {
        if !candidate.healthy || candidate.load_fraction > max_load_fraction {
            continue;
        }
        let score = score_candidate(candidate, max_load_fraction);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }

    match best {
        Some((candidate, score)) => {
            debug!(target_id = %candidate.id, score, "Failover target selected");
            DecisionMetrics::record_failover("selected");
            Some(candidate.id.as_str())
        }
        None => {
            warn!(
                candidates = candidates.len(),
                max_load_fraction, "No eligible failover target"
            );
            DecisionMetrics::record_failover("none");
            None
        }
    }
}

fn score_candidate(candidate: &FailoverCandidate, max_load_fraction: f64) -> i64 {
    let mut score = BASE_SCORE - i64::from(candidate.priority) * PRIORITY_WEIGHT;
    if candidate.load_fraction > NEAR_CEILING_FRACTION * max_load_fraction {
        score -= NEAR_CEILING_PENALTY;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_selects_nothing() {
        assert_eq!(select_failover(&[], 0.8), None);
    }

    #[test]
    fn test_skips_unhealthy_and_overloaded() {
        let candidates = vec![
            FailoverCandidate::new("primary", false, 1, 0.1),
            FailoverCandidate::new("overloaded", true, 1, 0.95),
            FailoverCandidate::new("backup", true, 5, 0.2),
        ];
        assert_eq!(select_failover(&candidates, 0.8), Some("backup"));
    }

    #[test]
    fn test_prefers_higher_priority() {
        let candidates = vec![
            FailoverCandidate::new("region-b", true, 3, 0.1),
            FailoverCandidate::new("region-a", true, 1, 0.1),
        ];
        assert_eq!(select_failover(&candidates, 1.0), Some("region-a"));
    }

    #[test]
    fn test_near_ceiling_penalty() {
        let candidates = vec![
            FailoverCandidate::new("hot", true, 1, 0.95),
            FailoverCandidate::new("cool", true, 20, 0.3),
        ];
        // hot: 990 - 500 = 490, cool: 800
        assert_eq!(select_failover(&candidates, 1.0), Some("cool"));
    }

    #[test]
    fn test_load_at_ceiling_is_eligible() {
        let candidates = vec![FailoverCandidate::new("edge", true, 1, 0.8)];
        assert_eq!(select_failover(&candidates, 0.8), Some("edge"));
    }

    #[test]
    fn test_ties_go_to_first() {
        let candidates = vec![
            FailoverCandidate::new("first", true, 2, 0.1),
            FailoverCandidate::new("second", true, 2, 0.2),
        ];
        assert_eq!(select_failover(&candidates, 1.0), Some("first"));
    }

    #[test]
    fn test_all_filtered_returns_none() {
        let candidates = vec![
            FailoverCandidate::new("down", false, 1, 0.0),
            FailoverCandidate::new("full", true, 1, 0.99),
        ];
        assert_eq!(select_failover(&candidates, 0.9), None);
    }
}
