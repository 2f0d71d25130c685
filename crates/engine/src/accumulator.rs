//! Request-scoped score accumulation with a max-merge write rule.

use std::collections::HashMap;
use suggest_core::types::{ItemId, SimilarityMatch};

/// Mapping from candidate item to the best similarity score observed for
/// it across all seed queries so far. The max rule is commutative and
/// associative, so the order in which seed results arrive never changes
/// the final contents.
#[derive(Debug, Default)]
pub struct ScoreAccumulator {
    scores: HashMap<ItemId, f64>,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one (candidate, score) observation. Best evidence wins: a
    /// candidate reachable from multiple seeds keeps its highest score,
    /// never a sum or an average.
    pub fn observe(&mut self, item_id: ItemId, score: f64) {
        self.scores
            .entry(item_id)
            .and_modify(|existing| {
                if score > *existing {
                    *existing = score;
                }
            })
            .or_insert(score);
    }

    /// Fold an entire seed-query result into the accumulator.
    pub fn absorb(&mut self, matches: Vec<SimilarityMatch>) {
        for m in matches {
            self.observe(m.item_id, m.score);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn score(&self, item_id: &ItemId) -> Option<f64> {
        self.scores.get(item_id).copied()
    }

    /// The current candidate set, in no particular order.
    pub fn candidates(&self) -> Vec<ItemId> {
        self.scores.keys().cloned().collect()
    }

    pub fn into_scores(self) -> HashMap<ItemId, f64> {
        self.scores
    }
}
