//! The generic redis-like primitives (`ZSet`, sets, lists) backing
//! every non-typed key in `MemoryStorage`'s keyspace map.

use std::collections::{HashMap, HashSet, VecDeque};

use qless_core::storage::ScoredMember;

#[derive(Debug, Default)]
pub(crate) enum Slot {
    #[default]
    Empty,
    ZSet(ZSet),
    Set(HashSet<String>),
    List(VecDeque<String>),
}

/// A sorted set keyed by member name. Scores are recomputed into
/// ranked order on every range query rather than kept pre-sorted;
/// fine for a reference store operating at test and demo scale.
#[derive(Debug, Default)]
pub(crate) struct ZSet {
    scores: HashMap<String, f64>,
}

impl ZSet {
    pub fn insert(&mut self, member: &str, score: f64) {
        self.scores.insert(member.to_string(), score);
    }

    pub fn remove(&mut self, member: &str) -> bool {
        self.scores.remove(member).is_some()
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Ascending by score, `score <= max_score`, at most `limit`
    /// entries (0 = unlimited).
    pub fn range_by_score(&self, max_score: f64, limit: usize) -> Vec<ScoredMember> {
        let mut entries: Vec<_> = self
            .scores
            .iter()
            .filter(|(_, &score)| score <= max_score)
            .map(|(member, &score)| ScoredMember {
                member: member.clone(),
                score,
            })
            .collect();
        entries.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap().then_with(|| a.member.cmp(&b.member)));
        if limit > 0 {
            entries.truncate(limit);
        }
        entries
    }

    /// Descending by score, at most `limit` entries (0 = unlimited).
    pub fn revrange(&self, limit: usize) -> Vec<ScoredMember> {
        let mut entries: Vec<_> = self
            .scores
            .iter()
            .map(|(member, &score)| ScoredMember {
                member: member.clone(),
                score,
            })
            .collect();
        entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap().then_with(|| a.member.cmp(&b.member)));
        if limit > 0 {
            entries.truncate(limit);
        }
        entries
    }
}
