//! State-based counters merged by pointwise maximum.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crdt::Crdt;
use crate::crdt::types::ReplicaId;

/// A grow-only counter (G-Counter).
///
/// Each replica only ever bumps its own entry. The value is the sum of all
/// entries, and merging takes the maximum per replica, so merges commute and
/// re-merging the same state changes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GCounter {
    counts: BTreeMap<ReplicaId, u64>,
}

impl GCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment `replica_id`'s entry by 1.
    pub fn increment(&mut self, replica_id: &str) {
        self.increment_by(replica_id, 1);
    }

    /// Increment `replica_id`'s entry by `n`.
    pub fn increment_by(&mut self, replica_id: &str, n: u64) {
        let count = self.counts.entry(replica_id.to_string()).or_insert(0);
        *count = count.saturating_add(n);
    }

    /// Total across all replicas.
    pub fn value(&self) -> u64 {
        self.counts.values().fold(0u64, |total, &n| total.saturating_add(n))
    }

    pub fn count_for(&self, replica_id: &str) -> u64 {
        self.counts.get(replica_id).copied().unwrap_or(0)
    }
}

impl Crdt for GCounter {
    fn merge(&mut self, other: &Self) {
        for (replica, &count) in &other.counts {
            let entry = self.counts.entry(replica.clone()).or_insert(0);
            *entry = (*entry).max(count);
        }
    }
}

/// A positive-negative counter (PN-Counter): two G-Counters, one for
/// increments and one for decrements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PNCounter {
    increments: GCounter,
    decrements: GCounter,
}

impl PNCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, replica_id: &str) {
        self.increments.increment(replica_id);
    }

    pub fn decrement(&mut self, replica_id: &str) {
        self.decrements.increment(replica_id);
    }

    /// Increments minus decrements, saturating at the bounds of `i64`.
    pub fn value(&self) -> i64 {
        let net = i128::from(self.increments.value()) - i128::from(self.decrements.value());
        net.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }
}

impl Crdt for PNCounter {
    fn merge(&mut self, other: &Self) {
        self.increments.merge(&other.increments);
        self.decrements.merge(&other.decrements);
    }
}
