//! Operation identifiers: a Lamport counter paired with the originating replica.
//!
//! Every operation applied to a replicated structure carries one of these ids.
//! Ids are globally unique (a replica never reuses a counter value) and totally
//! ordered, which is what lets concurrent edits be resolved the same way on
//! every replica.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crdt::types::replica::ReplicaId;
use crate::error::ParseIdError;

/// Text form of the root id.
pub const ROOT_LITERAL: &str = "root";

/// A globally unique, totally ordered operation identifier.
///
/// # Ordering
///
/// Ids are ordered first by counter, then lexicographically by replica id.
/// Two replicas that act concurrently may pick the same counter, but never
/// the same replica id, so the order is total.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationId {
    /// The logical clock value when the operation was created
    pub counter: u64,
    /// The replica that created the operation
    pub replica_id: ReplicaId,
}

impl OperationId {
    /// The implicit origin of every replicated structure, `(0, "")`.
    ///
    /// No regular operation may create, activate or deactivate it.
    pub const ROOT: OperationId = OperationId {
        counter: 0,
        replica_id: String::new(),
    };

    pub fn new(counter: u64, replica_id: impl Into<ReplicaId>) -> Self {
        OperationId {
            counter,
            replica_id: replica_id.into(),
        }
    }

    /// Returns true for the reserved root id.
    pub fn is_root(&self) -> bool {
        self.counter == 0 && self.replica_id.is_empty()
    }

    /// Parses the text form, returning `None` for anything malformed.
    ///
    /// Use [`str::parse`] instead when the reason for the failure matters.
    pub fn parse(text: &str) -> Option<Self> {
        text.parse().ok()
    }
}

impl PartialOrd for OperationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OperationId {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.counter.cmp(&other.counter) {
            Ordering::Equal => self.replica_id.cmp(&other.replica_id),
            other => other,
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(ROOT_LITERAL)
        } else {
            write!(f, "{}@{}", self.counter, self.replica_id)
        }
    }
}

impl FromStr for OperationId {
    type Err = ParseIdError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text == ROOT_LITERAL {
            return Ok(OperationId::ROOT);
        }

        let (counter, replica) = text
            .split_once('@')
            .ok_or_else(|| ParseIdError::MissingSeparator(text.to_string()))?;
        if counter.is_empty() || !counter.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseIdError::InvalidCounter(text.to_string()));
        }
        let counter = counter
            .parse::<u64>()
            .map_err(|_| ParseIdError::InvalidCounter(text.to_string()))?;
        // `(0, "")` only has the `root` spelling
        if counter == 0 && replica.is_empty() {
            return Err(ParseIdError::RootNotLiteral(text.to_string()));
        }

        Ok(OperationId::new(counter, replica))
    }
}

impl Serialize for OperationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OperationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
