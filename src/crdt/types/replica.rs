//! Replica identifier type.
//!
//! A replica is one independent copy of a replicated structure. Replica ids
//! break ties between operations that carry the same Lamport counter, so they
//! must be unique across every participant that exchanges operation logs.

/// A unique identifier for each replica (collaborator) in the distributed system.
///
/// Compared lexicographically when two operation ids share a counter.
pub type ReplicaId = String;
