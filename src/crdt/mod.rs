//! Replicated data types and their supporting types.
//!
//! Every structure here converges by the same rule: replicas exchange
//! operations (or, for the counters, states) and merging them in any order
//! yields the same result.

pub mod counter;
pub mod node;
pub mod register;
pub mod tree;
pub mod types;

pub use counter::{GCounter, PNCounter};
pub use node::TreeNode;
pub use register::{PropertyChange, RegisterEntry, ReplicatedRegisterMap};
pub use tree::ReplicatedOrderedTree;
pub use types::{LamportClock, Operation, OperationId, ROOT_LITERAL, ReplicaId};

/// A replicated structure that can absorb another replica's state.
///
/// Implementations must be:
/// - **Commutative:** merging A into B and B into A give equal states
/// - **Associative:** the grouping of successive merges does not matter
/// - **Idempotent:** merging the same state twice changes nothing
pub trait Crdt {
    /// Merge another replica into this one.
    fn merge(&mut self, other: &Self);
}
