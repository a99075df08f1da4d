//! # Replicated data types for offline-first collaboration
//!
//! Independent replicas mutate a shared structure without coordination and
//! later exchange operation logs. Replaying the same operations, in any
//! order, leaves every replica in the same state.
//!
//! ## Structures
//!
//! - [`ReplicatedOrderedTree`]: an RGA-style ordered sequence with tombstone
//!   deletion and buffering of operations whose dependencies have not arrived
//! - [`ReplicatedRegisterMap`]: last-writer-wins registers keyed by
//!   `(entity, property)`
//! - [`GCounter`] and [`PNCounter`]: state-based counters
//!
//! All of them order concurrent writes by [`OperationId`], a Lamport counter
//! paired with the replica id.
//!
//! ## Example
//!
//! ```rust
//! use crdt_replica::{Crdt, OperationId, ReplicatedOrderedTree};
//!
//! let mut alice = ReplicatedOrderedTree::new("alice");
//! let mut bob = ReplicatedOrderedTree::new("bob");
//!
//! alice.insert_after(&OperationId::ROOT, 'X', "char").unwrap();
//! bob.insert_after(&OperationId::ROOT, 'Y', "char").unwrap();
//!
//! alice.merge(&bob);
//! bob.merge(&alice);
//! assert_eq!(alice.text(), "YX");
//! assert_eq!(bob.text(), "YX");
//! ```

pub mod crdt;
pub mod error;

pub use crdt::{Crdt, GCounter, PNCounter, PropertyChange, RegisterEntry};
pub use crdt::{LamportClock, Operation, OperationId, ROOT_LITERAL, ReplicaId};
pub use crdt::{ReplicatedOrderedTree, ReplicatedRegisterMap, TreeNode};
pub use error::{ParseIdError, TreeError};
