//! Error types for the replicated structures.
//!
//! Merging never fails: remote operations are applied, buffered, or ignored as
//! duplicates. The errors here only surface from local conveniences, such as
//! parsing an id typed by a user or editing relative to a node this replica
//! has never seen.

use thiserror::Error;

use crate::crdt::types::OperationId;

/// Failure to parse the `"<counter>@<replica>"` text form of an [`OperationId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdError {
    #[error("operation id `{0}` is missing the `@` separator")]
    MissingSeparator(String),
    #[error("operation id `{0}` has a non-numeric counter")]
    InvalidCounter(String),
    #[error("operation id `{0}` names the root, which is spelled `root`")]
    RootNotLiteral(String),
}

/// Errors returned by the local editing API of the ordered tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0} is not known to this replica")]
    UnknownNode(OperationId),
    #[error("the root node cannot be activated or deactivated")]
    RootImmutable,
    #[error("index {index} out of bounds for {len} visible nodes")]
    IndexOutOfBounds { index: usize, len: usize },
}
