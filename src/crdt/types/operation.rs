//! The closed set of operations exchanged between replicas.
//!
//! Operations are immutable facts. A replica mutates its state only by
//! applying operations, whether they were produced locally or received from a
//! peer, and synchronizes by shipping its operation log.

use serde::{Deserialize, Serialize};

use crate::crdt::types::operation_id::OperationId;

/// A single replicated operation.
///
/// `P` is the payload carried by `Create` (tree node content) and the value
/// carried by `SetProperty` (register content).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation<P> {
    /// Allocates a new tree node as a child of `parent_id`.
    Create {
        id: OperationId,
        parent_id: OperationId,
        payload: P,
        kind: String,
    },
    /// Sets or clears the tombstone flag of an existing tree node.
    SetActive {
        id: OperationId,
        target_id: OperationId,
        active: bool,
    },
    /// Writes a register-map entry.
    SetProperty {
        id: OperationId,
        entity_id: String,
        property_name: String,
        value: P,
    },
}

impl<P> Operation<P> {
    /// The id of this operation.
    pub fn id(&self) -> &OperationId {
        match self {
            Operation::Create { id, .. }
            | Operation::SetActive { id, .. }
            | Operation::SetProperty { id, .. } => id,
        }
    }

    /// The id this operation must wait for before it can be applied, if any.
    pub fn dependency(&self) -> Option<&OperationId> {
        match self {
            Operation::Create { parent_id, .. } => Some(parent_id),
            Operation::SetActive { target_id, .. } => Some(target_id),
            Operation::SetProperty { .. } => None,
        }
    }

    /// Short variant name, used in log output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::SetActive { .. } => "set_active",
            Operation::SetProperty { .. } => "set_property",
        }
    }
}
