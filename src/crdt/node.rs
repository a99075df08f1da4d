//! Tree node stored in the ordered tree's arena.
//!
//! Nodes refer to their parent and children by id only; the arena owns every
//! node, so the structure has no reference cycles.

use std::cmp::Ordering;

use crate::crdt::types::OperationId;

/// A node of the replicated ordered tree.
///
/// # Tombstone Deletion
///
/// Nodes are never removed. Deletion clears `active`, and a later
/// `SetActive` with a higher id may set it again. `activator_id` records the
/// operation that last won the right to set the flag.
#[derive(Debug, Clone)]
pub struct TreeNode<P> {
    pub id: OperationId,
    /// `None` only for the root
    pub parent_id: Option<OperationId>,
    /// Always sorted by descending id.
    pub child_ids: Vec<OperationId>,
    /// `None` only for the root
    pub payload: Option<P>,
    pub kind: String,
    pub active: bool,
    pub activator_id: Option<OperationId>,
}

impl<P> TreeNode<P> {
    /// Creates an active node with no children.
    pub fn new(id: OperationId, parent_id: OperationId, payload: P, kind: String) -> Self {
        TreeNode {
            id,
            parent_id: Some(parent_id),
            child_ids: Vec::new(),
            payload: Some(payload),
            kind,
            active: true,
            activator_id: None,
        }
    }

    /// Creates the implicit root node.
    pub fn root() -> Self {
        TreeNode {
            id: OperationId::ROOT,
            parent_id: None,
            child_ids: Vec::new(),
            payload: None,
            kind: String::new(),
            active: true,
            activator_id: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Returns true if this node is part of the visible sequence.
    pub fn is_visible(&self) -> bool {
        self.active && !self.is_root()
    }

    /// Position at which a child with `child_id` belongs.
    ///
    /// Children with a greater id stay to the left of the new child.
    pub fn child_insert_index(&self, child_id: &OperationId) -> usize {
        self.child_ids
            .iter()
            .position(|existing| existing < child_id)
            .unwrap_or(self.child_ids.len())
    }

    /// Position of an existing child, if `child_id` is one.
    pub fn child_index(&self, child_id: &OperationId) -> Option<usize> {
        self.child_ids.iter().position(|existing| existing == child_id)
    }

    /// Applies a last-writer-wins update of the tombstone flag.
    ///
    /// Returns false, leaving the node untouched, when `activator` does not
    /// beat the currently recorded activator.
    pub fn set_active(&mut self, active: bool, activator: &OperationId) -> bool {
        let wins = match &self.activator_id {
            None => true,
            Some(current) => activator > current,
        };
        if wins {
            self.active = active;
            self.activator_id = Some(activator.clone());
        }
        wins
    }
}

impl<P> PartialEq for TreeNode<P> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<P> Eq for TreeNode<P> {}

impl<P> PartialOrd for TreeNode<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for TreeNode<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}
