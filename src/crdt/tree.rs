//! Replicated ordered tree: an RGA-style sequence CRDT.
//!
//! Nodes live in a flat arena keyed by [`OperationId`]. Each node keeps its
//! children sorted by descending id, and the visible sequence is the pre-order
//! flattening of the tree with tombstoned nodes skipped. Because sibling order
//! depends only on ids, every replica that has applied the same operations
//! flattens to the same sequence, whatever order they arrived in.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::crdt::Crdt;
use crate::crdt::node::TreeNode;
use crate::crdt::types::{LamportClock, Operation, OperationId};
use crate::error::TreeError;

/// The replicated ordered tree.
///
/// # Design
///
/// - Lamport ids give every operation a place in one total order
/// - Concurrent siblings are ordered by descending id, so the most recent
///   insert takes the leftmost position
/// - Deletion is a last-writer-wins tombstone flag, so deleted nodes can be
///   reactivated by a later operation
/// - Operations whose parent or target is unknown wait in a buffer and are
///   replayed as soon as that id is applied
#[derive(Debug, Clone)]
pub struct ReplicatedOrderedTree<P> {
    clock: LamportClock,
    /// Arena of every node ever created, including the root and tombstones
    nodes: HashMap<OperationId, TreeNode<P>>,
    /// Every accepted operation, applied or still buffered
    log: Vec<Operation<P>>,
    seen: HashSet<OperationId>,
    /// Buffered operations keyed by the id they are waiting for
    pending: HashMap<OperationId, Vec<Operation<P>>>,
}

impl<P: Clone> ReplicatedOrderedTree<P> {
    /// Creates an empty tree holding only the root.
    pub fn new(replica_id: impl Into<String>) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(OperationId::ROOT, TreeNode::root());

        ReplicatedOrderedTree {
            clock: LamportClock::new(replica_id),
            nodes,
            log: Vec::new(),
            seen: HashSet::new(),
            pending: HashMap::new(),
        }
    }

    /// Applies a batch of operations in delivery order.
    ///
    /// `on_applied(op, anchor)` is called exactly once for every operation
    /// that takes effect, never for duplicates or for operations still
    /// waiting on a dependency. For a `Create` or a reactivating `SetActive`,
    /// `anchor` is the nearest visible node to the left of the affected node,
    /// or `None` when it belongs at the front of the sequence. It is always
    /// `None` for a deactivation.
    ///
    /// Returns the number of operations that took effect, including buffered
    /// operations released by this batch.
    pub fn execute_operations<I, F>(&mut self, ops: I, mut on_applied: F) -> usize
    where
        I: IntoIterator<Item = Operation<P>>,
        F: FnMut(&Operation<P>, Option<&OperationId>),
    {
        let mut applied = 0;

        for op in ops {
            if !Self::accepts(&op) {
                trace!("Ignoring {} {}: not a tree operation", op.kind_name(), op.id());
                continue;
            }
            if op.id().is_root() {
                trace!("Ignoring {} carrying the root id", op.kind_name());
                continue;
            }
            if self.seen.contains(op.id()) {
                trace!("Skipping duplicate operation {}", op.id());
                continue;
            }

            self.clock.update(op.id().counter);
            self.seen.insert(op.id().clone());
            self.log.push(op.clone());

            applied += self.integrate(op, &mut on_applied);
        }

        applied
    }

    fn accepts(op: &Operation<P>) -> bool {
        match op {
            Operation::Create { .. } | Operation::SetActive { .. } => true,
            Operation::SetProperty { .. } => false,
        }
    }

    /// Applies one fresh operation and everything it unblocks.
    fn integrate<F>(&mut self, op: Operation<P>, on_applied: &mut F) -> usize
    where
        F: FnMut(&Operation<P>, Option<&OperationId>),
    {
        let mut applied = 0;
        let mut ready = vec![op];

        while let Some(op) = ready.pop() {
            let missing = op
                .dependency()
                .filter(|dependency| !self.nodes.contains_key(*dependency))
                .cloned();
            if let Some(missing) = missing {
                debug!(
                    "Buffering {} {} until {} arrives",
                    op.kind_name(),
                    op.id(),
                    missing
                );
                self.pending.entry(missing).or_default().push(op);
                continue;
            }

            match &op {
                Operation::Create {
                    id,
                    parent_id,
                    payload,
                    kind,
                } => {
                    let anchor = self.insert_node(id, parent_id, payload.clone(), kind.clone());
                    let anchor = self.visible_anchor(anchor);
                    on_applied(&op, anchor.as_ref());
                    applied += 1;

                    if let Some(mut waiting) = self.pending.remove(id) {
                        debug!("Replaying {} operations waiting on {}", waiting.len(), id);
                        // Reversed so the stack pops them in arrival order.
                        waiting.reverse();
                        ready.extend(waiting);
                    }
                }
                Operation::SetActive {
                    id,
                    target_id,
                    active,
                } => {
                    if target_id.is_root() {
                        debug!("Ignoring {}: the root cannot be toggled", id);
                        continue;
                    }
                    let Some(node) = self.nodes.get_mut(target_id) else {
                        continue;
                    };
                    if !node.set_active(*active, id) {
                        debug!("{} lost to the newer activator of {}", id, target_id);
                        continue;
                    }

                    let anchor = if *active {
                        let preceding = self.preceding_id(target_id);
                        self.visible_anchor(preceding)
                    } else {
                        None
                    };
                    on_applied(&op, anchor.as_ref());
                    applied += 1;
                }
                Operation::SetProperty { .. } => {}
            }
        }

        applied
    }

    /// Links a new node under `parent_id`, returning the id it follows in
    /// pre-order.
    fn insert_node(
        &mut self,
        id: &OperationId,
        parent_id: &OperationId,
        payload: P,
        kind: String,
    ) -> Option<OperationId> {
        let parent = self.nodes.get_mut(parent_id)?;
        let index = parent.child_insert_index(id);
        parent.child_ids.insert(index, id.clone());

        self.nodes.insert(
            id.clone(),
            TreeNode::new(id.clone(), parent_id.clone(), payload, kind),
        );
        self.preceding_id(id)
    }

    /// The node immediately before `id` in the flattened order.
    ///
    /// That is the parent for a first child, otherwise the last descendant of
    /// the previous sibling, since each sibling's subtree is contiguous.
    fn preceding_id(&self, id: &OperationId) -> Option<OperationId> {
        let parent_id = self.nodes.get(id)?.parent_id.as_ref()?;
        let parent = self.nodes.get(parent_id)?;
        match parent.child_index(id)? {
            0 => Some(parent_id.clone()),
            index => Some(self.subtree_tail(&parent.child_ids[index - 1])),
        }
    }

    /// Rightmost descendant of `id`, found by following last children.
    fn subtree_tail(&self, id: &OperationId) -> OperationId {
        let mut current = id;
        while let Some(last) = self.nodes.get(current).and_then(|n| n.child_ids.last()) {
            current = last;
        }
        current.clone()
    }

    /// Resolves an anchor through tombstones; the root maps to `None`.
    fn visible_anchor(&self, anchor: Option<OperationId>) -> Option<OperationId> {
        self.get_active_id(anchor.as_ref())
            .filter(|resolved| !resolved.is_root())
    }

    /// Returns `id` if it is active, otherwise the nearest active node to its
    /// left in the flattened order.
    ///
    /// The root is always active, so any known id resolves to something;
    /// `None` comes back only for `None` or an unknown id.
    pub fn get_active_id(&self, id: Option<&OperationId>) -> Option<OperationId> {
        let mut current = self.nodes.get(id?)?;
        if current.active {
            return Some(current.id.clone());
        }

        loop {
            let parent = self.nodes.get(current.parent_id.as_ref()?)?;
            let position = parent.child_index(&current.id)?;

            for sibling in parent.child_ids[..position].iter().rev() {
                if let Some(found) = self.last_active_in_subtree(sibling) {
                    return Some(found);
                }
            }
            if parent.active {
                return Some(parent.id.clone());
            }
            current = parent;
        }
    }

    /// Last active node of a subtree in flattened order, searching
    /// depth-first from the rightmost child.
    fn last_active_in_subtree(&self, start: &OperationId) -> Option<OperationId> {
        let mut stack = vec![(start, false)];

        while let Some((id, expanded)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if expanded {
                if node.active {
                    return Some(id.clone());
                }
            } else {
                stack.push((id, true));
                stack.extend(node.child_ids.iter().map(|child| (child, false)));
            }
        }

        None
    }

    /// Inserts `payload` immediately after `anchor` (the root inserts at the
    /// front) and returns the operation for broadcast.
    pub fn insert_after(
        &mut self,
        anchor: &OperationId,
        payload: P,
        kind: impl Into<String>,
    ) -> Result<Operation<P>, TreeError> {
        if !self.nodes.contains_key(anchor) {
            return Err(TreeError::UnknownNode(anchor.clone()));
        }

        let op = Operation::Create {
            id: self.clock.tick(),
            parent_id: anchor.clone(),
            payload,
            kind: kind.into(),
        };
        self.execute_operations([op.clone()], |_, _| {});
        Ok(op)
    }

    /// Inserts `payload` so that it becomes visible at `index`.
    pub fn insert_at(
        &mut self,
        index: usize,
        payload: P,
        kind: impl Into<String>,
    ) -> Result<Operation<P>, TreeError> {
        let anchor = match index.checked_sub(1) {
            None => OperationId::ROOT,
            Some(previous) => self.visible_id_at(previous, index)?,
        };
        self.insert_after(&anchor, payload, kind)
    }

    /// Tombstones a node.
    pub fn delete(&mut self, id: &OperationId) -> Result<Operation<P>, TreeError> {
        self.toggle(id, false)
    }

    /// Reactivates a tombstoned node.
    pub fn restore(&mut self, id: &OperationId) -> Result<Operation<P>, TreeError> {
        self.toggle(id, true)
    }

    /// Tombstones the node visible at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<Operation<P>, TreeError> {
        let id = self.visible_id_at(index, index)?;
        self.delete(&id)
    }

    fn toggle(&mut self, id: &OperationId, active: bool) -> Result<Operation<P>, TreeError> {
        if id.is_root() {
            return Err(TreeError::RootImmutable);
        }
        if !self.nodes.contains_key(id) {
            return Err(TreeError::UnknownNode(id.clone()));
        }

        let op = Operation::SetActive {
            id: self.clock.tick(),
            target_id: id.clone(),
            active,
        };
        self.execute_operations([op.clone()], |_, _| {});
        Ok(op)
    }

    fn visible_id_at(&self, position: usize, index: usize) -> Result<OperationId, TreeError> {
        let visible = self.visible_ids();
        let len = visible.len();
        visible
            .into_iter()
            .nth(position)
            .ok_or(TreeError::IndexOutOfBounds { index, len })
    }

    /// Replays `other`'s operation log, reporting each change like
    /// [`execute_operations`](Self::execute_operations).
    pub fn merge_with<F>(&mut self, other: &Self, on_applied: F) -> usize
    where
        F: FnMut(&Operation<P>, Option<&OperationId>),
    {
        self.execute_operations(other.log.iter().cloned(), on_applied)
    }
}

impl<P> ReplicatedOrderedTree<P> {
    pub fn replica_id(&self) -> &str {
        self.clock.replica_id()
    }

    /// Gets the current clock value (for debugging/testing).
    pub fn current_clock(&self) -> u64 {
        self.clock.current_counter()
    }

    /// Every node id except the root, tombstones included, in flattened order.
    pub fn flatten(&self) -> Vec<OperationId> {
        let mut order = Vec::with_capacity(self.nodes.len().saturating_sub(1));
        let mut stack: Vec<&OperationId> = match self.nodes.get(&OperationId::ROOT) {
            Some(root) => root.child_ids.iter().rev().collect(),
            None => Vec::new(),
        };

        while let Some(id) = stack.pop() {
            order.push(id.clone());
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.child_ids.iter().rev());
            }
        }

        order
    }

    /// Ids of the visible nodes in order.
    pub fn visible_ids(&self) -> Vec<OperationId> {
        self.visible_nodes().into_iter().map(|n| n.id.clone()).collect()
    }

    /// Visible nodes in order.
    pub fn visible_nodes(&self) -> Vec<&TreeNode<P>> {
        self.flatten()
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|node| node.is_visible())
            .collect()
    }

    /// Payloads of the visible nodes in order.
    pub fn values(&self) -> Vec<&P> {
        self.visible_nodes()
            .into_iter()
            .filter_map(|node| node.payload.as_ref())
            .collect()
    }

    pub fn node(&self, id: &OperationId) -> Option<&TreeNode<P>> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &OperationId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Position of `id` in the visible sequence.
    pub fn visible_index(&self, id: &OperationId) -> Option<usize> {
        self.visible_ids().iter().position(|visible| visible == id)
    }

    /// Number of visible nodes.
    pub fn len(&self) -> usize {
        self.nodes.values().filter(|node| node.is_visible()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of created nodes, tombstones included, root excluded.
    pub fn total_node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Number of operations waiting for a dependency.
    pub fn pending_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Every operation this replica has accepted, in the order it saw them.
    ///
    /// Replaying this log on another replica brings it up to date.
    pub fn operations(&self) -> &[Operation<P>] {
        &self.log
    }

    /// Finds the first visible node carrying `payload`.
    pub fn find_visible(&self, payload: &P) -> Option<OperationId>
    where
        P: PartialEq,
    {
        self.visible_nodes()
            .into_iter()
            .find(|node| node.payload.as_ref() == Some(payload))
            .map(|node| node.id.clone())
    }

    /// Logs every node, tombstones included, at debug level.
    pub fn dump_nodes(&self)
    where
        P: std::fmt::Debug,
    {
        debug!("--- Tree dump (replica {}) ---", self.replica_id());
        for id in self.flatten() {
            if let Some(node) = self.nodes.get(&id) {
                let status = if node.active { "ACTIVE" } else { "DELETED" };
                debug!(
                    "{} <- {}: {:?} [{}] {}",
                    id,
                    node.parent_id.as_ref().map(ToString::to_string).unwrap_or_default(),
                    node.payload,
                    node.kind,
                    status
                );
            }
        }
        debug!("{} pending operations", self.pending_count());
    }
}

impl ReplicatedOrderedTree<char> {
    /// The visible content as a string.
    pub fn text(&self) -> String {
        self.values().into_iter().collect()
    }
}

impl<P: Clone> Crdt for ReplicatedOrderedTree<P> {
    fn merge(&mut self, other: &Self) {
        self.merge_with(other, |_, _| {});
    }
}
