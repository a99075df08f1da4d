//! Last-writer-wins register map keyed by `(entity, property)`.
//!
//! Entity attributes such as existence, position or color are stored as
//! mergeable facts. Each key keeps the value written by the operation with the
//! greatest [`OperationId`], so replicas agree on the winner no matter which
//! order writes arrive in.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tracing::{debug, trace};

use crate::crdt::Crdt;
use crate::crdt::types::{LamportClock, Operation, OperationId};

/// Current value of one register and the operation that wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterEntry<V> {
    pub value: V,
    pub winner_id: OperationId,
}

/// Notification that a register took a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange<V> {
    pub entity_id: String,
    pub property_name: String,
    pub value: V,
    pub id: OperationId,
}

type Listener<V> = Box<dyn FnMut(&[PropertyChange<V>])>;

/// A map of last-writer-wins registers.
///
/// Local writes and remote operations go through the same entry point,
/// [`apply_operations`](Self::apply_operations). Listeners registered with
/// [`subscribe`](Self::subscribe) receive one batch of changes per call.
pub struct ReplicatedRegisterMap<V> {
    clock: LamportClock,
    entries: BTreeMap<(String, String), RegisterEntry<V>>,
    log: Vec<Operation<V>>,
    seen: HashSet<OperationId>,
    /// Local writes awaiting `apply_pending`
    staged: Vec<Operation<V>>,
    listeners: Vec<Listener<V>>,
}

impl<V: Clone> ReplicatedRegisterMap<V> {
    pub fn new(replica_id: impl Into<String>) -> Self {
        ReplicatedRegisterMap {
            clock: LamportClock::new(replica_id),
            entries: BTreeMap::new(),
            log: Vec::new(),
            seen: HashSet::new(),
            staged: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Writes a value immediately and returns the operation for broadcast.
    pub fn set(
        &mut self,
        entity_id: impl Into<String>,
        property_name: impl Into<String>,
        value: V,
    ) -> Operation<V> {
        let op = Operation::SetProperty {
            id: self.clock.tick(),
            entity_id: entity_id.into(),
            property_name: property_name.into(),
            value,
        };
        self.apply_operations([op.clone()]);
        op
    }

    /// Stages a write without applying it, so several writes can be
    /// delivered to listeners as one batch.
    pub fn set_pending(
        &mut self,
        entity_id: impl Into<String>,
        property_name: impl Into<String>,
        value: V,
    ) -> OperationId {
        let id = self.clock.tick();
        self.staged.push(Operation::SetProperty {
            id: id.clone(),
            entity_id: entity_id.into(),
            property_name: property_name.into(),
            value,
        });
        id
    }

    /// Applies every staged write and returns the staged operations.
    pub fn apply_pending(&mut self) -> Vec<Operation<V>> {
        let staged = std::mem::take(&mut self.staged);
        self.apply_operations(staged.iter().cloned());
        staged
    }

    /// Applies operations from any replica, returning the changes that won.
    ///
    /// Duplicates and writes older than the current winner produce no
    /// change. Listeners are notified once with the whole batch, and only if
    /// it is non-empty.
    pub fn apply_operations<I>(&mut self, ops: I) -> Vec<PropertyChange<V>>
    where
        I: IntoIterator<Item = Operation<V>>,
    {
        let mut changes = Vec::new();

        for op in ops {
            let Operation::SetProperty {
                id,
                entity_id,
                property_name,
                value,
            } = &op
            else {
                trace!("Ignoring {} {}: not a register operation", op.kind_name(), op.id());
                continue;
            };
            if id.is_root() {
                trace!("Ignoring {} carrying the root id", op.kind_name());
                continue;
            }
            if self.seen.contains(id) {
                trace!("Skipping duplicate operation {}", id);
                continue;
            }

            self.clock.update(id.counter);
            self.seen.insert(id.clone());

            let key = (entity_id.clone(), property_name.clone());
            let wins = self
                .entries
                .get(&key)
                .is_none_or(|current| *id > current.winner_id);
            if wins {
                self.entries.insert(
                    key,
                    RegisterEntry {
                        value: value.clone(),
                        winner_id: id.clone(),
                    },
                );
                changes.push(PropertyChange {
                    entity_id: entity_id.clone(),
                    property_name: property_name.clone(),
                    value: value.clone(),
                    id: id.clone(),
                });
            } else {
                debug!("{} lost to the current winner of {}.{}", id, entity_id, property_name);
            }

            self.log.push(op);
        }

        if !changes.is_empty() {
            for listener in &mut self.listeners {
                listener(&changes);
            }
        }

        changes
    }

    /// Replays `other`'s full operation log.
    pub fn merge_from(&mut self, other: &Self) -> Vec<PropertyChange<V>> {
        self.apply_operations(other.log.iter().cloned())
    }
}

impl<V> ReplicatedRegisterMap<V> {
    pub fn replica_id(&self) -> &str {
        self.clock.replica_id()
    }

    pub fn current_clock(&self) -> u64 {
        self.clock.current_counter()
    }

    /// Registers a listener for change batches.
    pub fn subscribe(&mut self, listener: impl FnMut(&[PropertyChange<V>]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn get(&self, entity_id: &str, property_name: &str) -> Option<&V> {
        self.entry(entity_id, property_name).map(|entry| &entry.value)
    }

    pub fn entry(&self, entity_id: &str, property_name: &str) -> Option<&RegisterEntry<V>> {
        self.entries
            .get(&(entity_id.to_string(), property_name.to_string()))
    }

    /// Every property of one entity, sorted by name.
    pub fn properties<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = (&'a str, &'a V)> {
        self.entries
            .iter()
            .filter(move |((entity, _), _)| entity == entity_id)
            .map(|((_, property), entry)| (property.as_str(), &entry.value))
    }

    /// Ids of every entity with at least one property, sorted.
    pub fn entities(&self) -> Vec<&str> {
        let mut entities: Vec<&str> = self.entries.keys().map(|(e, _)| e.as_str()).collect();
        entities.dedup();
        entities
    }

    /// Every entry as `(entity, property, entry)`, sorted by key.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &RegisterEntry<V>)> {
        self.entries
            .iter()
            .map(|((entity, property), entry)| (entity.as_str(), property.as_str(), entry))
    }

    /// Every operation this replica has applied.
    pub fn operations(&self) -> &[Operation<V>] {
        &self.log
    }

    /// Number of writes staged by `set_pending` and not yet applied.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }
}

impl<V: fmt::Debug> fmt::Debug for ReplicatedRegisterMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicatedRegisterMap")
            .field("clock", &self.clock)
            .field("entries", &self.entries)
            .field("operations", &self.log.len())
            .field("staged", &self.staged)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<V: Clone> Crdt for ReplicatedRegisterMap<V> {
    fn merge(&mut self, other: &Self) {
        self.merge_from(other);
    }
}
