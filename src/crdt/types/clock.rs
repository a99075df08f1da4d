//! Lamport clock used to mint fresh operation ids.
//!
//! Each replicated structure owns one clock. Local edits `tick` it; every
//! operation observed from any replica `update`s it, so a later local edit is
//! always ordered after everything this replica has already seen.

use crate::crdt::types::operation_id::OperationId;
use crate::crdt::types::replica::ReplicaId;

/// A per-replica Lamport clock.
#[derive(Debug, Clone)]
pub struct LamportClock {
    counter: u64,
    replica_id: ReplicaId,
}

impl LamportClock {
    /// Creates a new Lamport clock starting at zero
    pub fn new(replica_id: impl Into<ReplicaId>) -> Self {
        LamportClock {
            counter: 0,
            replica_id: replica_id.into(),
        }
    }

    /// Generates the next id for this replica
    pub fn tick(&mut self) -> OperationId {
        self.counter += 1;
        OperationId::new(self.counter, self.replica_id.clone())
    }

    /// Advances the clock to at least `counter`.
    pub fn update(&mut self, counter: u64) {
        self.counter = self.counter.max(counter);
    }

    /// Gets the current counter value
    pub fn current_counter(&self) -> u64 {
        self.counter
    }

    pub fn replica_id(&self) -> &str {
        &self.replica_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamport_clock() {
        let mut clock = LamportClock::new("A");

        let id1 = clock.tick();
        let id2 = clock.tick();

        assert_eq!(id1.replica_id, "A");
        assert_eq!(id2.replica_id, "A");
        assert!(id1 < id2);
        assert_eq!(id1.counter + 1, id2.counter);
    }

    #[test]
    fn test_lamport_clock_update() {
        let mut clock = LamportClock::new("A");

        clock.update(100);
        let next = clock.tick();

        assert_eq!(next.counter, 101);
        assert_eq!(next.replica_id, "A");
    }

    #[test]
    fn test_update_never_goes_backwards() {
        let mut clock = LamportClock::new("A");
        clock.update(10);
        clock.update(3);
        assert_eq!(clock.current_counter(), 10);
    }

    #[test]
    fn test_first_tick_is_never_root() {
        let mut clock = LamportClock::new("");
        assert!(!clock.tick().is_root());
    }
}
