//! Type definitions shared by every replicated structure.
//!
//! Ids, the Lamport clock that mints them, and the operation enum that
//! replicas exchange.

pub mod clock;
pub mod operation;
pub mod operation_id;
pub mod replica;

pub use clock::LamportClock;
pub use operation::Operation;
pub use operation_id::{OperationId, ROOT_LITERAL};
pub use replica::ReplicaId;
