use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Identity of a vertex. Ids key the pending-work indices and route signals,
/// so they must be cheap to clone and hashable.
pub trait VertexId: Clone + Eq + Hash + fmt::Debug + Send + 'static {}

impl<T> VertexId for T where T: Clone + Eq + Hash + fmt::Debug + Send + 'static {}

/// Payload carried by signals between vertices.
pub trait SignalPayload: Clone + fmt::Debug + Send + 'static {}

impl<T> SignalPayload for T where T: Clone + fmt::Debug + Send + 'static {}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal<Id, P> {
    pub source: Id,
    pub target: Id,
    pub payload: P,
}

impl<Id, P> Signal<Id, P> {
    pub fn new(source: Id, target: Id, payload: P) -> Self {
        Self {
            source,
            target,
            payload,
        }
    }
}

/// Directed edge owned by its source vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge<Id> {
    pub source: Id,
    pub target: Id,
    pub kind: String,
}

impl<Id> Edge<Id> {
    pub fn new(source: Id, target: Id, kind: impl Into<String>) -> Self {
        Self {
            source,
            target,
            kind: kind.into(),
        }
    }
}

/// Snapshot pushed to the coordinator on every transition of `is_idle` or
/// `is_paused`. Emission is idempotent: no transition, no status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_id: u32,
    pub is_idle: bool,
    pub is_paused: bool,
    pub messages_sent: u64,
    pub messages_received: u64,
}
