mod local;

pub use local::LocalBus;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Signal, WorkerStatus};
use crate::vertex::Vertex;
use crate::worker::{WorkerMessage, WorkerStatistics};

/// Events a worker pushes up to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoordinatorEvent {
    Status(WorkerStatus),
    Statistics(WorkerStatistics),
}

/// Transport seam between workers and the coordinator.
///
/// Delivery is in order per source-destination pair; duplicates are not
/// assumed and exactly-once is not promised.
pub trait MessageBus<V: Vertex>: Send + Sync {
    fn register_worker(&self, worker_id: u32, endpoint: Sender<WorkerMessage<V>>) -> Result<()>;

    fn register_coordinator(&self, endpoint: Sender<CoordinatorEvent>) -> Result<()>;

    /// Route a signal to the worker owning its target. Fire-and-forget:
    /// unroutable signals are logged and dropped, and a target missing from
    /// the destination shard surfaces through that worker's undeliverable
    /// handler at collect time.
    fn send_signal(&self, signal: Signal<V::Id, V::Payload>);

    fn send_to_worker(&self, worker_id: u32, message: WorkerMessage<V>) -> Result<()>;

    fn send_to_coordinator(&self, event: CoordinatorEvent) -> Result<()>;

    fn messages_sent(&self) -> u64;
}

/// Pure mapping from vertex id to owning worker, used by the bus to route
/// signals.
pub trait VertexMapper<Id>: Send + Sync {
    fn worker_for(&self, id: &Id) -> u32;
}

/// Default mapper: hash of the id modulo the worker count.
#[derive(Debug, Clone, Copy)]
pub struct HashMapper {
    number_of_workers: u32,
}

impl HashMapper {
    pub fn new(number_of_workers: u32) -> Self {
        Self {
            number_of_workers: number_of_workers.max(1),
        }
    }
}

impl<Id: Hash> VertexMapper<Id> for HashMapper {
    fn worker_for(&self, id: &Id) -> u32 {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        (hasher.finish() % u64::from(self.number_of_workers)) as u32
    }
}
