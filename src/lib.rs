#![forbid(unsafe_code)]

pub mod bus;
pub mod error;
pub mod model;
pub mod store;
pub mod vertex;
pub mod worker;

pub use crate::bus::{CoordinatorEvent, HashMapper, LocalBus, MessageBus, VertexMapper};
pub use crate::error::{FarolError, Result};
pub use crate::model::{Edge, Signal, SignalPayload, VertexId, WorkerStatus};
pub use crate::store::{CollectMap, InMemoryStore, SignalSet, VertexStore};
pub use crate::vertex::{EdgeList, Vertex};
pub use crate::worker::{
    GraphEditor, MessageInbox, OperationCounters, Poll, UndeliverableHandler, Worker, WorkerConfig,
    WorkerHandle, WorkerMessage, WorkerRequest, WorkerStatistics,
};
