use std::fmt;
use std::sync::mpsc::Sender;

use crate::model::{Edge, Signal};
use crate::store::VertexStore;
use crate::vertex::Vertex;
use crate::worker::GraphEditor;

pub type VertexPredicate<V> = Box<dyn FnMut(&V) -> bool + Send>;

pub type EdgeFactory<V> = Box<dyn FnMut(&V) -> Edge<<V as Vertex>::Id> + Send>;

/// Read escape hatch: runs against the vertex store on the worker thread.
/// Callers that need a typed result close over their own reply channel.
pub type StoreProbe<V> = Box<dyn FnOnce(&mut dyn VertexStore<V>) + Send>;

/// Invoked for each signal whose target is absent from the shard at collect
/// time. The editor argument allows corrective graph mutations.
pub type UndeliverableHandler<V> = Box<
    dyn FnMut(Signal<<V as Vertex>::Id, <V as Vertex>::Payload>, &mut GraphEditor<'_, V>) + Send,
>;

/// Anything a worker accepts through its inbox.
pub enum WorkerMessage<V: Vertex> {
    Signal(Signal<V::Id, V::Payload>),
    Request(WorkerRequest<V>),
}

/// Control-plane operations, applied atomically between processing steps.
pub enum WorkerRequest<V: Vertex> {
    AddVertex(V),
    AddEdge(Edge<V::Id>),
    RemoveVertex(V::Id),
    RemoveOutgoingEdge {
        source: V::Id,
        target: V::Id,
        kind: String,
    },
    RemoveVertices(VertexPredicate<V>),
    AddPatternEdge {
        matches: VertexPredicate<V>,
        build: EdgeFactory<V>,
    },
    RecalculateScores,
    RecalculateScoresFor(V::Id),
    SetSignalThreshold(f64),
    SetCollectThreshold(f64),
    SetUndeliverableHandler(UndeliverableHandler<V>),
    /// Explicit signal step; acknowledged once the pending set is drained.
    SignalStep(Sender<()>),
    /// Explicit collect step; replies whether the signal set stayed empty.
    CollectStep(Sender<bool>),
    Probe(StoreProbe<V>),
    /// Push a statistics snapshot to the coordinator.
    ReportStatistics,
    StartComputation,
    PauseComputation,
    Shutdown,
}

impl<V: Vertex> fmt::Debug for WorkerMessage<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => f
                .debug_struct("Signal")
                .field("source", &signal.source)
                .field("target", &signal.target)
                .finish(),
            Self::Request(request) => f.debug_tuple("Request").field(request).finish(),
        }
    }
}

impl<V: Vertex> fmt::Debug for WorkerRequest<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddVertex(_) => f.write_str("AddVertex"),
            Self::AddEdge(edge) => f.debug_tuple("AddEdge").field(edge).finish(),
            Self::RemoveVertex(id) => f.debug_tuple("RemoveVertex").field(id).finish(),
            Self::RemoveOutgoingEdge {
                source,
                target,
                kind,
            } => f
                .debug_struct("RemoveOutgoingEdge")
                .field("source", source)
                .field("target", target)
                .field("kind", kind)
                .finish(),
            Self::RemoveVertices(_) => f.write_str("RemoveVertices"),
            Self::AddPatternEdge { .. } => f.write_str("AddPatternEdge"),
            Self::RecalculateScores => f.write_str("RecalculateScores"),
            Self::RecalculateScoresFor(id) => {
                f.debug_tuple("RecalculateScoresFor").field(id).finish()
            }
            Self::SetSignalThreshold(threshold) => {
                f.debug_tuple("SetSignalThreshold").field(threshold).finish()
            }
            Self::SetCollectThreshold(threshold) => f
                .debug_tuple("SetCollectThreshold")
                .field(threshold)
                .finish(),
            Self::SetUndeliverableHandler(_) => f.write_str("SetUndeliverableHandler"),
            Self::SignalStep(_) => f.write_str("SignalStep"),
            Self::CollectStep(_) => f.write_str("CollectStep"),
            Self::Probe(_) => f.write_str("Probe"),
            Self::ReportStatistics => f.write_str("ReportStatistics"),
            Self::StartComputation => f.write_str("StartComputation"),
            Self::PauseComputation => f.write_str("PauseComputation"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}
