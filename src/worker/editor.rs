use tracing::{trace, warn};

use crate::bus::MessageBus;
use crate::error::Result;
use crate::model::{Edge, Signal};
use crate::store::{CollectMap, SignalSet, VertexStore};
use crate::vertex::Vertex;
use crate::worker::OperationCounters;

/// Graph-mutation API over a worker's owned state.
///
/// The worker routes its own control-plane operations through this type and
/// hands it to undeliverable-signal handlers, so both paths share one set of
/// counter and index updates. All operations run on the worker thread.
pub struct GraphEditor<'a, V: Vertex> {
    pub(crate) store: &'a mut dyn VertexStore<V>,
    pub(crate) to_signal: &'a mut SignalSet<V::Id>,
    pub(crate) to_collect: &'a mut CollectMap<V::Id, V::Payload>,
    pub(crate) counters: &'a mut OperationCounters,
    pub(crate) bus: &'a dyn MessageBus<V>,
}

impl<V: Vertex> GraphEditor<'_, V> {
    /// Route a signal through the bus to whichever worker owns its target.
    pub fn send_signal(&self, signal: Signal<V::Id, V::Payload>) {
        self.bus.send_signal(signal);
    }

    /// Returns false without side effects when the id is already present.
    pub fn add_vertex(&mut self, vertex: V) -> Result<bool> {
        let id = vertex.id();
        if !self.store.insert(vertex)? {
            trace!(vertex = ?id, "graph.vertex.already_present");
            return Ok(false);
        }
        self.counters.vertices_added += 1;
        if let Some(vertex) = self.store.get(&id) {
            vertex.after_initialization(self.bus);
        }
        self.store.update_state(&id)?;
        Ok(true)
    }

    /// Attach an edge to its source vertex and mark the source for both
    /// phases. A missing source is a warning, not an error.
    pub fn add_edge(&mut self, edge: Edge<V::Id>) -> Result<bool> {
        let source = edge.source.clone();
        let Some(vertex) = self.store.get(&source) else {
            warn!(source = ?source, target = ?edge.target, kind = %edge.kind, "graph.edge.missing_source");
            return Ok(false);
        };
        if !vertex.add_outgoing_edge(edge) {
            return Ok(false);
        }
        self.counters.outgoing_edges_added += 1;
        self.to_collect.add_vertex(source.clone());
        self.to_signal.add(source.clone());
        self.store.update_state(&source)?;
        Ok(true)
    }

    pub fn remove_vertex(&mut self, id: &V::Id) -> Result<bool> {
        let Some(vertex) = self.store.get(id) else {
            warn!(vertex = ?id, "graph.vertex.missing_on_remove");
            return Ok(false);
        };
        self.counters.outgoing_edges_removed += vertex.outgoing_edge_count() as u64;
        self.counters.outgoing_edges_removed += vertex.remove_all_outgoing_edges() as u64;
        self.counters.vertices_removed += 1;
        self.store.remove(id)?;
        Ok(true)
    }

    pub fn remove_outgoing_edge(&mut self, source: &V::Id, target: &V::Id, kind: &str) -> Result<bool> {
        let Some(vertex) = self.store.get(source) else {
            warn!(source = ?source, target = ?target, kind = %kind, "graph.edge.missing_source");
            return Ok(false);
        };
        if !vertex.remove_outgoing_edge(target, kind) {
            warn!(source = ?source, target = ?target, kind = %kind, "graph.edge.missing_on_remove");
            return Ok(false);
        }
        self.counters.outgoing_edges_removed += 1;
        self.store.update_state(source)?;
        Ok(true)
    }

    /// Schedule both phases for one vertex; unknown ids are ignored.
    pub fn recalculate_scores_for(&mut self, id: &V::Id) {
        if self.store.contains(id) {
            self.to_collect.add_vertex(id.clone());
            self.to_signal.add(id.clone());
        }
    }
}
