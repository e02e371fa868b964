#![allow(dead_code)]

use std::sync::mpsc;
use std::time::Duration;

use farol::{
    Edge, EdgeList, MessageBus, Signal, Vertex, VertexStore, WorkerHandle, WorkerRequest,
};

/// Propagates the maximum state it has seen to its neighbors. Signals only
/// when its state changed since the last signal, so a shard converges once
/// every vertex has seen the global maximum.
#[derive(Debug, Clone)]
pub struct MaxVertex {
    pub id: u64,
    pub state: u64,
    last_signaled: Option<u64>,
    edges: EdgeList<u64>,
}

impl MaxVertex {
    pub fn new(id: u64, state: u64) -> Self {
        Self {
            id,
            state,
            last_signaled: None,
            edges: EdgeList::new(),
        }
    }
}

impl Vertex for MaxVertex {
    type Id = u64;
    type Payload = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn score_signal(&self) -> f64 {
        if self.last_signaled == Some(self.state) {
            0.0
        } else {
            1.0
        }
    }

    fn score_collect(&self, uncollected: &[Signal<u64, u64>]) -> f64 {
        uncollected.len() as f64
    }

    fn execute_signal(&mut self, bus: &dyn MessageBus<Self>) {
        for edge in self.edges.iter() {
            bus.send_signal(Signal::new(self.id, edge.target, self.state));
        }
        self.last_signaled = Some(self.state);
    }

    fn execute_collect(&mut self, uncollected: Vec<Signal<u64, u64>>, _bus: &dyn MessageBus<Self>) {
        for signal in uncollected {
            self.state = self.state.max(signal.payload);
        }
    }

    fn add_outgoing_edge(&mut self, edge: Edge<u64>) -> bool {
        self.edges.add(edge)
    }

    fn remove_outgoing_edge(&mut self, target: &u64, kind: &str) -> bool {
        self.edges.remove(target, kind)
    }

    fn remove_all_outgoing_edges(&mut self) -> usize {
        self.edges.clear()
    }

    fn outgoing_edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Snapshot `(id, state)` pairs from a spawned worker's shard.
pub fn probe_states(handle: &WorkerHandle<MaxVertex>) -> Vec<(u64, u64)> {
    let (reply, result) = mpsc::channel();
    handle
        .request(WorkerRequest::Probe(Box::new(move |store| {
            let mut states = Vec::new();
            let _ = store.for_each(&mut |vertex: &mut MaxVertex| {
                states.push((vertex.id, vertex.state));
            });
            let _ = reply.send(states);
        })))
        .expect("send probe");
    result
        .recv_timeout(Duration::from_secs(5))
        .expect("probe reply")
}
