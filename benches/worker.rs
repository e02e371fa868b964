use std::sync::mpsc::Sender;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use farol::{
    Edge, EdgeList, InMemoryStore, LocalBus, MessageBus, Signal, Vertex, Worker, WorkerConfig,
    WorkerMessage, WorkerRequest,
};

#[derive(Debug, Clone)]
struct MaxVertex {
    id: u64,
    state: u64,
    last_signaled: Option<u64>,
    edges: EdgeList<u64>,
}

impl MaxVertex {
    fn new(id: u64, state: u64) -> Self {
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

fn ring_worker(length: u64) -> (Worker<MaxVertex>, Sender<WorkerMessage<MaxVertex>>) {
    let bus = LocalBus::with_workers(1);
    let config = WorkerConfig {
        idle_timeout: Duration::from_millis(1),
        ..Default::default()
    };
    let (mut worker, sender) =
        Worker::new(config, Box::new(InMemoryStore::new()), bus).expect("worker");
    for id in 0..length {
        worker
            .add_vertex(MaxVertex::new(id, id + 1))
            .expect("add vertex");
    }
    for id in 0..length {
        worker
            .add_edge(Edge::new(id, (id + 1) % length, "ring"))
            .expect("add edge");
    }
    (worker, sender)
}

fn ring_convergence(c: &mut Criterion) {
    c.bench_function("ring_64_converges", |b| {
        b.iter_batched(
            || ring_worker(64),
            |(mut worker, sender)| {
                sender
                    .send(WorkerMessage::Request(WorkerRequest::StartComputation))
                    .expect("start");
                loop {
                    worker.tick().expect("tick");
                    let done = worker
                        .aggregate(true, |a, b| a && b, |v| v.state == 64)
                        .expect("aggregate");
                    if done && worker.is_converged() {
                        break;
                    }
                }
                worker
            },
            BatchSize::SmallInput,
        )
    });
}

fn signal_step_throughput(c: &mut Criterion) {
    c.bench_function("signal_step_1024", |b| {
        b.iter_batched(
            || {
                let (mut worker, sender) = ring_worker(1024);
                worker.recalculate_scores().expect("recalculate");
                (worker, sender)
            },
            |(mut worker, _sender)| {
                worker.signal_step().expect("signal step");
                worker
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, ring_convergence, signal_step_throughput);
criterion_main!(benches);
