use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::bus::{CoordinatorEvent, MessageBus, VertexMapper};
use crate::error::{FarolError, Result};
use crate::model::Signal;
use crate::vertex::Vertex;
use crate::worker::WorkerMessage;

use super::HashMapper;

/// In-process bus routing over registered mpsc endpoints.
///
/// Coordinator events sent before `register_coordinator` are dropped, so a
/// worker can be constructed and driven standalone.
pub struct LocalBus<V: Vertex> {
    workers: Mutex<HashMap<u32, Sender<WorkerMessage<V>>>>,
    coordinator: Mutex<Option<Sender<CoordinatorEvent>>>,
    mapper: Arc<dyn VertexMapper<V::Id>>,
    messages_sent: AtomicU64,
}

impl<V: Vertex> LocalBus<V> {
    pub fn new(mapper: Arc<dyn VertexMapper<V::Id>>) -> Arc<Self> {
        Arc::new(Self {
            workers: Mutex::new(HashMap::new()),
            coordinator: Mutex::new(None),
            mapper,
            messages_sent: AtomicU64::new(0),
        })
    }

    /// Bus with the default hash mapper over the given worker count.
    pub fn with_workers(number_of_workers: u32) -> Arc<Self> {
        Self::new(Arc::new(HashMapper::new(number_of_workers)))
    }

    fn endpoint_for(&self, worker_id: u32) -> Option<Sender<WorkerMessage<V>>> {
        self.workers.lock().get(&worker_id).cloned()
    }

    fn record_send(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }
}

impl<V: Vertex> MessageBus<V> for LocalBus<V> {
    fn register_worker(&self, worker_id: u32, endpoint: Sender<WorkerMessage<V>>) -> Result<()> {
        self.workers.lock().insert(worker_id, endpoint);
        Ok(())
    }

    fn register_coordinator(&self, endpoint: Sender<CoordinatorEvent>) -> Result<()> {
        *self.coordinator.lock() = Some(endpoint);
        Ok(())
    }

    fn send_signal(&self, signal: Signal<V::Id, V::Payload>) {
        let worker_id = self.mapper.worker_for(&signal.target);
        let Some(endpoint) = self.endpoint_for(worker_id) else {
            warn!(worker = worker_id, "bus.signal.unroutable");
            return;
        };
        if endpoint.send(WorkerMessage::Signal(signal)).is_ok() {
            self.record_send();
        } else {
            warn!(worker = worker_id, "bus.signal.dropped");
        }
    }

    fn send_to_worker(&self, worker_id: u32, message: WorkerMessage<V>) -> Result<()> {
        let Some(endpoint) = self.endpoint_for(worker_id) else {
            return Err(FarolError::NotFound("worker endpoint"));
        };
        endpoint
            .send(message)
            .map_err(|_| FarolError::Disconnected("worker endpoint"))?;
        self.record_send();
        Ok(())
    }

    fn send_to_coordinator(&self, event: CoordinatorEvent) -> Result<()> {
        let endpoint = self.coordinator.lock().clone();
        match endpoint {
            Some(endpoint) => {
                endpoint
                    .send(event)
                    .map_err(|_| FarolError::Disconnected("coordinator endpoint"))?;
                self.record_send();
            }
            None => trace!("bus.coordinator.unregistered"),
        }
        Ok(())
    }

    fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use crate::model::Edge;

    #[derive(Debug, Clone)]
    struct Probe {
        id: u32,
    }

    impl Vertex for Probe {
        type Id = u32;
        type Payload = i32;

        fn id(&self) -> u32 {
            self.id
        }

        fn score_signal(&self) -> f64 {
            0.0
        }

        fn score_collect(&self, _uncollected: &[Signal<u32, i32>]) -> f64 {
            0.0
        }

        fn execute_signal(&mut self, _bus: &dyn MessageBus<Self>) {}

        fn execute_collect(
            &mut self,
            _uncollected: Vec<Signal<u32, i32>>,
            _bus: &dyn MessageBus<Self>,
        ) {
        }

        fn add_outgoing_edge(&mut self, _edge: Edge<u32>) -> bool {
            false
        }

        fn remove_outgoing_edge(&mut self, _target: &u32, _kind: &str) -> bool {
            false
        }

        fn remove_all_outgoing_edges(&mut self) -> usize {
            0
        }

        fn outgoing_edge_count(&self) -> usize {
            0
        }
    }

    struct EvenOddMapper;

    impl VertexMapper<u32> for EvenOddMapper {
        fn worker_for(&self, id: &u32) -> u32 {
            id % 2
        }
    }

    #[test]
    fn signals_route_by_mapper() {
        let bus: Arc<LocalBus<Probe>> = LocalBus::new(Arc::new(EvenOddMapper));
        let (even_tx, even_rx) = mpsc::channel();
        let (odd_tx, odd_rx) = mpsc::channel();
        bus.register_worker(0, even_tx).expect("register even");
        bus.register_worker(1, odd_tx).expect("register odd");

        bus.send_signal(Signal::new(1, 4, 40));
        bus.send_signal(Signal::new(1, 5, 50));

        match even_rx.try_recv().expect("even message") {
            WorkerMessage::Signal(signal) => assert_eq!(signal.target, 4),
            other => panic!("unexpected message: {other:?}"),
        }
        match odd_rx.try_recv().expect("odd message") {
            WorkerMessage::Signal(signal) => assert_eq!(signal.target, 5),
            other => panic!("unexpected message: {other:?}"),
        }
        assert_eq!(MessageBus::<Probe>::messages_sent(bus.as_ref()), 2);
    }

    #[test]
    fn coordinator_events_dropped_until_registered() {
        let bus: Arc<LocalBus<Probe>> = LocalBus::with_workers(1);
        let status = crate::model::WorkerStatus {
            worker_id: 0,
            is_idle: false,
            is_paused: true,
            messages_sent: 0,
            messages_received: 0,
        };
        bus.send_to_coordinator(CoordinatorEvent::Status(status))
            .expect("silent drop");
        assert_eq!(MessageBus::<Probe>::messages_sent(bus.as_ref()), 0);

        let (tx, rx) = mpsc::channel();
        bus.register_coordinator(tx).expect("register coordinator");
        bus.send_to_coordinator(CoordinatorEvent::Status(status))
            .expect("delivered");
        assert_eq!(rx.try_recv().expect("event"), CoordinatorEvent::Status(status));
    }
}
