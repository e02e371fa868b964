//! The per-worker runtime: a single cooperative thread that owns one vertex
//! shard and interleaves inbox draining with signal and collect execution
//! until the shard converges.
//!
//! External code never touches worker-owned state directly; it enqueues
//! [`WorkerMessage`]s through the bus or a [`WorkerHandle`]. Control flags
//! set by requests are observed at loop boundaries only.

mod config;
mod counters;
mod editor;
mod inbox;
mod request;


pub use config::{
    WorkerConfig, DEFAULT_COLLECT_THRESHOLD, DEFAULT_IDLE_TIMEOUT, DEFAULT_SIGNAL_THRESHOLD,
};
pub use counters::{OperationCounters, WorkerStatistics};
pub use editor::GraphEditor;
pub use inbox::{MessageInbox, Poll};
pub use request::{
    EdgeFactory, StoreProbe, UndeliverableHandler, VertexPredicate, WorkerMessage, WorkerRequest,
};

use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::bus::{CoordinatorEvent, MessageBus};
use crate::error::{FarolError, Result};
use crate::model::{Edge, Signal, WorkerStatus};
use crate::store::{CollectMap, SignalSet, VertexStore};
use crate::vertex::Vertex;

pub struct Worker<V: Vertex> {
    worker_id: u32,
    signal_threshold: f64,
    collect_threshold: f64,
    idle_timeout: Duration,
    store: Box<dyn VertexStore<V>>,
    to_signal: SignalSet<V::Id>,
    to_collect: CollectMap<V::Id, V::Payload>,
    inbox: MessageInbox<V>,
    bus: Arc<dyn MessageBus<V>>,
    counters: OperationCounters,
    undeliverable: UndeliverableHandler<V>,
    is_idle: bool,
    is_paused: bool,
    should_start: bool,
    should_pause: bool,
    should_shutdown: bool,
}

impl<V: Vertex> fmt::Debug for Worker<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("worker_id", &self.worker_id)
            .field("signal_threshold", &self.signal_threshold)
            .field("collect_threshold", &self.collect_threshold)
            .field("num_vertices", &self.store.len())
            .field("is_idle", &self.is_idle)
            .field("is_paused", &self.is_paused)
            .finish()
    }
}

impl<V: Vertex> Worker<V> {
    /// Build a worker and register its inbox endpoint with the bus. The
    /// returned sender feeds the inbox directly; in a deployment it is the
    /// bus that holds it.
    pub fn new(
        config: WorkerConfig,
        store: Box<dyn VertexStore<V>>,
        bus: Arc<dyn MessageBus<V>>,
    ) -> Result<(Self, Sender<WorkerMessage<V>>)> {
        config.validate()?;
        let (sender, inbox) = MessageInbox::channel();
        bus.register_worker(config.worker_id, sender.clone())?;
        Ok((Self::from_parts(&config, store, bus, inbox), sender))
    }

    /// Run a worker on its own named thread. The store is created by the
    /// factory on that thread, before the event loop starts, so storage
    /// configuration errors surface ahead of any processing.
    pub fn spawn<F>(
        config: WorkerConfig,
        storage: F,
        bus: Arc<dyn MessageBus<V>>,
    ) -> Result<WorkerHandle<V>>
    where
        F: FnOnce() -> Result<Box<dyn VertexStore<V>>> + Send + 'static,
    {
        config.validate()?;
        let (sender, inbox) = MessageInbox::channel();
        bus.register_worker(config.worker_id, sender.clone())?;
        let worker_id = config.worker_id;
        let join = thread::Builder::new()
            .name(format!("farol-worker-{worker_id}"))
            .spawn(move || -> Result<()> {
                let store = storage()?;
                let worker = Worker::from_parts(&config, store, bus, inbox);
                worker.run()
            })?;
        Ok(WorkerHandle {
            worker_id,
            sender,
            join: Some(join),
        })
    }

    fn from_parts(
        config: &WorkerConfig,
        store: Box<dyn VertexStore<V>>,
        bus: Arc<dyn MessageBus<V>>,
        inbox: MessageInbox<V>,
    ) -> Self {
        Self {
            worker_id: config.worker_id,
            signal_threshold: config.signal_threshold,
            collect_threshold: config.collect_threshold,
            idle_timeout: config.idle_timeout,
            store,
            to_signal: SignalSet::new(),
            to_collect: CollectMap::new(),
            inbox,
            bus,
            counters: OperationCounters::default(),
            undeliverable: Box::new(|_, _| {}),
            is_idle: false,
            is_paused: true,
            should_start: false,
            should_pause: false,
            should_shutdown: false,
        }
    }

    pub fn worker_id(&self) -> u32 {
        self.worker_id
    }

    pub fn is_idle(&self) -> bool {
        self.is_idle
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// No vertex on this shard needs further signal or collect work.
    pub fn is_converged(&self) -> bool {
        self.to_signal.is_empty() && self.to_collect.is_empty()
    }

    pub fn counters(&self) -> &OperationCounters {
        &self.counters
    }

    pub fn signal_threshold(&self) -> f64 {
        self.signal_threshold
    }

    pub fn collect_threshold(&self) -> f64 {
        self.collect_threshold
    }

    pub fn set_signal_threshold(&mut self, threshold: f64) {
        self.signal_threshold = threshold;
    }

    pub fn set_collect_threshold(&mut self, threshold: f64) {
        self.collect_threshold = threshold;
    }

    pub fn set_undeliverable_handler(&mut self, handler: UndeliverableHandler<V>) {
        self.undeliverable = handler;
    }

    /// Drive the event loop until shutdown, then release store resources.
    pub fn run(mut self) -> Result<()> {
        debug!(worker = self.worker_id, "worker.run.start");
        while !self.should_shutdown {
            self.tick()?;
        }
        self.store.cleanup()?;
        debug!(worker = self.worker_id, "worker.run.stop");
        Ok(())
    }

    /// One main-loop iteration: idle handling, then (when running) a signal
    /// pass over the pending set followed by a collect pass that interleaves
    /// inbox drains between vertices.
    pub fn tick(&mut self) -> Result<()> {
        self.handle_idling()?;
        if self.is_paused || self.should_shutdown {
            return Ok(());
        }
        for id in self.to_signal.drain() {
            self.execute_signal_of(&id)?;
        }
        for (id, uncollected) in self.to_collect.drain() {
            self.process_inbox()?;
            if self.execute_collect_of(&id, uncollected)? {
                self.execute_signal_of(&id)?;
            }
        }
        Ok(())
    }

    fn handle_idling(&mut self) -> Result<()> {
        self.apply_control_flags()?;
        if self.is_converged() || self.is_paused {
            self.process_inbox_or_idle(self.idle_timeout)
        } else {
            self.process_inbox()
        }
    }

    fn apply_control_flags(&mut self) -> Result<()> {
        if self.should_start {
            self.should_start = false;
            self.set_paused(false)?;
        } else if self.should_pause {
            self.should_pause = false;
            self.set_paused(true)?;
        }
        Ok(())
    }

    /// Drain every currently-available message without blocking.
    fn process_inbox(&mut self) -> Result<()> {
        loop {
            match self.inbox.try_next() {
                Poll::Message(message) => self.process(message)?,
                Poll::Empty => return Ok(()),
                Poll::Closed => {
                    self.on_inbox_closed();
                    return Ok(());
                }
            }
        }
    }

    /// Poll once with a timeout; on timeout enter the idle protocol: report
    /// idle, block for one message, report busy again. A shutdown handled
    /// while idle leaves the idle status as the final word.
    fn process_inbox_or_idle(&mut self, timeout: Duration) -> Result<()> {
        match self.inbox.poll(timeout) {
            Poll::Message(message) => {
                self.process(message)?;
                self.process_inbox()
            }
            Poll::Empty => {
                self.set_idle(true)?;
                match self.inbox.next_blocking() {
                    Poll::Message(message) => self.process(message)?,
                    Poll::Closed => self.on_inbox_closed(),
                    Poll::Empty => {}
                }
                if !self.should_shutdown {
                    self.set_idle(false)?;
                }
                Ok(())
            }
            Poll::Closed => {
                self.on_inbox_closed();
                Ok(())
            }
        }
    }

    fn process(&mut self, message: WorkerMessage<V>) -> Result<()> {
        self.counters.messages_received += 1;
        match message {
            WorkerMessage::Signal(signal) => self.to_collect.add_signal(signal),
            WorkerMessage::Request(request) => self.apply(request)?,
        }
        Ok(())
    }

    fn apply(&mut self, request: WorkerRequest<V>) -> Result<()> {
        trace!(worker = self.worker_id, ?request, "worker.request");
        match request {
            WorkerRequest::AddVertex(vertex) => {
                self.add_vertex(vertex)?;
            }
            WorkerRequest::AddEdge(edge) => {
                self.add_edge(edge)?;
            }
            WorkerRequest::RemoveVertex(id) => {
                self.remove_vertex(&id)?;
            }
            WorkerRequest::RemoveOutgoingEdge {
                source,
                target,
                kind,
            } => {
                self.remove_outgoing_edge(&source, &target, &kind)?;
            }
            WorkerRequest::RemoveVertices(predicate) => {
                self.remove_vertices(predicate)?;
            }
            WorkerRequest::AddPatternEdge { matches, build } => {
                self.add_pattern_edge(matches, build)?;
            }
            WorkerRequest::RecalculateScores => self.recalculate_scores()?,
            WorkerRequest::RecalculateScoresFor(id) => self.recalculate_scores_for(&id),
            WorkerRequest::SetSignalThreshold(threshold) => self.set_signal_threshold(threshold),
            WorkerRequest::SetCollectThreshold(threshold) => self.set_collect_threshold(threshold),
            WorkerRequest::SetUndeliverableHandler(handler) => {
                self.set_undeliverable_handler(handler)
            }
            WorkerRequest::SignalStep(ack) => {
                self.signal_step()?;
                let _ = ack.send(());
            }
            WorkerRequest::CollectStep(reply) => {
                let converged = self.collect_step()?;
                let _ = reply.send(converged);
            }
            WorkerRequest::Probe(probe) => probe(self.store.as_mut()),
            WorkerRequest::ReportStatistics => {
                let statistics = self.statistics()?;
                self.bus
                    .send_to_coordinator(CoordinatorEvent::Statistics(statistics))?;
            }
            WorkerRequest::StartComputation => self.should_start = true,
            WorkerRequest::PauseComputation => self.should_pause = true,
            WorkerRequest::Shutdown => {
                debug!(worker = self.worker_id, "worker.shutdown.requested");
                self.should_shutdown = true;
            }
        }
        Ok(())
    }

    /// Run the signal operation of one vertex, gated by its score. Missing
    /// vertices are skipped.
    fn execute_signal_of(&mut self, id: &V::Id) -> Result<bool> {
        let Some(vertex) = self.store.get(id) else {
            return Ok(false);
        };
        if vertex.score_signal() <= self.signal_threshold {
            return Ok(false);
        }
        vertex.execute_signal(self.bus.as_ref());
        self.counters.signal_operations_executed += 1;
        self.store.update_state(id)?;
        Ok(true)
    }

    /// Run the collect operation of one vertex against its buffered signals.
    /// A missing target routes every signal, in arrival order, through the
    /// undeliverable handler.
    fn execute_collect_of(
        &mut self,
        id: &V::Id,
        uncollected: Vec<Signal<V::Id, V::Payload>>,
    ) -> Result<bool> {
        if !self.store.contains(id) {
            self.route_undeliverable(uncollected);
            return Ok(false);
        }
        let Some(vertex) = self.store.get(id) else {
            return Ok(false);
        };
        if vertex.score_collect(&uncollected) <= self.collect_threshold {
            return Ok(false);
        }
        vertex.execute_collect(uncollected, self.bus.as_ref());
        self.counters.collect_operations_executed += 1;
        self.store.update_state(id)?;
        Ok(true)
    }

    fn route_undeliverable(&mut self, signals: Vec<Signal<V::Id, V::Payload>>) {
        for signal in signals {
            trace!(source = ?signal.source, target = ?signal.target, "signal.undeliverable");
            let mut editor = GraphEditor {
                store: self.store.as_mut(),
                to_signal: &mut self.to_signal,
                to_collect: &mut self.to_collect,
                counters: &mut self.counters,
                bus: self.bus.as_ref(),
            };
            (self.undeliverable)(signal, &mut editor);
        }
    }

    fn on_inbox_closed(&mut self) {
        if !self.should_shutdown {
            warn!(worker = self.worker_id, "worker.inbox.closed");
            self.should_shutdown = true;
        }
    }

    fn set_paused(&mut self, paused: bool) -> Result<()> {
        if self.is_paused != paused {
            self.is_paused = paused;
            self.emit_status()?;
        }
        Ok(())
    }

    fn set_idle(&mut self, idle: bool) -> Result<()> {
        if self.is_idle != idle {
            self.is_idle = idle;
            self.emit_status()?;
        }
        Ok(())
    }

    fn emit_status(&self) -> Result<()> {
        let status = WorkerStatus {
            worker_id: self.worker_id,
            is_idle: self.is_idle,
            is_paused: self.is_paused,
            messages_sent: self.bus.messages_sent(),
            messages_received: self.counters.messages_received,
        };
        trace!(
            worker = self.worker_id,
            idle = status.is_idle,
            paused = status.is_paused,
            "worker.status"
        );
        self.bus.send_to_coordinator(CoordinatorEvent::Status(status))
    }

    fn editor(&mut self) -> GraphEditor<'_, V> {
        GraphEditor {
            store: self.store.as_mut(),
            to_signal: &mut self.to_signal,
            to_collect: &mut self.to_collect,
            counters: &mut self.counters,
            bus: self.bus.as_ref(),
        }
    }

    pub fn add_vertex(&mut self, vertex: V) -> Result<bool> {
        self.editor().add_vertex(vertex)
    }

    pub fn add_edge(&mut self, edge: Edge<V::Id>) -> Result<bool> {
        self.editor().add_edge(edge)
    }

    pub fn remove_vertex(&mut self, id: &V::Id) -> Result<bool> {
        self.editor().remove_vertex(id)
    }

    pub fn remove_outgoing_edge(
        &mut self,
        source: &V::Id,
        target: &V::Id,
        kind: &str,
    ) -> Result<bool> {
        self.editor().remove_outgoing_edge(source, target, kind)
    }

    /// Attach an edge built by `build` to every vertex matching `matches`.
    pub fn add_pattern_edge(
        &mut self,
        mut matches: impl FnMut(&V) -> bool,
        mut build: impl FnMut(&V) -> Edge<V::Id>,
    ) -> Result<usize> {
        let mut edges = Vec::new();
        self.store.for_each(&mut |vertex| {
            if matches(vertex) {
                edges.push(build(vertex));
            }
        })?;
        let mut added = 0;
        for edge in edges {
            if self.add_edge(edge)? {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn remove_vertices(&mut self, mut predicate: impl FnMut(&V) -> bool) -> Result<usize> {
        let mut doomed = Vec::new();
        self.store.for_each(&mut |vertex| {
            if predicate(vertex) {
                doomed.push(vertex.id());
            }
        })?;
        let mut removed = 0;
        for id in &doomed {
            if self.remove_vertex(id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Schedule both phases for every vertex on the shard.
    pub fn recalculate_scores(&mut self) -> Result<()> {
        let mut ids = Vec::with_capacity(self.store.len());
        self.store.for_each(&mut |vertex| ids.push(vertex.id()))?;
        for id in ids {
            self.to_collect.add_vertex(id.clone());
            self.to_signal.add(id);
        }
        Ok(())
    }

    pub fn recalculate_scores_for(&mut self, id: &V::Id) {
        self.editor().recalculate_scores_for(id);
    }

    /// Explicit signal phase for BSP-style drivers: consume the whole
    /// pending set, executing each vertex's signal operation.
    pub fn signal_step(&mut self) -> Result<()> {
        self.counters.signal_steps += 1;
        for id in self.to_signal.drain() {
            self.execute_signal_of(&id)?;
        }
        Ok(())
    }

    /// Explicit collect phase: collect every buffered batch, scheduling each
    /// collected vertex for the next signal step. Returns whether the signal
    /// set is still empty, i.e. whether this shard is converged with respect
    /// to signalling.
    pub fn collect_step(&mut self) -> Result<bool> {
        self.counters.collect_steps += 1;
        for (id, uncollected) in self.to_collect.drain() {
            self.execute_collect_of(&id, uncollected)?;
            self.to_signal.add(id);
        }
        Ok(self.to_signal.is_empty())
    }

    /// Fold `extract` over every vertex on the shard. Fold order is store
    /// iteration order; `combine` must be associative and commutative for
    /// reproducible results.
    pub fn aggregate<T>(
        &mut self,
        neutral: T,
        mut combine: impl FnMut(T, T) -> T,
        mut extract: impl FnMut(&V) -> T,
    ) -> Result<T> {
        let mut values = Vec::new();
        self.store
            .for_each(&mut |vertex| values.push(extract(vertex)))?;
        Ok(values.into_iter().fold(neutral, &mut combine))
    }

    /// Run a callback against one vertex, persisting any mutation. Returns
    /// `None` when the id is not on this shard.
    pub fn for_vertex_with_id<T>(
        &mut self,
        id: &V::Id,
        f: impl FnOnce(&mut V) -> T,
    ) -> Result<Option<T>> {
        let Some(vertex) = self.store.get(id) else {
            return Ok(None);
        };
        let value = f(vertex);
        self.store.update_state(id)?;
        Ok(Some(value))
    }

    pub fn foreach_vertex(&mut self, mut f: impl FnMut(&mut V)) -> Result<()> {
        self.store.for_each(&mut f)
    }

    /// Snapshot of counters plus bus and store totals.
    pub fn statistics(&mut self) -> Result<WorkerStatistics> {
        let mut num_outgoing_edges = 0u64;
        self.store
            .for_each(&mut |vertex| num_outgoing_edges += vertex.outgoing_edge_count() as u64)?;
        Ok(self.counters.statistics(
            self.worker_id,
            self.bus.messages_sent(),
            self.store.len() as u64,
            num_outgoing_edges,
        ))
    }
}

/// Owning handle to a spawned worker: the inbox sender plus the join handle.
pub struct WorkerHandle<V: Vertex> {
    worker_id: u32,
    sender: Sender<WorkerMessage<V>>,
    join: Option<JoinHandle<Result<()>>>,
}

impl<V: Vertex> fmt::Debug for WorkerHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("worker_id", &self.worker_id)
            .finish()
    }
}

impl<V: Vertex> WorkerHandle<V> {
    pub fn worker_id(&self) -> u32 {
        self.worker_id
    }

    pub fn sender(&self) -> Sender<WorkerMessage<V>> {
        self.sender.clone()
    }

    pub fn send(&self, message: WorkerMessage<V>) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| FarolError::Disconnected("worker inbox"))
    }

    pub fn request(&self, request: WorkerRequest<V>) -> Result<()> {
        self.send(WorkerMessage::Request(request))
    }

    pub fn signal(&self, signal: Signal<V::Id, V::Payload>) -> Result<()> {
        self.send(WorkerMessage::Signal(signal))
    }

    pub fn start(&self) -> Result<()> {
        self.request(WorkerRequest::StartComputation)
    }

    pub fn pause(&self) -> Result<()> {
        self.request(WorkerRequest::PauseComputation)
    }

    /// Barrier for BSP drivers: returns once the worker has drained its
    /// pending signal set.
    pub fn signal_step(&self) -> Result<()> {
        let (ack, done) = std::sync::mpsc::channel();
        self.request(WorkerRequest::SignalStep(ack))?;
        done.recv()
            .map_err(|_| FarolError::Disconnected("signal step ack"))
    }

    /// Barrier for BSP drivers: returns whether the worker's signal set
    /// stayed empty through the collect pass.
    pub fn collect_step(&self) -> Result<bool> {
        let (reply, done) = std::sync::mpsc::channel();
        self.request(WorkerRequest::CollectStep(reply))?;
        done.recv()
            .map_err(|_| FarolError::Disconnected("collect step reply"))
    }

    /// Request shutdown and wait for the worker thread to finish.
    pub fn stop(mut self) -> Result<()> {
        self.request(WorkerRequest::Shutdown)?;
        self.join_inner()
    }

    /// Wait for the worker thread without requesting shutdown.
    pub fn join(mut self) -> Result<()> {
        self.join_inner()
    }

    fn join_inner(&mut self) -> Result<()> {
        match self.join.take() {
            Some(handle) => handle.join().map_err(|_| FarolError::WorkerPanicked)?,
            None => Ok(()),
        }
    }
}
