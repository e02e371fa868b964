use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use crate::vertex::Vertex;
use crate::worker::WorkerMessage;

/// Outcome of one inbox poll.
pub enum Poll<V: Vertex> {
    Message(WorkerMessage<V>),
    Empty,
    /// Every sender is gone; the worker treats this as shutdown.
    Closed,
}

/// Single-consumer blocking inbox, FIFO. The only blocking point of the
/// worker is `poll`/`next_blocking`, reached when the worker is converged
/// or paused.
pub struct MessageInbox<V: Vertex> {
    receiver: Receiver<WorkerMessage<V>>,
}

impl<V: Vertex> MessageInbox<V> {
    pub fn channel() -> (Sender<WorkerMessage<V>>, Self) {
        let (sender, receiver) = mpsc::channel();
        (sender, Self { receiver })
    }

    pub fn try_next(&self) -> Poll<V> {
        match self.receiver.try_recv() {
            Ok(message) => Poll::Message(message),
            Err(TryRecvError::Empty) => Poll::Empty,
            Err(TryRecvError::Disconnected) => Poll::Closed,
        }
    }

    pub fn poll(&self, timeout: Duration) -> Poll<V> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Poll::Message(message),
            Err(RecvTimeoutError::Timeout) => Poll::Empty,
            Err(RecvTimeoutError::Disconnected) => Poll::Closed,
        }
    }

    pub fn next_blocking(&self) -> Poll<V> {
        match self.receiver.recv() {
            Ok(message) => Poll::Message(message),
            Err(_) => Poll::Closed,
        }
    }
}
