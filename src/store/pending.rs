use std::collections::{HashMap, HashSet};

use crate::model::{Signal, SignalPayload, VertexId};

/// Ids awaiting a signal operation. No ordering guarantee.
///
/// `drain` implements consume-on-visit iteration: the whole set is handed
/// out as a snapshot and cleared in one step, so ids added while the
/// snapshot is processed land in the next round.
#[derive(Debug, Clone)]
pub struct SignalSet<Id> {
    ids: HashSet<Id>,
}

impl<Id: VertexId> SignalSet<Id> {
    pub fn new() -> Self {
        Self {
            ids: HashSet::new(),
        }
    }

    pub fn add(&mut self, id: Id) -> bool {
        self.ids.insert(id)
    }

    pub fn remove(&mut self, id: &Id) -> bool {
        self.ids.remove(id)
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn drain(&mut self) -> Vec<Id> {
        self.ids.drain().collect()
    }
}

impl<Id: VertexId> Default for SignalSet<Id> {
    fn default() -> Self {
        Self::new()
    }
}

/// Undelivered signals buffered per target vertex, awaiting a collect
/// operation. An entry with an empty batch means "re-run collect with no
/// new signals". Arrival order is preserved per target.
#[derive(Debug, Clone)]
pub struct CollectMap<Id, P> {
    entries: HashMap<Id, Vec<Signal<Id, P>>>,
}

impl<Id: VertexId, P: SignalPayload> CollectMap<Id, P> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn add_vertex(&mut self, id: Id) {
        self.entries.entry(id).or_default();
    }

    pub fn add_signal(&mut self, signal: Signal<Id, P>) {
        self.entries
            .entry(signal.target.clone())
            .or_default()
            .push(signal);
    }

    pub fn remove(&mut self, id: &Id) -> Option<Vec<Signal<Id, P>>> {
        self.entries.remove(id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.entries.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn drain(&mut self) -> Vec<(Id, Vec<Signal<Id, P>>)> {
        self.entries.drain().collect()
    }
}

impl<Id: VertexId, P: SignalPayload> Default for CollectMap<Id, P> {
    fn default() -> Self {
        Self::new()
    }
}
