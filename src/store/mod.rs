mod pending;

pub use pending::{CollectMap, SignalSet};

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::error::Result;
use crate::vertex::Vertex;

/// Storage seam for a worker's vertex shard.
///
/// The store exclusively owns its vertices for the worker's lifetime.
/// Mutations made through a handle returned by `get` become durable only
/// once `update_state` is called for that id; implementations that keep
/// out-of-process copies persist the entry there.
pub trait VertexStore<V: Vertex>: Send {
    fn get(&mut self, id: &V::Id) -> Option<&mut V>;

    fn contains(&self, id: &V::Id) -> bool;

    /// Returns false and leaves the store untouched when the id is already
    /// present.
    fn insert(&mut self, vertex: V) -> Result<bool>;

    fn remove(&mut self, id: &V::Id) -> Result<bool>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn for_each(&mut self, f: &mut dyn FnMut(&mut V)) -> Result<()>;

    /// Write-back hook for the entry with the given id.
    fn update_state(&mut self, id: &V::Id) -> Result<()>;

    /// Releases storage resources; invoked once when the worker shuts down.
    fn cleanup(&mut self) -> Result<()>;
}

/// Heap-resident store; the default for a worker shard.
pub struct InMemoryStore<V: Vertex> {
    vertices: HashMap<V::Id, V>,
}

impl<V: Vertex> InMemoryStore<V> {
    pub fn new() -> Self {
        Self {
            vertices: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: HashMap::with_capacity(capacity),
        }
    }
}

impl<V: Vertex> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Vertex> VertexStore<V> for InMemoryStore<V> {
    fn get(&mut self, id: &V::Id) -> Option<&mut V> {
        self.vertices.get_mut(id)
    }

    fn contains(&self, id: &V::Id) -> bool {
        self.vertices.contains_key(id)
    }

    fn insert(&mut self, vertex: V) -> Result<bool> {
        match self.vertices.entry(vertex.id()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(vertex);
                Ok(true)
            }
        }
    }

    fn remove(&mut self, id: &V::Id) -> Result<bool> {
        Ok(self.vertices.remove(id).is_some())
    }

    fn len(&self) -> usize {
        self.vertices.len()
    }

    fn for_each(&mut self, f: &mut dyn FnMut(&mut V)) -> Result<()> {
        for vertex in self.vertices.values_mut() {
            f(vertex);
        }
        Ok(())
    }

    fn update_state(&mut self, _id: &V::Id) -> Result<()> {
        // entries are mutated in place; the map already holds the canonical copy
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.vertices.clear();
        Ok(())
    }
}
