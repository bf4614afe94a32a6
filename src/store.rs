//! In-memory, thread-safe keyed store standing in for the external
//! persistence layer this crate assumes: chunk/document/library records are
//! owned by a caller-supplied backing store in production; here they live in
//! a `parking_lot::RwLock<HashMap<..>>` so the orchestration layer and its
//! tests have something concrete to call.

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

pub struct Store<T: Clone> {
    records: RwLock<HashMap<Uuid, T>>,
}

impl<T: Clone> Default for Store<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Clone> Store<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: Uuid, value: T) {
        self.records.write().insert(id, value);
    }

    /// Returns a deep (cloned) copy so callers can't mutate store-owned state
    /// through a borrowed reference.
    pub fn get(&self, id: Uuid) -> Option<T> {
        self.records.read().get(&id).cloned()
    }

    pub fn remove(&self, id: Uuid) -> Option<T> {
        self.records.write().remove(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.records.read().contains_key(&id)
    }

    pub fn list_ids(&self) -> Vec<Uuid> {
        self.records.read().keys().copied().collect()
    }

    /// Applies `f` to the stored value under the write lock, returning `true`
    /// if the id was present.
    pub fn mutate(&self, id: Uuid, f: impl FnOnce(&mut T)) -> bool {
        let mut guard = self.records.write();
        match guard.get_mut(&id) {
            Some(v) => {
                f(v);
                true
            }
            None => false,
        }
    }
}
