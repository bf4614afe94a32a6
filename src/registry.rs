//! Index registry: one index instance per library, looked up by library id.
//!
//! Locking discipline: the registry's own map lock is always acquired and
//! released before touching a specific index's lock, and never the other way
//! around — a caller holding an index lock must never try to re-enter the
//! registry. This keeps index-vs-index deadlocks impossible, since every
//! code path takes locks in the same global order (registry, then index).

use crate::error::{CoreError, CoreResult};
use crate::filter::{Filter, Metadata};
use crate::index::{IndexHandle, VectorIndex};
use crate::model::IndexKind;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub type IndexRef = Arc<RwLock<IndexHandle>>;

#[derive(Default)]
pub struct IndexRegistry {
    indexes: RwLock<HashMap<Uuid, IndexRef>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, library_id: Uuid, kind: IndexKind, dimension: usize, params: &Metadata) -> CoreResult<IndexRef> {
        let mut indexes = self.indexes.write();
        if indexes.contains_key(&library_id) {
            return Err(CoreError::AlreadyExists(format!(
                "index already exists for library {library_id}"
            )));
        }
        let handle = Arc::new(RwLock::new(IndexHandle::new(kind, dimension, params)));
        indexes.insert(library_id, handle.clone());
        Ok(handle)
    }

    pub fn get(&self, library_id: Uuid) -> Option<IndexRef> {
        self.indexes.read().get(&library_id).cloned()
    }

    pub fn require(&self, library_id: Uuid) -> CoreResult<IndexRef> {
        self.get(library_id)
            .ok_or_else(|| CoreError::Index(format!("no index for library {library_id}")))
    }

    pub fn delete(&self, library_id: Uuid) -> bool {
        self.indexes.write().remove(&library_id).is_some()
    }

    pub fn build(&self, library_id: Uuid) -> CoreResult<()> {
        let handle = self.require(library_id)?;
        let result = handle.write().build();
        result
    }

    pub fn search(&self, library_id: Uuid, query: &[f32], k: usize, filter: Option<&Filter>) -> CoreResult<Vec<(Uuid, f32)>> {
        let handle = self.require(library_id)?;
        let guard = handle.read();
        guard.search(query, k, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_twice_for_same_library_fails() {
        let reg = IndexRegistry::new();
        let lib = Uuid::new_v4();
        reg.create(lib, IndexKind::Linear, 3, &Metadata::new()).unwrap();
        let err = reg.create(lib, IndexKind::Linear, 3, &Metadata::new());
        assert!(matches!(err, Err(CoreError::AlreadyExists(_))));
    }

    #[test]
    fn search_against_absent_index_is_an_index_error() {
        let reg = IndexRegistry::new();
        let lib = Uuid::new_v4();
        let err = reg.search(lib, &[1.0], 1, None);
        assert!(matches!(err, Err(CoreError::Index(_))));
    }

    #[test]
    fn delete_then_get_returns_none() {
        let reg = IndexRegistry::new();
        let lib = Uuid::new_v4();
        reg.create(lib, IndexKind::Linear, 3, &Metadata::new()).unwrap();
        assert!(reg.delete(lib));
        assert!(reg.get(lib).is_none());
        assert!(!reg.delete(lib));
    }
}
