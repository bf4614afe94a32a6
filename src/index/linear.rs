//! Exhaustive linear-scan index: exact, no build step required.

use super::{heap_into_sorted_vec, push_bounded, validate_dimension, ScoredId};
use crate::config::LinearConfig;
use crate::error::{CoreError, CoreResult};
use crate::filter::{self, Filter, Metadata};
use crate::similarity::cosine;
use std::collections::{BinaryHeap, HashMap};
use uuid::Uuid;

struct Entry {
    vector: Vec<f32>,
    metadata: Metadata,
}

pub struct LinearIndex {
    dimension: usize,
    config: LinearConfig,
    entries: HashMap<Uuid, Entry>,
}

impl LinearIndex {
    pub fn new(dimension: usize, params: &Metadata) -> Self {
        let mut config = LinearConfig::default();
        if let Some(m) = params.get("multiplier").and_then(|v| v.as_u64()) {
            config.multiplier = m as usize;
        }
        Self {
            dimension,
            config,
            entries: HashMap::new(),
        }
    }

    fn add_or_update(&mut self, id: Uuid, vector: Vec<f32>, metadata: Metadata) -> CoreResult<()> {
        validate_dimension(vector.len(), self.dimension)?;
        self.entries.insert(id, Entry { vector, metadata });
        Ok(())
    }
}

impl super::VectorIndex for LinearIndex {
    fn add(&mut self, id: Uuid, vector: Vec<f32>, metadata: Metadata) -> CoreResult<()> {
        self.add_or_update(id, vector, metadata)
    }

    /// No build step: every insert is immediately searchable.
    fn build(&mut self) -> CoreResult<()> {
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize, filter: Option<&Filter>) -> CoreResult<Vec<(Uuid, f32)>> {
        validate_dimension(query.len(), self.dimension)?;

        let fetch_count = if filter.is_some() { k * self.config.multiplier } else { k };
        let mut heap: BinaryHeap<ScoredId> = BinaryHeap::new();
        for (id, entry) in self.entries.iter() {
            let score = cosine(query, &entry.vector);
            push_bounded(&mut heap, fetch_count, *id, score);
        }

        let mut candidates = heap_into_sorted_vec(heap);
        candidates.retain(|(id, _)| {
            self.entries
                .get(id)
                .map(|e| filter::matches(filter, &e.metadata))
                .unwrap_or(false)
        });
        candidates.truncate(k);
        Ok(candidates)
    }

    fn update(&mut self, id: Uuid, vector: Vec<f32>, metadata: Metadata) -> CoreResult<()> {
        if !self.entries.contains_key(&id) {
            return Err(CoreError::NotFound(format!("vector {id} not found in linear index")));
        }
        self.add_or_update(id, vector, metadata)
    }

    fn delete(&mut self, id: Uuid) -> CoreResult<bool> {
        Ok(self.entries.remove(&id).is_some())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::VectorIndex;
    use serde_json::json;

    #[test]
    fn returns_top_1_exact_match() {
        let mut idx = LinearIndex::new(2, &Metadata::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        idx.add(a, vec![1.0, 0.0], Metadata::new()).unwrap();
        idx.add(b, vec![0.0, 1.0], Metadata::new()).unwrap();

        let results = idx.search(&[1.0, 0.0], 1, None).unwrap();
        assert_eq!(results[0].0, a);
    }

    #[test]
    fn filter_excludes_non_matching_metadata() {
        let mut idx = LinearIndex::new(2, &Metadata::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut meta_a = Metadata::new();
        meta_a.insert("lang".into(), json!("en"));
        let mut meta_b = Metadata::new();
        meta_b.insert("lang".into(), json!("fr"));
        idx.add(a, vec![1.0, 0.0], meta_a).unwrap();
        idx.add(b, vec![0.9, 0.1], meta_b).unwrap();

        let mut filter: Filter = Filter::new();
        filter.insert("lang".into(), crate::filter::FieldFilter::Eq(json!("fr")));
        let results = idx.search(&[1.0, 0.0], 1, Some(&filter)).unwrap();
        assert_eq!(results[0].0, b);
    }

    #[test]
    fn multiplier_param_overrides_default() {
        let params: Metadata = [("multiplier".to_string(), json!(10))].into_iter().collect();
        let idx = LinearIndex::new(2, &params);
        assert_eq!(idx.config.multiplier, 10);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut idx = LinearIndex::new(2, &Metadata::new());
        let a = Uuid::new_v4();
        idx.add(a, vec![1.0, 0.0], Metadata::new()).unwrap();
        assert!(idx.delete(a).unwrap());
        assert!(!idx.delete(a).unwrap());
        assert_eq!(idx.len(), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn delete_is_idempotent_for_any_vector(x in -10.0f32..10.0, y in -10.0f32..10.0) {
                let mut idx = LinearIndex::new(2, &Metadata::new());
                let id = Uuid::new_v4();
                idx.add(id, vec![x, y], Metadata::new()).unwrap();
                let first = idx.delete(id).unwrap();
                let second = idx.delete(id).unwrap();
                prop_assert!(first);
                prop_assert!(!second);
                prop_assert_eq!(idx.len(), 0);
            }
        }
    }
}
