//! Shared index trait, result-heap helper, and the enum dispatch that lets
//! the registry hold any of the three index kinds behind one lock type.

pub mod ivf;
pub mod linear;
pub mod nsw;

use crate::error::{CoreError, CoreResult};
use crate::filter::{Filter, Metadata};
use crate::model::IndexKind;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use uuid::Uuid;

/// Operations every index kind supports. Mirrors the ANN index contract this
/// crate's teacher exposes (add/build/search plus dimension/size accessors),
/// extended with the incremental `update`/`delete` the spec requires.
pub trait VectorIndex {
    fn add(&mut self, id: Uuid, vector: Vec<f32>, metadata: Metadata) -> CoreResult<()>;
    fn build(&mut self) -> CoreResult<()>;
    fn search(&self, query: &[f32], k: usize, filter: Option<&Filter>) -> CoreResult<Vec<(Uuid, f32)>>;
    fn update(&mut self, id: Uuid, vector: Vec<f32>, metadata: Metadata) -> CoreResult<()>;
    /// Returns whether `id` existed. Delete is idempotent: removing an
    /// already-absent id is not an error, just a `false` result.
    fn delete(&mut self, id: Uuid) -> CoreResult<bool>;
    fn dimension(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single index instance, dispatched by kind. Held behind one
/// `parking_lot::RwLock` per library by the registry.
pub enum IndexHandle {
    Linear(linear::LinearIndex),
    Ivf(ivf::IvfIndex),
    Nsw(nsw::NswIndex),
}

impl IndexHandle {
    pub fn new(kind: IndexKind, dimension: usize, params: &Metadata) -> Self {
        match kind {
            IndexKind::Linear => IndexHandle::Linear(linear::LinearIndex::new(dimension, params)),
            IndexKind::Ivf => IndexHandle::Ivf(ivf::IvfIndex::new(dimension, params)),
            IndexKind::Nsw => IndexHandle::Nsw(nsw::NswIndex::new(dimension, params)),
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            IndexHandle::Linear(_) => IndexKind::Linear,
            IndexHandle::Ivf(_) => IndexKind::Ivf,
            IndexHandle::Nsw(_) => IndexKind::Nsw,
        }
    }
}

impl VectorIndex for IndexHandle {
    fn add(&mut self, id: Uuid, vector: Vec<f32>, metadata: Metadata) -> CoreResult<()> {
        match self {
            IndexHandle::Linear(i) => i.add(id, vector, metadata),
            IndexHandle::Ivf(i) => i.add(id, vector, metadata),
            IndexHandle::Nsw(i) => i.add(id, vector, metadata),
        }
    }

    fn build(&mut self) -> CoreResult<()> {
        match self {
            IndexHandle::Linear(i) => i.build(),
            IndexHandle::Ivf(i) => i.build(),
            IndexHandle::Nsw(i) => i.build(),
        }
    }

    fn search(&self, query: &[f32], k: usize, filter: Option<&Filter>) -> CoreResult<Vec<(Uuid, f32)>> {
        match self {
            IndexHandle::Linear(i) => i.search(query, k, filter),
            IndexHandle::Ivf(i) => i.search(query, k, filter),
            IndexHandle::Nsw(i) => i.search(query, k, filter),
        }
    }

    fn update(&mut self, id: Uuid, vector: Vec<f32>, metadata: Metadata) -> CoreResult<()> {
        match self {
            IndexHandle::Linear(i) => i.update(id, vector, metadata),
            IndexHandle::Ivf(i) => i.update(id, vector, metadata),
            IndexHandle::Nsw(i) => i.update(id, vector, metadata),
        }
    }

    fn delete(&mut self, id: Uuid) -> CoreResult<bool> {
        match self {
            IndexHandle::Linear(i) => i.delete(id),
            IndexHandle::Ivf(i) => i.delete(id),
            IndexHandle::Nsw(i) => i.delete(id),
        }
    }

    fn dimension(&self) -> usize {
        match self {
            IndexHandle::Linear(i) => i.dimension(),
            IndexHandle::Ivf(i) => i.dimension(),
            IndexHandle::Nsw(i) => i.dimension(),
        }
    }

    fn len(&self) -> usize {
        match self {
            IndexHandle::Linear(i) => i.len(),
            IndexHandle::Ivf(i) => i.len(),
            IndexHandle::Nsw(i) => i.len(),
        }
    }
}

/// A scored candidate ordered by similarity so a `BinaryHeap` can be used as
/// a bounded min-heap (kept smallest-similarity-on-top, popped when a better
/// candidate arrives) to collect the top-k without sorting the whole set.
#[derive(Clone, Debug)]
pub(crate) struct ScoredId {
    pub id: Uuid,
    pub score: f32,
}

impl PartialEq for ScoredId {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}
impl Eq for ScoredId {}

impl PartialOrd for ScoredId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so the heap pops the *lowest* score first, letting us evict
        // the weakest candidate once the heap exceeds capacity.
        other.score.partial_cmp(&self.score).unwrap_or(Ordering::Equal)
    }
}

/// Maintains a bounded top-k set by similarity using a min-heap of capacity
/// `k`: the heap's top is always the current weakest survivor.
pub(crate) fn push_bounded(heap: &mut BinaryHeap<ScoredId>, k: usize, id: Uuid, score: f32) {
    if k == 0 {
        return;
    }
    if heap.len() < k {
        heap.push(ScoredId { id, score });
    } else if let Some(worst) = heap.peek() {
        if score > worst.score {
            heap.pop();
            heap.push(ScoredId { id, score });
        }
    }
}

/// Drains a bounded heap into a descending-by-score vector.
pub(crate) fn heap_into_sorted_vec(heap: BinaryHeap<ScoredId>) -> Vec<(Uuid, f32)> {
    let mut v: Vec<(Uuid, f32)> = heap.into_iter().map(|s| (s.id, s.score)).collect();
    v.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    v
}

pub(crate) fn validate_dimension(actual: usize, expected: usize) -> CoreResult<()> {
    if actual != expected {
        return Err(CoreError::Validation(format!(
            "vector has dimension {actual}, index expects {expected}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn bounded_heap_is_sorted_descending_and_within_k(
            scores in prop::collection::vec(-100.0f32..100.0, 0..50),
            k in 1usize..20,
        ) {
            let mut heap: BinaryHeap<ScoredId> = BinaryHeap::new();
            for score in &scores {
                push_bounded(&mut heap, k, Uuid::new_v4(), *score);
            }
            let sorted = heap_into_sorted_vec(heap);
            prop_assert!(sorted.len() <= k);
            prop_assert!(sorted.len() <= scores.len());
            for pair in sorted.windows(2) {
                prop_assert!(pair[0].1 >= pair[1].1);
            }
        }
    }
}
