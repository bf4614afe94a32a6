//! NSW (navigable small world) index: a flat, incrementally-maintained graph
//! searched by beam search. Unlike the teacher's batch-only NSW
//! (`dense/nsw/graph.rs`, which rejects `add()` once `build()` has run),
//! this index supports incremental insert/update/delete with neighbor
//! repair, since chunks can arrive, change, and disappear after the library
//! is created.

use crate::config::NswConfig;
use crate::error::CoreResult;
use crate::filter::{self, Filter, Metadata};
use crate::similarity::cosine;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use uuid::Uuid;

struct Entry {
    vector: Vec<f32>,
    metadata: Metadata,
}

/// Beam-search candidate, ordered so a max-heap pops the highest similarity first.
#[derive(Clone, Copy)]
struct MaxCand {
    sim: f32,
    id: Uuid,
}
impl PartialEq for MaxCand {
    fn eq(&self, other: &Self) -> bool {
        self.sim == other.sim
    }
}
impl Eq for MaxCand {}
impl PartialOrd for MaxCand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for MaxCand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sim.partial_cmp(&other.sim).unwrap_or(Ordering::Equal)
    }
}

/// Beam-search result slot, ordered so a min-heap pops the lowest similarity
/// first — that's the one evicted once `results` exceeds `ef`.
#[derive(Clone, Copy)]
struct MinCand {
    sim: f32,
    id: Uuid,
}
impl PartialEq for MinCand {
    fn eq(&self, other: &Self) -> bool {
        self.sim == other.sim
    }
}
impl Eq for MinCand {}
impl PartialOrd for MinCand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for MinCand {
    fn cmp(&self, other: &Self) -> Ordering {
        other.sim.partial_cmp(&self.sim).unwrap_or(Ordering::Equal)
    }
}

pub struct NswIndex {
    dimension: usize,
    config: NswConfig,
    entries: HashMap<Uuid, Entry>,
    graph: HashMap<Uuid, HashSet<Uuid>>,
    entry_point: Option<Uuid>,
}

impl NswIndex {
    pub fn new(dimension: usize, params: &Metadata) -> Self {
        let mut config = NswConfig::default();
        if let Some(m) = params.get("M").and_then(|v| v.as_u64()) {
            config.m = (m as usize).max(1);
        }
        if let Some(v) = params.get("efConstruction").and_then(|v| v.as_u64()) {
            config.ef_construction = (v as usize).max(1);
        }
        if let Some(v) = params.get("efSearch").and_then(|v| v.as_u64()) {
            config.ef_search = (v as usize).max(1);
        }
        if let Some(v) = params.get("multiplier").and_then(|v| v.as_u64()) {
            config.multiplier = v as usize;
        }
        Self {
            dimension,
            config,
            entries: HashMap::new(),
            graph: HashMap::new(),
            entry_point: None,
        }
    }

    /// Beam search from `start_ids`, returning up to `ef` results sorted by
    /// descending similarity. Each visited node is pushed into `results`
    /// exactly once, at the moment it's popped from `candidates` and marked
    /// visited — never again when it's re-discovered as someone else's
    /// neighbor.
    fn beam_search(&self, query: &[f32], ef: usize, start_ids: &[Uuid]) -> Vec<(Uuid, f32)> {
        if start_ids.is_empty() {
            return Vec::new();
        }

        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut candidates: BinaryHeap<MaxCand> = BinaryHeap::new();
        let mut candidates_set: HashSet<Uuid> = HashSet::new();
        let mut results: BinaryHeap<MinCand> = BinaryHeap::new();

        for &sid in start_ids {
            if let Some(e) = self.entries.get(&sid) {
                let sim = cosine(&e.vector, query);
                candidates.push(MaxCand { sim, id: sid });
                candidates_set.insert(sid);
            }
        }

        while let Some(MaxCand { sim: current_sim, id: node_id }) = candidates.pop() {
            candidates_set.remove(&node_id);
            if visited.contains(&node_id) {
                continue;
            }
            visited.insert(node_id);

            results.push(MinCand { sim: current_sim, id: node_id });
            if results.len() > ef {
                results.pop();
            }

            if results.len() >= ef {
                if let Some(worst) = results.peek() {
                    if current_sim < worst.sim {
                        break;
                    }
                }
            }

            if let Some(neighbors) = self.graph.get(&node_id) {
                for &neighbor in neighbors {
                    if visited.contains(&neighbor) || candidates_set.contains(&neighbor) {
                        continue;
                    }
                    if let Some(e) = self.entries.get(&neighbor) {
                        let sim = cosine(&e.vector, query);
                        candidates.push(MaxCand { sim, id: neighbor });
                        candidates_set.insert(neighbor);
                    }
                }
            }
        }

        let mut out: Vec<(Uuid, f32)> = results.into_iter().map(|c| (c.id, c.sim)).collect();
        out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        out
    }

    fn select_neighbors(&self, ranked: &[(Uuid, f32)], exclude: Uuid) -> Vec<Uuid> {
        ranked
            .iter()
            .filter(|(id, _)| *id != exclude)
            .map(|(id, _)| *id)
            .take(self.config.m)
            .collect()
    }

    fn connect(&mut self, id: Uuid, neighbors: &[Uuid]) {
        self.graph.entry(id).or_insert_with(HashSet::new);
        for &nid in neighbors {
            self.graph.entry(nid).or_insert_with(HashSet::new);
            self.graph.get_mut(&id).unwrap().insert(nid);
            self.graph.get_mut(&nid).unwrap().insert(id);
        }
    }

    /// Detaches every edge of `node`, clears its own adjacency set, then
    /// re-inserts it into the graph via beam search from the entry point.
    fn reinsert(&mut self, node: Uuid) {
        if let Some(neighbors) = self.graph.get(&node).cloned() {
            for nbr in neighbors {
                if let Some(set) = self.graph.get_mut(&nbr) {
                    set.remove(&node);
                }
            }
        }
        self.graph.insert(node, HashSet::new());

        let entry = match self.entry_point {
            Some(e) => e,
            None => {
                self.entry_point = Some(node);
                return;
            }
        };
        let vector = self.entries[&node].vector.clone();
        let ranked = self.beam_search(&vector, self.config.ef_construction, &[entry]);
        let selected = self.select_neighbors(&ranked, node);
        self.connect(node, &selected);
    }
}

impl super::VectorIndex for NswIndex {
    fn add(&mut self, id: Uuid, vector: Vec<f32>, metadata: Metadata) -> CoreResult<()> {
        super::validate_dimension(vector.len(), self.dimension)?;
        self.entries.insert(id, Entry { vector: vector.clone(), metadata });

        if self.entry_point.is_none() {
            self.graph.insert(id, HashSet::new());
            self.entry_point = Some(id);
            return Ok(());
        }

        let entry = self.entry_point.unwrap();
        let ranked = self.beam_search(&vector, self.config.ef_construction, &[entry]);
        let selected = self.select_neighbors(&ranked, id);
        self.graph.entry(id).or_insert_with(HashSet::new);
        self.connect(id, &selected);
        Ok(())
    }

    /// No separate build step: the graph is maintained incrementally.
    fn build(&mut self) -> CoreResult<()> {
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize, filter: Option<&Filter>) -> CoreResult<Vec<(Uuid, f32)>> {
        super::validate_dimension(query.len(), self.dimension)?;
        let entry = match self.entry_point {
            Some(e) => e,
            None => return Ok(Vec::new()),
        };

        let fetch_count = if filter.is_some() { k * self.config.multiplier } else { k };
        let ef = self.config.ef_search.max(fetch_count);
        let ranked = self.beam_search(query, ef, &[entry]);

        let mut results = Vec::new();
        for (id, sim) in ranked {
            let matched = self
                .entries
                .get(&id)
                .map(|e| filter::matches(filter, &e.metadata))
                .unwrap_or(false);
            if matched {
                results.push((id, sim));
            }
            if results.len() >= k {
                break;
            }
        }
        Ok(results)
    }

    fn update(&mut self, id: Uuid, vector: Vec<f32>, metadata: Metadata) -> CoreResult<()> {
        super::validate_dimension(vector.len(), self.dimension)?;
        if !self.entries.contains_key(&id) {
            return Err(crate::error::CoreError::NotFound(format!(
                "vector {id} not found in nsw index"
            )));
        }
        self.entries.insert(id, Entry { vector, metadata });
        self.reinsert(id);
        Ok(())
    }

    fn delete(&mut self, id: Uuid) -> CoreResult<bool> {
        if self.entries.remove(&id).is_none() {
            return Ok(false);
        }

        let neighbors: HashSet<Uuid> = self.graph.get(&id).cloned().unwrap_or_default();
        for nbr in &neighbors {
            if let Some(set) = self.graph.get_mut(nbr) {
                set.remove(&id);
            }
        }
        self.graph.remove(&id);

        if self.entry_point == Some(id) {
            self.entry_point = self.entries.keys().next().copied();
        }

        if self.entries.is_empty() || self.entry_point.is_none() {
            return Ok(true);
        }

        // Repair every former neighbor: detach it fully, then reinsert via
        // beam search so the graph stays connected and navigable.
        for u in neighbors {
            if !self.entries.contains_key(&u) {
                continue;
            }
            self.reinsert(u);
        }
        Ok(true)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
