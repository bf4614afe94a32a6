//! IVF (inverted file) index: k-means-partitioned approximate search.
//!
//! Newly added vectors land in `pending` and are only folded into clusters
//! on the next `build()`. Search always covers `pending` in full, plus
//! however many ranked clusters are needed to satisfy `fetch_count` and the
//! probe budget — both conditions must hold before the cluster walk stops,
//! otherwise a search can return fewer true nearest neighbors than intended
//! when clusters are small.

use super::{heap_into_sorted_vec, push_bounded, validate_dimension, ScoredId};
use crate::config::IvfConfig;
use crate::error::{CoreError, CoreResult};
use crate::filter::{self, Filter, Metadata};
use crate::kmeans::KMeans;
use crate::similarity::cosine;
use std::collections::{BinaryHeap, HashMap, HashSet};
use uuid::Uuid;

struct Entry {
    vector: Vec<f32>,
    metadata: Metadata,
}

pub struct IvfIndex {
    dimension: usize,
    config: IvfConfig,
    explicit_n_clusters: Option<usize>,
    explicit_n_probes: Option<usize>,

    chunks: HashMap<Uuid, Entry>,
    pending: HashMap<Uuid, Entry>,

    centroids: Vec<Vec<f32>>,
    cluster_members: Vec<HashSet<Uuid>>,
    computed_n_probes: Option<usize>,
}

impl IvfIndex {
    pub fn new(dimension: usize, params: &Metadata) -> Self {
        let explicit_n_clusters = params
            .get("n_clusters")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize);
        let explicit_n_probes = params
            .get("n_probes")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize);

        let mut config = IvfConfig::default();
        if let Some(r) = params.get("cluster_ratio").and_then(|v| v.as_f64()) {
            config.cluster_ratio = r.max(0.0) as f32;
        }
        if let Some(r) = params.get("probe_ratio").and_then(|v| v.as_f64()) {
            config.probe_ratio = r.max(0.0) as f32;
        }
        if let Some(m) = params.get("multiplier").and_then(|v| v.as_u64()) {
            config.multiplier = m as usize;
        }

        Self {
            dimension,
            config,
            explicit_n_clusters,
            explicit_n_probes,
            chunks: HashMap::new(),
            pending: HashMap::new(),
            centroids: Vec::new(),
            cluster_members: Vec::new(),
            computed_n_probes: None,
        }
    }

    fn brute_force(&self, search_space: &HashMap<Uuid, &Entry>, query: &[f32], k: usize, filter: Option<&Filter>) -> Vec<(Uuid, f32)> {
        let mut heap: BinaryHeap<ScoredId> = BinaryHeap::new();
        for (id, entry) in search_space.iter() {
            let score = cosine(query, &entry.vector);
            push_bounded(&mut heap, k, *id, score);
        }
        let mut results = heap_into_sorted_vec(heap);
        results.retain(|(id, _)| {
            search_space
                .get(id)
                .map(|e| filter::matches(filter, &e.metadata))
                .unwrap_or(false)
        });
        results.truncate(k);
        results
    }
}

impl super::VectorIndex for IvfIndex {
    fn add(&mut self, id: Uuid, vector: Vec<f32>, metadata: Metadata) -> CoreResult<()> {
        validate_dimension(vector.len(), self.dimension)?;
        self.pending.insert(id, Entry { vector, metadata });
        Ok(())
    }

    fn build(&mut self) -> CoreResult<()> {
        if !self.pending.is_empty() {
            self.chunks.extend(self.pending.drain());
        }

        if self.chunks.is_empty() {
            self.centroids.clear();
            self.cluster_members.clear();
            return Ok(());
        }

        let ids: Vec<Uuid> = self.chunks.keys().copied().collect();
        let vectors: Vec<Vec<f32>> = ids.iter().map(|id| self.chunks[id].vector.clone()).collect();
        let n_points = vectors.len();

        let effective_k = self
            .explicit_n_clusters
            .unwrap_or_else(|| ((n_points as f32 * self.config.cluster_ratio).round() as usize).max(1));
        let effective_k = effective_k.max(1).min(n_points);

        let mut kmeans = KMeans::new(self.dimension, effective_k, 50, 1e-4);
        let labels = kmeans.fit(&vectors);
        let centroids = kmeans.centroids().to_vec();

        if centroids.is_empty() {
            self.centroids.clear();
            self.cluster_members.clear();
            return Ok(());
        }

        let k = centroids.len();
        let mut cluster_members = vec![HashSet::new(); k];
        for (id, label) in ids.iter().zip(labels.iter()) {
            if *label < k {
                cluster_members[*label].insert(*id);
            }
        }

        self.centroids = centroids;
        self.cluster_members = cluster_members;

        let probes = self.explicit_n_probes.unwrap_or_else(|| {
            ((self.centroids.len() as f32 * self.config.probe_ratio).round() as usize).max(1)
        });
        self.computed_n_probes = Some(probes.max(1).min(self.centroids.len()));
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize, filter: Option<&Filter>) -> CoreResult<Vec<(Uuid, f32)>> {
        validate_dimension(query.len(), self.dimension)?;
        let fetch_count = if filter.is_some() { k * self.config.multiplier } else { k };

        if self.centroids.is_empty() {
            let search_space: HashMap<Uuid, &Entry> = self
                .chunks
                .iter()
                .chain(self.pending.iter())
                .map(|(id, e)| (*id, e))
                .collect();
            let results = self.brute_force(&search_space, query, fetch_count, filter);
            return Ok(results.into_iter().take(k).collect());
        }

        let total_clusters = self.centroids.len();
        let probes = match self.computed_n_probes {
            Some(p) if p > 0 => p.max(1).min(total_clusters),
            _ => ((total_clusters as f32 * self.config.probe_ratio).round() as usize)
                .max(1)
                .min(total_clusters),
        };

        let mut ranked: Vec<(f32, usize)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(idx, c)| (cosine(c, query), idx))
            .collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());

        let mut search_space: HashMap<Uuid, &Entry> =
            self.pending.iter().map(|(id, e)| (*id, e)).collect();

        for (rank, &(_, idx)) in ranked.iter().enumerate() {
            if let Some(members) = self.cluster_members.get(idx) {
                for cid in members {
                    if let Some(entry) = self.chunks.get(cid) {
                        search_space.insert(*cid, entry);
                    }
                }
            }
            if search_space.len() >= fetch_count && rank + 1 >= probes {
                break;
            }
        }

        let results = self.brute_force(&search_space, query, fetch_count, filter);
        Ok(results.into_iter().take(k).collect())
    }

    fn update(&mut self, id: Uuid, vector: Vec<f32>, metadata: Metadata) -> CoreResult<()> {
        validate_dimension(vector.len(), self.dimension)?;
        if !self.chunks.contains_key(&id) && !self.pending.contains_key(&id) {
            return Err(CoreError::NotFound(format!(
                "vector {id} not found in ivf index"
            )));
        }
        if self.chunks.remove(&id).is_some() {
            for members in self.cluster_members.iter_mut() {
                members.remove(&id);
            }
        }
        self.pending.insert(id, Entry { vector, metadata });
        Ok(())
    }

    fn delete(&mut self, id: Uuid) -> CoreResult<bool> {
        let mut existed = self.pending.remove(&id).is_some();
        if self.chunks.remove(&id).is_some() {
            existed = true;
            for members in self.cluster_members.iter_mut() {
                members.remove(&id);
            }
        }
        Ok(existed)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.chunks.len() + self.pending.len()
    }
}
