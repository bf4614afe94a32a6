//! Per-index default hyperparameters.
//!
//! Mirrors the defaults in the original implementation's config module
//! rather than the teacher's (the teacher tunes HNSW/IVF-PQ for million-scale
//! static corpora; this crate's indexes are smaller and mutable).

#[derive(Clone, Copy, Debug)]
pub struct LinearConfig {
    /// When a filter is present, fetch `k * multiplier` candidates before
    /// filtering so that filtered-out candidates don't starve the result set.
    pub multiplier: usize,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self { multiplier: 3 }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct IvfConfig {
    /// Fraction of indexed points used as the initial cluster count.
    pub cluster_ratio: f32,
    /// Fraction of clusters probed per search.
    pub probe_ratio: f32,
    pub multiplier: usize,
}

impl Default for IvfConfig {
    fn default() -> Self {
        Self {
            cluster_ratio: 0.05,
            probe_ratio: 0.2,
            multiplier: 3,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NswConfig {
    /// Bidirectional edges created per inserted node.
    pub m: usize,
    /// Beam width used while inserting (building the graph).
    pub ef_construction: usize,
    /// Beam width used while searching.
    pub ef_search: usize,
    pub multiplier: usize,
}

impl Default for NswConfig {
    fn default() -> Self {
        Self {
            m: 8,
            ef_construction: 32,
            ef_search: 64,
            multiplier: 3,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct KMeansConfig {
    pub max_iters: usize,
    pub tolerance: f32,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iters: 50,
            tolerance: 1e-4,
        }
    }
}
