//! Cosine-distance k-means clustering, used to build IVF partitions.
//!
//! Mirrors the `Partitioner` shape used elsewhere in this corpus
//! (fit/assign/centroids/num_partitions) but is not generalized behind a
//! trait: cosine k-means is the only partitioner this crate ever needs.

use crate::similarity::{cosine, euclidean};

pub struct KMeans {
    dimension: usize,
    k: usize,
    max_iters: usize,
    tol: f32,
    centroids: Vec<Vec<f32>>,
}

impl KMeans {
    pub fn new(dimension: usize, k: usize, max_iters: usize, tol: f32) -> Self {
        Self {
            dimension,
            k: k.max(1),
            max_iters,
            tol,
            centroids: Vec::new(),
        }
    }

    pub fn centroids(&self) -> &[Vec<f32>] {
        &self.centroids
    }

    /// Fits centroids to `vectors`, clamping `k` into `[1, vectors.len()]`.
    ///
    /// Initialization is deterministic: centroids start at evenly spaced
    /// indices into `vectors` rather than a random sample, so repeated runs
    /// on the same input produce the same partitions.
    pub fn fit(&mut self, vectors: &[Vec<f32>]) -> Vec<usize> {
        let n = vectors.len();
        let k = self.k.min(n).max(1);
        self.k = k;

        self.centroids = (0..k)
            .map(|i| vectors[i * n / k].clone())
            .collect();

        let mut assignments = vec![0usize; n];
        for _ in 0..self.max_iters {
            for (i, v) in vectors.iter().enumerate() {
                assignments[i] = self.nearest_centroid(v);
            }

            let mut sums = vec![vec![0.0f32; self.dimension]; k];
            let mut counts = vec![0usize; k];
            for (i, v) in vectors.iter().enumerate() {
                let c = assignments[i];
                counts[c] += 1;
                for (s, x) in sums[c].iter_mut().zip(v.iter()) {
                    *s += x;
                }
            }

            let mut max_shift = 0.0f32;
            for c in 0..k {
                if counts[c] == 0 {
                    // Empty cluster keeps its previous centroid.
                    continue;
                }
                let new_centroid: Vec<f32> =
                    sums[c].iter().map(|s| s / counts[c] as f32).collect();
                let shift = euclidean(&self.centroids[c], &new_centroid);
                max_shift = max_shift.max(shift);
                self.centroids[c] = new_centroid;
            }

            if max_shift <= self.tol {
                break;
            }
        }

        assignments
    }

    pub fn predict(&self, v: &[f32]) -> usize {
        self.nearest_centroid(v)
    }

    fn nearest_centroid(&self, v: &[f32]) -> usize {
        self.centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, cosine(v, c)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}
