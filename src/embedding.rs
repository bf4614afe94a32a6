//! Embedding provider contract.
//!
//! The embedding provider itself (model choice, network calls, rate limits)
//! is explicitly out of scope: this crate only needs a trait boundary so
//! orchestration code can call out to one without depending on a concrete
//! provider, plus a deterministic local stand-in for tests and for running
//! the crate without any network dependency at all.

use crate::error::{CoreError, CoreResult};

/// Mirrors the original implementation's `input_type` distinction (documents
/// are embedded differently than queries by most retrieval-tuned models).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputType {
    Document,
    SearchQuery,
}

pub trait EmbeddingProvider: Send + Sync {
    fn dimension(&self) -> usize;

    /// Blocking embed call. Orchestration code must invoke this outside of
    /// any index lock: embedding can involve network I/O, and holding an
    /// index's lock across it would block every other reader/writer of that
    /// index for the duration of the call.
    fn embed(&self, text: &str, input_type: InputType) -> CoreResult<Vec<f32>>;
}

/// Hash-based deterministic embedding: no network calls, same text always
/// produces the same vector. Used as the crate's default provider and in
/// tests; not meant to produce semantically meaningful similarity.
pub struct DeterministicEmbedding {
    dimension: usize,
}

impl DeterministicEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingProvider for DeterministicEmbedding {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str, _input_type: InputType) -> CoreResult<Vec<f32>> {
        if text.is_empty() {
            return Err(CoreError::Validation("cannot embed empty text".into()));
        }
        let mut vector = vec![0.0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            let slot = i % self.dimension;
            vector[slot] += (byte as f32) / 255.0;
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_embeds_identically() {
        let provider = DeterministicEmbedding::new(8);
        let a = provider.embed("hello world", InputType::Document).unwrap();
        let b = provider.embed("hello world", InputType::Document).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_text_is_a_validation_error() {
        let provider = DeterministicEmbedding::new(8);
        assert!(provider.embed("", InputType::Document).is_err());
    }
}
