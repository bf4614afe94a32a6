//! An in-memory vector database core: chunks, documents, and libraries
//! layered on top of three interchangeable ANN index kinds.
//!
//! # Design
//!
//! A [`Library`](model::Library) owns a set of documents, each holding a set
//! of chunks; every chunk carries an embedding and JSON-like metadata.
//! Each library is bound to exactly one index kind at creation time —
//! [`index::linear::LinearIndex`] (exhaustive, exact), [`index::ivf::IvfIndex`]
//! (k-means-partitioned, approximate), or [`index::nsw::NswIndex`]
//! (navigable-small-world graph, approximate) — and that binding cannot be
//! changed afterward.
//!
//! **Boundaries:** this crate has no HTTP surface, does not validate
//! transport-level requests, and does not implement an embedding provider;
//! callers supply one via [`embedding::EmbeddingProvider`]. Persistence of
//! library/document/chunk records is likewise a caller concern in a real
//! deployment — [`store::Store`] is an in-memory stand-in, not a database.
//!
//! **Non-goals:** no durability, no replication, no cross-library search, no
//! hierarchical NSW, no learned indexes, no GPU acceleration, no approximate
//! distance computation (cosine similarity is always computed exactly, even
//! inside approximate indexes — only the candidate set is approximate).
//!
//! # Example
//!
//! ```rust
//! use vectorcore::{VectorDbCore, model::IndexKind, filter::Metadata};
//!
//! let db = VectorDbCore::new(8);
//! let library = db.libraries()
//!     .create("docs".into(), IndexKind::Linear, 8, Metadata::new(), Metadata::new())
//!     .unwrap();
//!
//! let chunk = db.chunks()
//!     .create(library.id, None, "hello world".into(), Metadata::new())
//!     .unwrap();
//!
//! db.registry().build(library.id).unwrap();
//! let results = db.registry().search(library.id, &chunk.embedding, 1, None).unwrap();
//! assert_eq!(results[0].0, chunk.id);
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod index;
pub mod kmeans;
pub mod model;
pub mod orchestration;
pub mod registry;
pub mod similarity;
pub mod store;

pub use error::{CoreError, CoreResult};

use embedding::{DeterministicEmbedding, EmbeddingProvider};
use filter::Metadata;
use model::{Chunk, Document, IndexKind, Library};
use orchestration::{ChunkService, DocumentService, LibraryService};
use registry::IndexRegistry;
use std::sync::Arc;
use store::Store;

/// Wires the stores, the index registry, and an embedding provider into the
/// three orchestration services. This is the crate's single constructible
/// entry point; everything else is reachable through it or built from its
/// pieces directly for callers who want a different embedding provider or
/// persistence layer.
pub struct VectorDbCore {
    chunks: ChunkService,
    documents: DocumentService,
    libraries: LibraryService,
    registry: Arc<IndexRegistry>,
}

impl VectorDbCore {
    /// Builds a core using the deterministic local embedding provider. Real
    /// deployments should use [`Self::with_embedder`] with a provider backed
    /// by an actual model.
    pub fn new(embedding_dimension: usize) -> Self {
        Self::with_embedder(Arc::new(DeterministicEmbedding::new(embedding_dimension)))
    }

    pub fn with_embedder(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let chunk_store: Arc<Store<Chunk>> = Arc::new(Store::new());
        let document_store: Arc<Store<Document>> = Arc::new(Store::new());
        let library_store: Arc<Store<Library>> = Arc::new(Store::new());
        let registry = Arc::new(IndexRegistry::new());

        let chunks = ChunkService::new(
            chunk_store,
            document_store.clone(),
            library_store.clone(),
            registry.clone(),
            embedder,
        );
        let documents = DocumentService::new(document_store, library_store.clone(), chunks.clone());
        let libraries = LibraryService::new(library_store, registry.clone(), documents.clone());

        Self { chunks, documents, libraries, registry }
    }

    pub fn chunks(&self) -> &ChunkService {
        &self.chunks
    }

    pub fn documents(&self) -> &DocumentService {
        &self.documents
    }

    pub fn libraries(&self) -> &LibraryService {
        &self.libraries
    }

    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::IndexKind;

    #[test]
    fn end_to_end_create_index_and_search() {
        let db = VectorDbCore::new(8);
        let library = db
            .libraries()
            .create("docs".into(), IndexKind::Linear, 8, Metadata::new(), Metadata::new())
            .unwrap();

        let chunk = db
            .chunks()
            .create(library.id, None, "hello world".into(), Metadata::new())
            .unwrap();

        let results = db.registry().search(library.id, &chunk.embedding, 1, None).unwrap();
        assert_eq!(results[0].0, chunk.id);
    }

    #[test]
    fn search_against_absent_library_is_not_found() {
        let db = VectorDbCore::new(8);
        let err = db.registry().search(uuid::Uuid::new_v4(), &[0.0; 8], 1, None);
        assert!(matches!(err, Err(CoreError::Index(_))));
    }

    #[test]
    fn text_search_embeds_query_and_rehydrates_chunks() {
        let db = VectorDbCore::new(8);
        let library = db
            .libraries()
            .create("docs".into(), IndexKind::Linear, 8, Metadata::new(), Metadata::new())
            .unwrap();

        let chunk = db
            .chunks()
            .create(library.id, None, "hello world".into(), Metadata::new())
            .unwrap();
        db.registry().build(library.id).unwrap();

        let results = db.chunks().search(library.id, "hello world", 1, None).unwrap();
        assert_eq!(results[0].0.id, chunk.id);
    }
}
