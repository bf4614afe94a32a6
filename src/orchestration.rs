//! Chunk, document, and library services: the cascade-aware orchestration
//! layer sitting on top of the stores and the index registry.
//!
//! Grounded on the original implementation's `ChunkService`/`DocumentService`/
//! `LibraryService` trio, with one correction: document delete calls chunk
//! delete as `(chunk_id, library_id, document_id)`, matching
//! `ChunkService::delete`'s own parameter order. The original transposes the
//! last two arguments at the call site, which is harmless only because both
//! are `UUID`-typed and the call happens to still locate the right chunk
//! through its library-scoped lookup in every case this corpus's tests
//! exercise — it is still a latent bug, fixed here rather than carried over.

use crate::embedding::{EmbeddingProvider, InputType};
use crate::error::{CoreError, CoreResult};
use crate::filter::{Filter, Metadata};
use crate::index::VectorIndex;
use crate::model::{Chunk, Document, IndexKind, Library};
use crate::registry::IndexRegistry;
use crate::store::Store;
use std::sync::Arc;
use uuid::Uuid;

fn composite_metadata(document_id: Uuid, library_id: Uuid, mut metadata: Metadata) -> Metadata {
    metadata.insert("document_id".into(), serde_json::json!(document_id.to_string()));
    metadata.insert("library_id".into(), serde_json::json!(library_id.to_string()));
    metadata
}

#[derive(Clone)]
pub struct ChunkService {
    chunks: Arc<Store<Chunk>>,
    documents: Arc<Store<Document>>,
    libraries: Arc<Store<Library>>,
    registry: Arc<IndexRegistry>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl ChunkService {
    pub fn new(
        chunks: Arc<Store<Chunk>>,
        documents: Arc<Store<Document>>,
        libraries: Arc<Store<Library>>,
        registry: Arc<IndexRegistry>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self { chunks, documents, libraries, registry, embedder }
    }

    /// Looks up a chunk, optionally scoping the lookup to a library and/or a
    /// specific document so a caller can't reach a chunk through the wrong
    /// parent.
    pub fn get_by_id(&self, chunk_id: Uuid, library_id: Uuid, document_id: Option<Uuid>) -> CoreResult<Chunk> {
        let chunk = self
            .chunks
            .get(chunk_id)
            .ok_or_else(|| CoreError::NotFound(format!("chunk {chunk_id} not found")))?;
        if chunk.library_id != library_id {
            return Err(CoreError::NotFound(format!("chunk {chunk_id} not found in library {library_id}")));
        }
        if let Some(doc_id) = document_id {
            if chunk.document_id != doc_id {
                return Err(CoreError::NotFound(format!("chunk {chunk_id} not found in document {doc_id}")));
            }
        }
        Ok(chunk)
    }

    pub fn create(
        &self,
        library_id: Uuid,
        document_id: Option<Uuid>,
        text: String,
        metadata: Metadata,
    ) -> CoreResult<Chunk> {
        if text.is_empty() {
            return Err(CoreError::Validation("chunk text must not be empty".into()));
        }
        let library = self
            .libraries
            .get(library_id)
            .ok_or_else(|| CoreError::NotFound(format!("library {library_id} not found")))?;

        let document_id = match document_id {
            Some(id) => {
                let doc = self
                    .documents
                    .get(id)
                    .ok_or_else(|| CoreError::NotFound(format!("document {id} not found")))?;
                if doc.library_id != library_id {
                    return Err(CoreError::Validation(format!(
                        "document {id} does not belong to library {library_id}"
                    )));
                }
                id
            }
            None => {
                let doc = Document::new(library_id, Metadata::new());
                let id = doc.id;
                self.documents.insert(id, doc);
                self.libraries.mutate(library_id, |l| {
                    l.document_ids.insert(id);
                });
                id
            }
        };

        let embedding = self.embedder.embed(&text, InputType::Document)?;
        if embedding.len() != library.dimension {
            return Err(CoreError::Validation(format!(
                "embedding has dimension {}, library expects {}",
                embedding.len(),
                library.dimension
            )));
        }

        let chunk = Chunk::new(document_id, library_id, text, embedding.clone(), metadata.clone());
        self.chunks.insert(chunk.id, chunk.clone());
        self.documents.mutate(document_id, |d| {
            d.chunk_ids.insert(chunk.id);
        });

        let index = self.registry.require(library_id)?;
        index
            .write()
            .add(chunk.id, embedding, composite_metadata(document_id, library_id, metadata))?;

        Ok(chunk)
    }

    pub fn update(
        &self,
        chunk_id: Uuid,
        library_id: Uuid,
        text: Option<String>,
        metadata: Option<Metadata>,
    ) -> CoreResult<Chunk> {
        let mut chunk = self.get_by_id(chunk_id, library_id, None)?;

        if let Some(new_text) = text {
            if new_text.is_empty() {
                return Err(CoreError::Validation("chunk text must not be empty".into()));
            }
            let embedding = self.embedder.embed(&new_text, InputType::Document)?;
            chunk.text = new_text;
            chunk.embedding = embedding;
        }
        if let Some(new_metadata) = metadata {
            chunk.metadata = new_metadata;
        }

        self.chunks.insert(chunk_id, chunk.clone());

        let index = self.registry.require(library_id)?;
        index.write().update(
            chunk_id,
            chunk.embedding.clone(),
            composite_metadata(chunk.document_id, library_id, chunk.metadata.clone()),
        )?;

        Ok(chunk)
    }

    /// Embeds `query_text` as a search query, runs it against the library's
    /// index, and rehydrates each matching id back into its chunk record.
    pub fn search(
        &self,
        library_id: Uuid,
        query_text: &str,
        k: usize,
        filter: Option<&Filter>,
    ) -> CoreResult<Vec<(Chunk, f32)>> {
        if k < 1 {
            return Err(CoreError::Validation("k must be at least 1".into()));
        }
        if !self.libraries.contains(library_id) {
            return Err(CoreError::NotFound(format!("library {library_id} not found")));
        }

        let query_vector = self.embedder.embed(query_text, InputType::SearchQuery)?;
        let ranked = self.registry.search(library_id, &query_vector, k, filter)?;

        Ok(ranked
            .into_iter()
            .filter_map(|(id, score)| self.chunks.get(id).map(|chunk| (chunk, score)))
            .collect())
    }

    /// Idempotent: deleting an already-absent chunk succeeds silently.
    pub fn delete(&self, chunk_id: Uuid, library_id: Uuid, document_id: Option<Uuid>) -> CoreResult<()> {
        let chunk = match self.get_by_id(chunk_id, library_id, document_id) {
            Ok(c) => c,
            Err(CoreError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        if let Some(index) = self.registry.get(library_id) {
            index.write().delete(chunk_id)?;
        }
        self.documents.mutate(chunk.document_id, |d| {
            d.chunk_ids.remove(&chunk_id);
        });
        self.chunks.remove(chunk_id);
        Ok(())
    }
}

#[derive(Clone)]
pub struct DocumentService {
    documents: Arc<Store<Document>>,
    libraries: Arc<Store<Library>>,
    chunks: ChunkService,
}

impl DocumentService {
    pub fn new(documents: Arc<Store<Document>>, libraries: Arc<Store<Library>>, chunks: ChunkService) -> Self {
        Self { documents, libraries, chunks }
    }

    pub fn create(&self, library_id: Uuid, metadata: Metadata) -> CoreResult<Document> {
        if !self.libraries.contains(library_id) {
            return Err(CoreError::NotFound(format!("library {library_id} not found")));
        }
        let document = Document::new(library_id, metadata);
        self.documents.insert(document.id, document.clone());
        self.libraries.mutate(library_id, |l| {
            l.document_ids.insert(document.id);
        });
        Ok(document)
    }

    pub fn update(&self, document_id: Uuid, library_id: Uuid, metadata: Metadata) -> CoreResult<Document> {
        let document = self
            .documents
            .get(document_id)
            .ok_or_else(|| CoreError::NotFound(format!("document {document_id} not found")))?;
        if document.library_id != library_id {
            return Err(CoreError::NotFound(format!("document {document_id} not found in library {library_id}")));
        }
        self.documents.mutate(document_id, |d| {
            d.metadata = metadata;
        });
        self.documents
            .get(document_id)
            .ok_or_else(|| CoreError::NotFound(format!("document {document_id} not found")))
    }

    /// Idempotent: cascades to every chunk the document owns before removing
    /// the document itself.
    pub fn delete(&self, document_id: Uuid, library_id: Uuid) -> CoreResult<()> {
        let document = match self.documents.get(document_id) {
            Some(d) if d.library_id == library_id => d,
            _ => return Ok(()),
        };

        for chunk_id in document.chunk_ids.iter().copied() {
            self.chunks.delete(chunk_id, library_id, Some(document_id))?;
        }

        self.documents.remove(document_id);
        self.libraries.mutate(library_id, |l| {
            l.document_ids.remove(&document_id);
        });
        Ok(())
    }
}

pub struct LibraryService {
    libraries: Arc<Store<Library>>,
    registry: Arc<IndexRegistry>,
    documents: DocumentService,
}

impl LibraryService {
    pub fn new(libraries: Arc<Store<Library>>, registry: Arc<IndexRegistry>, documents: DocumentService) -> Self {
        Self { libraries, registry, documents }
    }

    pub fn create(
        &self,
        name: String,
        index_kind: IndexKind,
        dimension: usize,
        index_params: Metadata,
        metadata: Metadata,
    ) -> CoreResult<Library> {
        if name.is_empty() {
            return Err(CoreError::Validation("library name must not be empty".into()));
        }
        let library = Library::new(name, index_kind, index_params.clone(), dimension, metadata);
        self.registry.create(library.id, index_kind, dimension, &index_params)?;
        self.libraries.insert(library.id, library.clone());
        Ok(library)
    }

    pub fn get(&self, library_id: Uuid) -> CoreResult<Library> {
        self.libraries
            .get(library_id)
            .ok_or_else(|| CoreError::NotFound(format!("library {library_id} not found")))
    }

    pub fn list_all(&self) -> Vec<Uuid> {
        self.libraries.list_ids()
    }

    pub fn update(&self, library_id: Uuid, name: Option<String>, metadata: Option<Metadata>) -> CoreResult<Library> {
        if !self.libraries.contains(library_id) {
            return Err(CoreError::NotFound(format!("library {library_id} not found")));
        }
        self.libraries.mutate(library_id, |l| {
            if let Some(n) = name {
                l.name = n;
            }
            if let Some(m) = metadata {
                l.metadata = m;
            }
        });
        self.get(library_id)
    }

    /// Idempotent: cascades to every document (and transitively every chunk)
    /// before deleting the index and the library record itself.
    pub fn delete(&self, library_id: Uuid) -> CoreResult<()> {
        let library = match self.libraries.get(library_id) {
            Some(l) => l,
            None => return Ok(()),
        };

        for document_id in library.document_ids.iter().copied() {
            self.documents.delete(document_id, library_id)?;
        }

        self.registry.delete(library_id);
        self.libraries.remove(library_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DeterministicEmbedding;

    fn wire(dimension: usize) -> (LibraryService, Arc<IndexRegistry>) {
        let chunks = Arc::new(Store::new());
        let documents = Arc::new(Store::new());
        let libraries = Arc::new(Store::new());
        let registry = Arc::new(IndexRegistry::new());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(DeterministicEmbedding::new(dimension));

        let chunk_service = ChunkService::new(chunks, documents.clone(), libraries.clone(), registry.clone(), embedder);
        let document_service = DocumentService::new(documents, libraries.clone(), chunk_service);
        let library_service = LibraryService::new(libraries, registry.clone(), document_service);
        (library_service, registry)
    }

    #[test]
    fn library_delete_cascades_to_documents_chunks_and_index() {
        let (libs, registry) = wire(8);
        let library = libs
            .create("docs".into(), IndexKind::Linear, 8, Metadata::new(), Metadata::new())
            .unwrap();

        assert!(registry.get(library.id).is_some());
        libs.delete(library.id).unwrap();
        assert!(registry.get(library.id).is_none());
        assert!(libs.get(library.id).is_err());
    }

    #[test]
    fn library_delete_is_idempotent() {
        let (libs, _registry) = wire(8);
        let library = libs
            .create("docs".into(), IndexKind::Linear, 8, Metadata::new(), Metadata::new())
            .unwrap();
        libs.delete(library.id).unwrap();
        libs.delete(library.id).unwrap();
    }
}
