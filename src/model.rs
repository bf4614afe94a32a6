//! Domain model: chunks, documents, libraries, and the three index kinds.

use crate::filter::Metadata;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Which ANN strategy a library's index uses. Chosen at library-creation time
/// and immutable afterward: there is no supported way to re-bind a library to
/// a different index kind once chunks have been indexed under the old one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Linear,
    Ivf,
    Nsw,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub library_id: Uuid,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
    pub created_at: u64,
}

impl Chunk {
    pub fn new(
        document_id: Uuid,
        library_id: Uuid,
        text: String,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            library_id,
            text,
            embedding,
            metadata,
            created_at: now_unix_secs(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub library_id: Uuid,
    pub chunk_ids: std::collections::HashSet<Uuid>,
    pub metadata: Metadata,
    pub created_at: u64,
}

impl Document {
    pub fn new(library_id: Uuid, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            library_id,
            chunk_ids: std::collections::HashSet::new(),
            metadata,
            created_at: now_unix_secs(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Library {
    pub id: Uuid,
    pub name: String,
    pub index_kind: IndexKind,
    pub index_params: Metadata,
    /// Embedding dimension every chunk in this library must match. Fixed at
    /// creation time along with `index_kind`: neither can be changed once
    /// chunks may have been indexed under them.
    pub dimension: usize,
    pub document_ids: std::collections::HashSet<Uuid>,
    pub metadata: Metadata,
    pub created_at: u64,
}

impl Library {
    pub fn new(
        name: String,
        index_kind: IndexKind,
        index_params: Metadata,
        dimension: usize,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            index_kind,
            index_params,
            dimension,
            document_ids: std::collections::HashSet::new(),
            metadata,
            created_at: now_unix_secs(),
        }
    }
}
