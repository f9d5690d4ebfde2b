// Database module
// Document records, their embeddings, and the similarity index they are searched through


pub mod vector_store;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RagError;

pub use vector_store::VectorStore;

/// A stored passage and where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// The passage text
    pub content: String,
    /// Topic tag, e.g. "fees" or "hostel"
    pub category: String,
    /// Originating file name
    pub source: String,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

/// Extraction details attached to every passage of a source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentMetadata {
    /// Source format, e.g. "md" or "txt"
    pub format: String,
    pub file_name: String,
    /// Any further extractor-specific fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A stored document scored against a query vector
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub document: DocumentRecord,
    pub similarity: f32,
    /// Insertion position of the document in the store
    pub index: usize,
}

/// Document counts for monitoring and display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_documents: usize,
    pub categories: BTreeMap<String, usize>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Similarity index over document records.
///
/// `search` makes no assumption about how candidates are found, so an
/// approximate nearest-neighbour backend can sit behind the same contract.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Load persisted state. Calling this again after a successful load is a no-op.
    async fn load(&self) -> Result<(), RagError>;

    /// Append documents with their index-aligned embeddings as one unit of work
    async fn append(
        &self,
        documents: Vec<DocumentRecord>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize, RagError>;

    /// Return up to `top_k` documents by descending similarity.
    /// Equal similarities keep insertion order.
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>, RagError>;

    /// Remove every document
    async fn clear(&self) -> Result<(), RagError>;

    async fn stats(&self) -> StoreStats;

    /// Length every stored and query vector must have
    fn dimension(&self) -> usize;
}
