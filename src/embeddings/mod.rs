// Embeddings module
// Passage chunking and the text-to-vector step used by both ingestion and queries

pub mod chunking;
pub mod hashing;

pub use chunking::{ChunkingConfig, chunk_text};
pub use hashing::{DEFAULT_EMBEDDING_DIMENSION, HashingEmbedder, cosine_similarity};

/// Maps text to a fixed-length vector.
///
/// Implementations must be deterministic and must always return vectors of
/// length [`Embedder::dimension`], so that a model-backed embedder can replace
/// the hashing one without touching the store or the orchestrator.
pub trait Embedder: Send + Sync {
    /// Embed a passage or query
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Length of every vector produced by [`Embedder::embed`]
    fn dimension(&self) -> usize;

    /// Short identifier used in logs
    fn name(&self) -> &str;
}
