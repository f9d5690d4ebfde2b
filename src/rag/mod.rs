// RAG module
// Retrieval orchestration: embed the question, rank stored passages, keep the
// relevant ones and hand them to the generator


use std::sync::Arc;
use std::time::{Duration, Instant};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::RagError;
use crate::config::Config;
use crate::database::{DocumentRecord, StoreStats, VectorIndex};
use crate::embeddings::Embedder;
use crate::generation::{ChatMessage, ContextItem, GenerationRequest, Generator, StudentProfile};
use crate::ingestion::SourceDocument;

/// Retrieval knobs used per query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalOptions {
    pub top_k: usize,
    /// Candidates must score strictly above this
    pub relevance_threshold: f32,
    pub generation_timeout: Duration,
}

impl Default for RetrievalOptions {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 3,
            relevance_threshold: 0.3,
            generation_timeout: Duration::from_secs(60),
        }
    }
}

impl RetrievalOptions {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            relevance_threshold: config.retrieval.relevance_threshold,
            generation_timeout: config.generation.timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub category: String,
    pub source: String,
}

/// Answer to one question plus what it was grounded on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub response: String,
    /// Number of passages passed to the generator
    pub retrieved_documents: usize,
    pub sources: Vec<Source>,
    pub model: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddDocumentsOutcome {
    /// Number of passages stored
    pub added: usize,
    /// Distinct categories of the stored passages, in first-seen order
    pub categories: Vec<String>,
}

/// Orchestrates the read path (query) and write path (add documents) over a
/// vector index, an embedder and a generator.
///
/// The index is loaded lazily by the first operation. Concurrent first callers
/// share a single load; a failed load is retried by the next caller.
pub struct RagService {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    options: RetrievalOptions,
    ready: OnceCell<()>,
}

impl RagService {
    #[inline]
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        options: RetrievalOptions,
    ) -> Result<Self, RagError> {
        if embedder.dimension() != index.dimension() {
            return Err(RagError::Validation(format!(
                "Embedder '{}' produces {}-dimensional vectors but the index expects {}",
                embedder.name(),
                embedder.dimension(),
                index.dimension()
            )));
        }

        Ok(Self {
            index,
            embedder,
            generator,
            options,
            ready: OnceCell::new(),
        })
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.ready.initialized()
    }

    /// Load the index once. Safe to call from any number of tasks.
    #[inline]
    pub async fn initialize(&self) -> Result<(), RagError> {
        self.ready
            .get_or_try_init(|| async {
                self.index.load().await?;
                info!(
                    "RAG service initialized ({} embedder, dimension {})",
                    self.embedder.name(),
                    self.embedder.dimension()
                );
                Ok::<(), RagError>(())
            })
            .await?;
        Ok(())
    }

    /// Answer `user_text` using the passages most similar to it.
    ///
    /// Only candidates scoring strictly above the relevance threshold reach the
    /// generator. Generation is bounded by the configured timeout.
    #[inline]
    pub async fn query(
        &self,
        user_text: &str,
        history: &[ChatMessage],
        profile: Option<StudentProfile>,
    ) -> Result<QueryResponse, RagError> {
        if user_text.trim().is_empty() {
            return Err(RagError::Validation(
                "Query text must not be empty".to_string(),
            ));
        }

        self.initialize().await?;

        let query_embedding = self.embedder.embed(user_text);
        let candidates = self
            .index
            .search(&query_embedding, self.options.top_k)
            .await?;
        let candidate_count = candidates.len();

        let context: Vec<ContextItem> = candidates
            .into_iter()
            .filter(|candidate| candidate.similarity > self.options.relevance_threshold)
            .map(|candidate| ContextItem {
                content: candidate.document.content,
                category: candidate.document.category,
                source: candidate.document.source,
                similarity: candidate.similarity,
            })
            .collect();

        info!(
            "Retrieved {} relevant documents ({} candidates)",
            context.len(),
            candidate_count
        );

        let sources = context
            .iter()
            .map(|item| Source {
                category: item.category.clone(),
                source: item.source.clone(),
            })
            .collect();
        let retrieved_documents = context.len();

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(user_text));

        let timeout = self.options.generation_timeout;
        let request = GenerationRequest {
            messages,
            context,
            profile,
            deadline: Instant::now().checked_add(timeout),
        };

        let answer = match tokio::time::timeout(timeout, self.generator.generate(request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Generation did not finish within {:?}", timeout);
                return Err(RagError::GenerationTimeout(timeout));
            }
        };

        Ok(QueryResponse {
            response: answer.content,
            retrieved_documents,
            sources,
            model: answer.model,
            provider: answer.provider,
            usage: answer.usage,
        })
    }

    /// Embed every non-blank chunk and store all of them in one append
    #[inline]
    pub async fn add_documents(
        &self,
        documents: &[SourceDocument],
    ) -> Result<AddDocumentsOutcome, RagError> {
        self.initialize().await?;

        let mut records = Vec::new();
        let mut embeddings = Vec::new();

        for document in documents {
            for chunk in document.chunks.iter().filter(|c| !c.trim().is_empty()) {
                embeddings.push(self.embedder.embed(chunk));
                records.push(DocumentRecord {
                    content: chunk.clone(),
                    category: document.category.clone(),
                    source: document.file_name.clone(),
                    metadata: document.metadata.clone(),
                });
            }
        }

        let categories = records
            .iter()
            .map(|record| record.category.clone())
            .unique()
            .collect();

        debug!(
            "Embedded {} chunks from {} documents",
            records.len(),
            documents.len()
        );

        let added = self.index.append(records, embeddings).await?;
        info!("Added {} document chunks to the vector store", added);

        Ok(AddDocumentsOutcome { added, categories })
    }

    #[inline]
    pub async fn stats(&self) -> Result<StoreStats, RagError> {
        self.initialize().await?;
        Ok(self.index.stats().await)
    }

    /// Remove every stored passage
    #[inline]
    pub async fn clear_knowledge(&self) -> Result<(), RagError> {
        self.initialize().await?;
        self.index.clear().await?;
        info!("Knowledge base cleared");
        Ok(())
    }
}
