
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::{DocumentRecord, SearchResult, StoreStats, VectorIndex};
use crate::RagError;
use crate::embeddings::cosine_similarity;

/// Full contents of the store as written to disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Snapshot {
    fn validate(&self, dimension: usize) -> Result<(), RagError> {
        if self.documents.len() != self.embeddings.len() {
            return Err(RagError::Store(format!(
                "Snapshot holds {} documents but {} embeddings",
                self.documents.len(),
                self.embeddings.len()
            )));
        }

        if let Some((index, embedding)) = self
            .embeddings
            .iter()
            .find_position(|e| e.len() != dimension)
        {
            return Err(RagError::Store(format!(
                "Embedding {} has dimension {} (expected {})",
                index,
                embedding.len(),
                dimension
            )));
        }

        Ok(())
    }
}

/// Vector store persisted as a single JSON snapshot file
///
/// Mutations are serialized through one writer lock and each one rewrites the
/// whole snapshot before becoming visible. Searches run against the last
/// committed snapshot and never wait on disk I/O.
pub struct VectorStore {
    path: PathBuf,
    dimension: usize,
    state: RwLock<Arc<Snapshot>>,
    /// Writer lock; the flag records whether the snapshot has been loaded
    writer: Mutex<bool>,
}

impl VectorStore {
    /// Create an unloaded store backed by the snapshot file at `path`
    #[inline]
    pub fn new(path: impl Into<PathBuf>, dimension: usize) -> Self {
        Self {
            path: path.into(),
            dimension,
            state: RwLock::new(Arc::new(Snapshot::default())),
            writer: Mutex::new(false),
        }
    }

    #[inline]
    pub fn snapshot_path(&self) -> &Path {
        &self.path
    }

    /// The last committed snapshot
    #[inline]
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.state.read().await)
    }

    /// Number of committed documents
    #[inline]
    pub async fn len(&self) -> usize {
        self.state.read().await.documents.len()
    }

    #[inline]
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Read the snapshot from disk while holding the writer lock
    async fn load_locked(&self, loaded: &mut bool) -> Result<(), RagError> {
        if *loaded {
            return Ok(());
        }

        let snapshot = match fs::read_to_string(&self.path).await {
            Ok(data) => {
                let snapshot: Snapshot = serde_json::from_str(&data).map_err(|e| {
                    RagError::Store(format!(
                        "Failed to parse snapshot {}: {}",
                        self.path.display(),
                        e
                    ))
                })?;
                snapshot.validate(self.dimension)?;
                info!(
                    "Loaded {} documents from vector store at {}",
                    snapshot.documents.len(),
                    self.path.display()
                );
                snapshot
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "No snapshot at {}, starting with an empty vector store",
                    self.path.display()
                );
                Snapshot::default()
            }
            Err(e) => return Err(RagError::Io(e)),
        };

        *self.state.write().await = Arc::new(snapshot);
        *loaded = true;
        Ok(())
    }

    /// Persist `snapshot` and then make it visible to readers
    async fn commit(&self, mut snapshot: Snapshot) -> Result<(), RagError> {
        snapshot.last_updated = Some(Utc::now());
        self.persist(&snapshot).await?;

        let count = snapshot.documents.len();
        *self.state.write().await = Arc::new(snapshot);
        debug!("Committed snapshot with {} documents", count);
        Ok(())
    }

    /// Write the snapshot to a temporary sibling file and rename it into place
    async fn persist(&self, snapshot: &Snapshot) -> Result<(), RagError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| RagError::Store(format!("Failed to serialize snapshot: {}", e)))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &data).await?;

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            warn!(
                "Failed to move snapshot into place at {}: {}",
                self.path.display(),
                e
            );
            let _ = fs::remove_file(&tmp_path).await;
            return Err(RagError::Io(e));
        }

        debug!(
            "Saved {} documents to {}",
            snapshot.documents.len(),
            self.path.display()
        );
        Ok(())
    }

    fn check_dimension(&self, vector: &[f32], what: &str) -> Result<(), RagError> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(RagError::Validation(format!(
                "{} has dimension {} (expected {})",
                what,
                vector.len(),
                self.dimension
            )))
        }
    }
}

#[async_trait]
impl VectorIndex for VectorStore {
    #[inline]
    async fn load(&self) -> Result<(), RagError> {
        let mut loaded = self.writer.lock().await;
        self.load_locked(&mut loaded).await
    }

    #[inline]
    async fn append(
        &self,
        documents: Vec<DocumentRecord>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize, RagError> {
        if documents.len() != embeddings.len() {
            return Err(RagError::Validation(format!(
                "Got {} documents but {} embeddings",
                documents.len(),
                embeddings.len()
            )));
        }
        for (i, embedding) in embeddings.iter().enumerate() {
            self.check_dimension(embedding, &format!("Embedding {}", i))?;
        }

        if documents.is_empty() {
            debug!("No documents to append");
            return Ok(0);
        }

        let added = documents.len();
        let mut loaded = self.writer.lock().await;
        // Never overwrite a snapshot that was not read first
        self.load_locked(&mut loaded).await?;

        let current = Arc::clone(&*self.state.read().await);
        let mut next = Snapshot::clone(&current);
        next.documents.extend(documents);
        next.embeddings.extend(embeddings);

        self.commit(next).await?;
        info!("Appended {} documents to vector store", added);
        Ok(added)
    }

    #[inline]
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>, RagError> {
        self.check_dimension(query, "Query vector")?;

        let snapshot = Arc::clone(&*self.state.read().await);
        if snapshot.embeddings.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = snapshot
            .embeddings
            .iter()
            .map(|embedding| cosine_similarity(query, embedding))
            .enumerate()
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        debug!(
            "Searched {} documents, returning {}",
            snapshot.documents.len(),
            scored.len()
        );

        Ok(scored
            .into_iter()
            .map(|(index, similarity)| SearchResult {
                document: snapshot.documents[index].clone(),
                similarity,
                index,
            })
            .collect())
    }

    #[inline]
    async fn clear(&self) -> Result<(), RagError> {
        let mut loaded = self.writer.lock().await;
        self.commit(Snapshot::default()).await?;
        *loaded = true;
        info!("Vector store cleared");
        Ok(())
    }

    #[inline]
    async fn stats(&self) -> StoreStats {
        let snapshot = Arc::clone(&*self.state.read().await);

        StoreStats {
            total_documents: snapshot.documents.len(),
            categories: snapshot
                .documents
                .iter()
                .map(|d| d.category.clone())
                .counts()
                .into_iter()
                .collect(),
            last_updated: snapshot.last_updated,
        }
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }
}
