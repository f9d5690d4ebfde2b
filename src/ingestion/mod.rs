// Ingestion module
// Turns files in a category folder into chunked source documents


pub mod documents;
pub mod markup;

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::RagError;
use crate::database::DocumentMetadata;
use crate::embeddings::{ChunkingConfig, chunk_text};

/// Categories ingested when none are given, one sub-folder each
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "policies",
    "notices",
    "academic-calendar",
    "fees",
    "hostel",
    "faq",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Text,
    Markdown,
    Html,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Format for a file extension, case-insensitive
    #[inline]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Whether the file is a binary container rather than UTF-8 text
    #[inline]
    pub fn is_binary(self) -> bool {
        matches!(self, Self::Pdf | Self::Docx)
    }

    /// Plain text of a file body in this format
    #[inline]
    pub fn extract_text(self, bytes: &[u8]) -> Result<String, RagError> {
        let decoded = || {
            std::str::from_utf8(bytes)
                .map_err(|e| RagError::Extraction(format!("File is not valid UTF-8: {e}")))
        };

        match self {
            Self::Text => Ok(decoded()?.to_string()),
            Self::Markdown => Ok(markup::markdown_to_text(decoded()?)),
            Self::Html => Ok(markup::html_to_text(decoded()?)),
            Self::Pdf => documents::pdf_to_text(bytes),
            Self::Docx => documents::docx_to_text(bytes),
        }
    }
}

/// One extracted file, already chunked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    pub file_name: String,
    pub category: String,
    pub chunks: Vec<String>,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionFailure {
    pub file_name: String,
    pub error: String,
}

/// Result of extracting one directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub documents: Vec<SourceDocument>,
    pub failures: Vec<IngestionFailure>,
}

impl IngestionReport {
    #[inline]
    pub fn total_chunks(&self) -> usize {
        self.documents.iter().map(|d| d.chunks.len()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.failures.is_empty()
    }

    #[inline]
    pub fn merge(&mut self, other: Self) {
        self.documents.extend(other.documents);
        self.failures.extend(other.failures);
    }
}

/// Source of chunked documents for the knowledge base.
///
/// Per-file problems never abort a directory: they are collected in
/// [`IngestionReport::failures`] and extraction moves on.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extract and chunk a single file
    async fn extract_file(&self, path: &Path, category: &str)
    -> Result<SourceDocument, RagError>;

    /// Extract every regular file directly inside `dir`, in file-name order.
    /// A missing directory yields an empty report.
    async fn extract_directory(
        &self,
        dir: &Path,
        category: &str,
    ) -> Result<IngestionReport, RagError>;
}

/// Extractor for text, Markdown, HTML, PDF and DOCX files on the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FileExtractor {
    chunking: ChunkingConfig,
}

impl FileExtractor {
    #[inline]
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self { chunking }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[async_trait]
impl DocumentExtractor for FileExtractor {
    async fn extract_file(
        &self,
        path: &Path,
        category: &str,
    ) -> Result<SourceDocument, RagError> {
        let file_name = file_name_of(path);
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let Some(format) = DocumentFormat::from_extension(&extension) else {
            let shown = if extension.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{extension}")
            };
            return Err(RagError::UnsupportedFormat(format!("{shown} ({file_name})")));
        };

        debug!("Processing {} as {:?}", path.display(), format);

        let bytes = fs::read(path).await?;
        let text = if format.is_binary() {
            tokio::task::spawn_blocking(move || format.extract_text(&bytes))
                .await
                .map_err(|e| {
                    RagError::Extraction(format!("Extracting {file_name} failed: {e}"))
                })??
        } else {
            format.extract_text(&bytes)?
        };
        let chunks = chunk_text(&text, &self.chunking);

        debug!("{} produced {} chunks", file_name, chunks.len());

        Ok(SourceDocument {
            metadata: DocumentMetadata {
                format: extension,
                file_name: file_name.clone(),
                ..DocumentMetadata::default()
            },
            file_name,
            category: category.to_string(),
            chunks,
        })
    }

    async fn extract_directory(
        &self,
        dir: &Path,
        category: &str,
    ) -> Result<IngestionReport, RagError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Directory {} does not exist, skipping", dir.display());
                return Ok(IngestionReport::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if matches!(fs::metadata(&path).await, Ok(metadata) if metadata.is_file()) {
                files.push(path);
            }
        }
        files.sort();

        let mut report = IngestionReport::default();
        for path in files {
            match self.extract_file(&path, category).await {
                Ok(document) => report.documents.push(document),
                Err(e) => {
                    let file_name = file_name_of(&path);
                    warn!("Failed to process {}: {}", file_name, e);
                    report.failures.push(IngestionFailure {
                        file_name,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Extracted {} documents ({} chunks) from {}, {} failures",
            report.documents.len(),
            report.total_chunks(),
            dir.display(),
            report.failures.len()
        );

        Ok(report)
    }
}
