use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::database::{VectorIndex, VectorStore};
use crate::embeddings::{Embedder, HashingEmbedder};
use crate::generation::{ChatCompletionClient, Generator, StudentProfile};
use crate::ingestion::{DEFAULT_CATEGORIES, DocumentExtractor, FileExtractor, IngestionFailure};
use crate::rag::{RagService, RetrievalOptions};

/// Totals of one ingestion run across all categories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionSummary {
    pub documents: usize,
    pub chunks: usize,
    pub failures: Vec<IngestionFailure>,
    /// Categories that could not be stored, with the reason
    pub failed_categories: Vec<(String, String)>,
}

/// Wire the vector store, hashing embedder and chat client described by `config`
#[inline]
pub fn build_rag_service(config: &Config) -> Result<RagService> {
    let index: Arc<dyn VectorIndex> = Arc::new(VectorStore::new(
        config.vector_store_path(),
        config.embedding.dimension,
    ));
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(config.embedding.dimension));
    let generator: Arc<dyn Generator> = Arc::new(
        ChatCompletionClient::new(&config.generation)
            .context("Failed to create chat-completion client")?,
    );

    RagService::new(
        index,
        embedder,
        generator,
        RetrievalOptions::from_config(config),
    )
    .context("Failed to create RAG service")
}

fn category_progress(len: usize) -> ProgressBar {
    if console::user_attended_stderr() {
        let style = ProgressStyle::with_template("{spinner} [{pos}/{len}] Ingesting {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new(len as u64).with_style(style);
        bar.set_position(0);
        bar
    } else {
        ProgressBar::hidden()
    }
}

/// Extract `root/<category>` for every category and store the passages.
///
/// A category that fails to extract or store is reported and skipped; the
/// remaining categories are still ingested.
#[inline]
pub async fn ingest_categories(
    extractor: &dyn DocumentExtractor,
    rag: &RagService,
    root: &Path,
    categories: &[String],
) -> Result<IngestionSummary> {
    rag.initialize()
        .await
        .context("Failed to load the vector store")?;

    let mut summary = IngestionSummary::default();
    let bar = category_progress(categories.len());

    for category in categories {
        bar.set_message(category.clone());
        let category_dir = root.join(category);

        let report = match extractor.extract_directory(&category_dir, category).await {
            Ok(report) => report,
            Err(e) => {
                error!("Failed to read {}: {}", category_dir.display(), e);
                summary
                    .failed_categories
                    .push((category.clone(), e.to_string()));
                bar.inc(1);
                continue;
            }
        };

        summary.failures.extend(report.failures);

        if report.documents.is_empty() {
            bar.println(format!("{} {}: no documents found", style("!").yellow(), category));
        } else {
            match rag.add_documents(&report.documents).await {
                Ok(outcome) => {
                    summary.documents += report.documents.len();
                    summary.chunks += outcome.added;
                    bar.println(format!(
                        "{} {}: added {} documents ({} chunks)",
                        style("✓").green(),
                        category,
                        report.documents.len(),
                        outcome.added
                    ));
                }
                Err(e) => {
                    error!("Failed to store {} documents: {}", category, e);
                    summary
                        .failed_categories
                        .push((category.clone(), e.to_string()));
                }
            }
        }

        bar.inc(1);
    }

    bar.finish_and_clear();
    info!(
        "Ingestion complete: {} documents, {} chunks",
        summary.documents, summary.chunks
    );

    Ok(summary)
}

/// `ingest` command: load every category folder under `dir` into the knowledge base
#[inline]
pub async fn run_ingest(dir: Option<PathBuf>, categories: Vec<String>) -> Result<()> {
    let config = Config::load_default()?;
    let root = dir.unwrap_or_else(|| config.knowledge_dir());
    let categories = if categories.is_empty() {
        DEFAULT_CATEGORIES.iter().map(|c| (*c).to_string()).collect()
    } else {
        categories
    };

    println!(
        "Ingesting knowledge from {} ({} categories)",
        style(root.display()).cyan(),
        categories.len()
    );

    let extractor = FileExtractor::new(config.chunking);
    let rag = build_rag_service(&config)?;
    let summary = ingest_categories(&extractor, &rag, &root, &categories).await?;

    println!();
    println!("Ingestion complete");
    println!("  Documents processed: {}", summary.documents);
    println!("  Chunks created: {}", summary.chunks);

    if !summary.failures.is_empty() {
        println!("  Skipped files:");
        for failure in &summary.failures {
            println!("    {} - {}", failure.file_name, failure.error);
        }
    }
    for (category, reason) in &summary.failed_categories {
        println!("  {} {}: {}", style("✗").red(), category, reason);
    }

    print_stats(&rag).await
}

/// `query` command: answer one question from the knowledge base
#[inline]
pub async fn run_query(text: &str, profile: Option<StudentProfile>) -> Result<()> {
    let config = Config::load_default()?;
    let rag = build_rag_service(&config)?;

    let response = rag.query(text, &[], profile).await?;

    println!("{}", response.response);
    println!();
    println!(
        "{}",
        style(format!(
            "{} relevant documents, answered by {} ({})",
            response.retrieved_documents, response.model, response.provider
        ))
        .dim()
    );
    for source in &response.sources {
        println!("  - {} [{}]", source.source, source.category);
    }
    if let Some(total) = response
        .usage
        .as_ref()
        .and_then(|usage| usage.get("total_tokens"))
    {
        println!("{}", style(format!("{total} tokens used")).dim());
    }

    Ok(())
}

async fn print_stats(rag: &RagService) -> Result<()> {
    let stats = rag.stats().await?;

    println!();
    println!("Vector store statistics:");
    println!("  Total documents: {}", stats.total_documents);
    for (category, count) in &stats.categories {
        println!("  {category}: {count}");
    }
    match stats.last_updated {
        Some(updated) => println!("  Last updated: {}", updated.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Last updated: never"),
    }

    Ok(())
}

/// `stats` command
#[inline]
pub async fn show_stats() -> Result<()> {
    let config = Config::load_default()?;
    let rag = build_rag_service(&config)?;

    println!(
        "Knowledge base: {}",
        style(config.vector_store_path().display()).cyan()
    );
    print_stats(&rag).await
}

/// `clear` command: remove every stored passage after confirmation
#[inline]
pub async fn clear_knowledge(skip_confirmation: bool) -> Result<()> {
    let config = Config::load_default()?;
    let rag = build_rag_service(&config)?;

    let total = rag.stats().await?.total_documents;
    if total == 0 {
        println!("The knowledge base is already empty.");
        return Ok(());
    }

    if !skip_confirmation {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete all {total} stored passages? This cannot be undone"
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;

        if !confirmed {
            warn!("Clear cancelled by user");
            println!("Cancelled.");
            return Ok(());
        }
    }

    rag.clear_knowledge().await?;
    println!("{} Removed {} passages", style("✓").green(), total);

    Ok(())
}
