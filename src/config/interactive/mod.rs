#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, GenerationConfig, Provider, RetrievalConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Campus RAG Configuration Setup").bold().cyan());
    eprintln!();

    let config_dir = Config::config_dir().context("Failed to locate configuration directory")?;
    let mut config = load_existing_config(&config_dir);

    eprintln!("{}", style("Answer Generation").bold().yellow());
    eprintln!("Choose the chat-completion provider used to write answers.");
    eprintln!();

    configure_generation(&mut config.generation)?;

    eprintln!();
    eprintln!("{}", style("Retrieval").bold().yellow());
    eprintln!("Control how many passages are retrieved and how relevant they must be.");
    eprintln!();

    configure_retrieval(&mut config.retrieval)?;

    eprintln!();
    if has_api_key(&config.generation) {
        eprintln!(
            "{}",
            style(format!(
                "✓ {} is set",
                config.generation.provider.api_key_env()
            ))
            .green()
        );
    } else {
        eprintln!(
            "{}",
            style(format!(
                "⚠ Warning: {} is not set",
                config.generation.provider.api_key_env()
            ))
            .yellow()
        );
        eprintln!("You can continue, but queries will fail until the key is exported.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Generation Settings:").bold().yellow());
    eprintln!("  Provider: {}", style(config.generation.provider).cyan());
    eprintln!("  Model: {}", style(config.generation.model()).cyan());
    match config.generation.endpoint_url() {
        Ok(url) => eprintln!("  Endpoint: {}", style(url).cyan()),
        Err(e) => eprintln!("  Endpoint: {} ({})", style("Invalid").red(), e),
    }
    eprintln!(
        "  Institution: {}",
        style(&config.generation.institution).cyan()
    );
    eprintln!(
        "  Timeout: {}s, {} attempts",
        style(config.generation.timeout_secs).cyan(),
        style(config.generation.retry_attempts).cyan()
    );
    let key_status = if has_api_key(&config.generation) {
        style("set").green()
    } else {
        style("missing").red()
    };
    eprintln!(
        "  API key ({}): {}",
        config.generation.provider.api_key_env(),
        key_status
    );

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  Relevance threshold: {}",
        style(config.retrieval.relevance_threshold).cyan()
    );
    eprintln!(
        "  Chunk size: {} (overlap {})",
        style(config.chunking.chunk_size).cyan(),
        style(config.chunking.overlap_size).cyan()
    );
    eprintln!(
        "  Embedding dimension: {}",
        style(config.embedding.dimension).cyan()
    );

    eprintln!();
    eprintln!(
        "Vector store: {}",
        style(config.vector_store_path().display()).dim()
    );
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_generation(generation: &mut GenerationConfig) -> Result<()> {
    let providers: Vec<&str> = Provider::ALL.iter().map(|p| p.as_str()).collect();
    let default_index = Provider::ALL
        .iter()
        .position(|&p| p == generation.provider)
        .unwrap_or(0);

    let provider_index = Select::new()
        .with_prompt("Provider")
        .default(default_index)
        .items(&providers)
        .interact()?;
    generation.set_provider(Provider::ALL[provider_index]);

    let model: String = Input::new()
        .with_prompt("Model")
        .default(generation.model().to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let institution: String = Input::new()
        .with_prompt("Institution name")
        .default(generation.institution.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Institution name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    if model == generation.provider.default_model() {
        generation.model = None;
    } else {
        generation.set_model(model)?;
    }
    generation.set_institution(institution)?;

    Ok(())
}

fn configure_retrieval(retrieval: &mut RetrievalConfig) -> Result<()> {
    let top_k: usize = Input::new()
        .with_prompt("Passages retrieved per question")
        .default(retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 50")
            }
        })
        .interact_text()?;

    let threshold: f32 = Input::new()
        .with_prompt("Minimum similarity for a passage to be used")
        .default(retrieval.relevance_threshold)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (-1.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Must be between -1 and 1")
            }
        })
        .interact_text()?;

    retrieval.set_top_k(top_k)?;
    retrieval.set_relevance_threshold(threshold)?;

    Ok(())
}

fn has_api_key(generation: &GenerationConfig) -> bool {
    generation.api_key().is_some()
}
