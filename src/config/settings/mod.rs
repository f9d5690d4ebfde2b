#[cfg(test)]
mod tests;

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::embeddings::chunking::ChunkingConfig;
use crate::embeddings::hashing::DEFAULT_EMBEDDING_DIMENSION;

/// Overrides the configuration directory
pub const HOME_ENV: &str = "CAMPUS_RAG_HOME";
pub const TOP_K_ENV: &str = "TOP_K_RESULTS";
pub const PROVIDER_ENV: &str = "AI_PROVIDER";
pub const GROQ_MODEL_ENV: &str = "GROQ_MODEL";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates fetched from the store per query
    pub top_k: usize,
    /// Candidates must score strictly above this to be used as context
    pub relevance_threshold: f32,
    /// Snapshot file name, relative to the configuration directory
    pub store_file: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            relevance_threshold: 0.3,
            store_file: "vectorstore.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Provider {
    #[default]
    #[serde(rename = "groq")]
    Groq,
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    pub const ALL: [Self; 2] = [Self::Groq, Self::OpenAi];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
        }
    }

    #[inline]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Groq => "llama-3.3-70b-versatile",
            Self::OpenAi => "gpt-3.5-turbo",
        }
    }

    #[inline]
    pub const fn default_endpoint(self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1/chat/completions",
            Self::OpenAi => "https://api.openai.com/v1/chat/completions",
        }
    }

    /// Environment variable holding the API key
    #[inline]
    pub const fn api_key_env(self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            _ => Err(ConfigError::InvalidProvider(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: Provider,
    /// Overrides the provider's default model
    pub model: Option<String>,
    /// Overrides the provider's chat-completions endpoint
    pub endpoint: Option<String>,
    /// Institution named in the system prompt
    pub institution: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub retry_attempts: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            endpoint: None,
            institution: "Engineering College".to_string(),
            temperature: 0.7,
            max_tokens: 800,
            timeout_secs: 60,
            retry_attempts: 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid provider: {0} (must be 'groq' or 'openai')")]
    InvalidProvider(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid institution name (cannot be empty)")]
    InvalidInstitution,
    #[error("Invalid temperature: {0} (must be between 0 and 2)")]
    InvalidTemperature(f32),
    #[error("Invalid max tokens: {0} (must be between 1 and 32768)")]
    InvalidMaxTokens(u32),
    #[error("Invalid generation timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid embedding dimension: {0} (must be between 16 and 4096)")]
    InvalidEmbeddingDimension(usize),
    #[error("Invalid chunk size: {0} (must be between 50 and 8192)")]
    InvalidChunkSize(usize),
    #[error("Overlap size ({0}) must not exceed chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid top_k: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("Invalid relevance threshold: {0} (must be between -1 and 1)")]
    InvalidRelevanceThreshold(f32),
    #[error("Invalid store file name: {0:?}")]
    InvalidStoreFile(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidEnvOverride(&'static str, String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory: `$CAMPUS_RAG_HOME`, or `campus-rag`
    /// under the platform configuration directory
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        if let Some(home) = env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(home));
        }

        dirs::config_dir()
            .map(|dir| dir.join("campus-rag"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load from the default configuration directory
    #[inline]
    pub fn load_default() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to locate configuration directory")?;
        Self::load(config_dir)
    }

    /// Load `config.toml` from `config_dir`, falling back to defaults when the
    /// file is missing, then apply environment overrides and validate
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            toml::from_str::<Self>(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .apply_overrides(|key| env::var(key).ok())
            .context("Invalid environment override")?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Apply `TOP_K_RESULTS`, `AI_PROVIDER` and `GROQ_MODEL` from `lookup`.
    /// Empty values are ignored.
    #[inline]
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = lookup(TOP_K_ENV) {
            self.retrieval.top_k = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnvOverride(TOP_K_ENV, value.clone()))?;
        }

        if let Some(value) = lookup(PROVIDER_ENV) {
            self.generation.provider = value.parse()?;
        }

        if self.generation.provider == Provider::Groq {
            if let Some(value) = lookup(GROQ_MODEL_ENV) {
                self.generation.model = Some(value.trim().to_string());
            }
        }

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Path of the persisted vector store snapshot
    #[inline]
    pub fn vector_store_path(&self) -> PathBuf {
        self.get_base_dir().join(&self.retrieval.store_file)
    }

    /// Default root of the categorized knowledge folders
    #[inline]
    pub fn knowledge_dir(&self) -> PathBuf {
        self.get_base_dir().join("knowledge")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_chunking_config()?;
        self.embedding.validate()?;
        self.retrieval.validate()?;
        self.generation.validate()?;
        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(50..=8192).contains(&config.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(config.chunk_size));
        }

        if config.overlap_size > config.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                config.overlap_size,
                config.chunk_size,
            ));
        }

        Ok(())
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(16..=4096).contains(&self.dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(self.dimension));
        }
        Ok(())
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=50).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !(-1.0..=1.0).contains(&self.relevance_threshold) {
            return Err(ConfigError::InvalidRelevanceThreshold(
                self.relevance_threshold,
            ));
        }

        let store_file = self.store_file.trim();
        if store_file.is_empty() || store_file.ends_with('/') || store_file.ends_with('\\') {
            return Err(ConfigError::InvalidStoreFile(self.store_file.clone()));
        }

        Ok(())
    }

    pub fn set_top_k(&mut self, top_k: usize) -> Result<(), ConfigError> {
        if !(1..=50).contains(&top_k) {
            return Err(ConfigError::InvalidTopK(top_k));
        }
        self.top_k = top_k;
        Ok(())
    }

    pub fn set_relevance_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidRelevanceThreshold(threshold));
        }
        self.relevance_threshold = threshold;
        Ok(())
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidModel(model.clone()));
            }
        }

        self.endpoint_url()?;

        if self.institution.trim().is_empty() {
            return Err(ConfigError::InvalidInstitution);
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        if !(1..=32768).contains(&self.max_tokens) {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }

        if !(1..=600).contains(&self.timeout_secs) {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    /// Model in use: the configured override or the provider default
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint());

        let url = Url::parse(endpoint).map_err(|_| ConfigError::InvalidUrl(endpoint.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(endpoint.to_string()));
        }
        Ok(url)
    }

    /// API key from the provider's environment variable. Keys are never
    /// written to the configuration file.
    pub fn api_key(&self) -> Option<String> {
        env::var(self.provider.api_key_env())
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn set_provider(&mut self, provider: Provider) {
        if self.provider != provider {
            // Model names are provider specific
            self.model = None;
        }
        self.provider = provider;
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = Some(model);
        Ok(())
    }

    pub fn set_endpoint(&mut self, endpoint: Option<String>) -> Result<(), ConfigError> {
        let temp_config = Self {
            endpoint: endpoint.clone(),
            ..self.clone()
        };
        temp_config.endpoint_url()?;
        self.endpoint = endpoint;
        Ok(())
    }

    pub fn set_institution(&mut self, institution: String) -> Result<(), ConfigError> {
        if institution.trim().is_empty() {
            return Err(ConfigError::InvalidInstitution);
        }
        self.institution = institution;
        Ok(())
    }
}
