// Configuration management module
// TOML settings for chunking, embedding, retrieval and generation

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, EmbeddingConfig, GenerationConfig, Provider, RetrievalConfig,
};
