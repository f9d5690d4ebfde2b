use std::collections::HashMap;

use super::*;
use serial_test::serial;
use tempfile::TempDir;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.chunking.chunk_size, 500);
    assert_eq!(config.chunking.overlap_size, 50);
    assert_eq!(config.embedding.dimension, 300);
    assert_eq!(config.retrieval.top_k, 3);
    assert!((config.retrieval.relevance_threshold - 0.3).abs() < f32::EPSILON);
    assert_eq!(config.retrieval.store_file, "vectorstore.json");
    assert_eq!(config.generation.provider, Provider::Groq);
    assert_eq!(config.generation.model(), "llama-3.3-70b-versatile");
    assert_eq!(config.generation.max_tokens, 800);
    assert_eq!(config.generation.retry_attempts, 3);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_size = 10;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chunking.overlap_size = 600;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.dimension = 8;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.retrieval.top_k = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.retrieval.relevance_threshold = 1.5;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.retrieval.relevance_threshold = f32::NAN;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.retrieval.store_file = "  ".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.generation.model = Some(String::new());
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.generation.endpoint = Some("ftp://example.com/chat".to_string());
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.generation.temperature = 3.0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.generation.timeout_secs = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.generation.retry_attempts = 11;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn provider_defaults() {
    assert_eq!(
        Provider::Groq.default_endpoint(),
        "https://api.groq.com/openai/v1/chat/completions"
    );
    assert_eq!(Provider::OpenAi.default_model(), "gpt-3.5-turbo");
    assert_eq!(Provider::OpenAi.api_key_env(), "OPENAI_API_KEY");
    assert_eq!(Provider::Groq.to_string(), "groq");
}

#[test]
fn provider_parsing() {
    assert_eq!("groq".parse::<Provider>().ok(), Some(Provider::Groq));
    assert_eq!(" OpenAI ".parse::<Provider>().ok(), Some(Provider::OpenAi));
    assert!("anthropic".parse::<Provider>().is_err());
}

#[test]
fn endpoint_override() {
    let mut generation = GenerationConfig::default();
    assert_eq!(
        generation
            .endpoint_url()
            .expect("default endpoint should parse")
            .host_str(),
        Some("api.groq.com")
    );

    assert!(
        generation
            .set_endpoint(Some("http://localhost:8080/v1/chat/completions".to_string()))
            .is_ok()
    );
    assert_eq!(
        generation
            .endpoint_url()
            .expect("override should parse")
            .port(),
        Some(8080)
    );

    assert!(generation.set_endpoint(Some("not a url".to_string())).is_err());
    assert_eq!(
        generation.endpoint.as_deref(),
        Some("http://localhost:8080/v1/chat/completions")
    );
}

#[test]
fn setter_validation() {
    let mut config = Config::default();

    assert!(config.retrieval.set_top_k(5).is_ok());
    assert!(config.retrieval.set_top_k(0).is_err());
    assert!(config.retrieval.set_top_k(51).is_err());
    assert_eq!(config.retrieval.top_k, 5);

    assert!(config.retrieval.set_relevance_threshold(0.5).is_ok());
    assert!(config.retrieval.set_relevance_threshold(-2.0).is_err());

    assert!(config.generation.set_model("mixtral".to_string()).is_ok());
    assert!(config.generation.set_model("  ".to_string()).is_err());
    assert_eq!(config.generation.model(), "mixtral");

    assert!(config.generation.set_institution(String::new()).is_err());
}

#[test]
fn switching_provider_resets_model() {
    let mut generation = GenerationConfig::default();
    generation
        .set_model("llama-3.1-8b-instant".to_string())
        .expect("valid model");

    generation.set_provider(Provider::Groq);
    assert_eq!(generation.model(), "llama-3.1-8b-instant");

    generation.set_provider(Provider::OpenAi);
    assert_eq!(generation.model(), "gpt-3.5-turbo");
}

#[test]
fn env_overrides() {
    let mut config = Config::default();
    config
        .apply_overrides(lookup_from(&[
            (TOP_K_ENV, "7"),
            (GROQ_MODEL_ENV, "llama-3.1-8b-instant"),
        ]))
        .expect("overrides should apply");

    assert_eq!(config.retrieval.top_k, 7);
    assert_eq!(config.generation.model(), "llama-3.1-8b-instant");
}

#[test]
fn groq_model_ignored_for_openai() {
    let mut config = Config::default();
    config
        .apply_overrides(lookup_from(&[
            (PROVIDER_ENV, "openai"),
            (GROQ_MODEL_ENV, "llama-3.1-8b-instant"),
        ]))
        .expect("overrides should apply");

    assert_eq!(config.generation.provider, Provider::OpenAi);
    assert_eq!(config.generation.model(), "gpt-3.5-turbo");
}

#[test]
fn invalid_env_overrides() {
    let mut config = Config::default();
    assert!(
        config
            .apply_overrides(lookup_from(&[(TOP_K_ENV, "three")]))
            .is_err()
    );
    assert!(
        config
            .apply_overrides(lookup_from(&[(PROVIDER_ENV, "unknown")]))
            .is_err()
    );

    // Blank values are treated as unset
    let mut config = Config::default();
    config
        .apply_overrides(lookup_from(&[(TOP_K_ENV, " ")]))
        .expect("blank override is ignored");
    assert_eq!(config.retrieval.top_k, 3);
}

#[test]
fn toml_serialization() {
    let mut config = Config::default();
    config.generation.model = Some("custom-model".to_string());
    config.retrieval.top_k = 5;

    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn paths_are_relative_to_base_dir() {
    let config = Config {
        base_dir: PathBuf::from("/srv/campus"),
        ..Config::default()
    };

    assert_eq!(
        config.config_file_path(),
        PathBuf::from("/srv/campus/config.toml")
    );
    assert_eq!(
        config.vector_store_path(),
        PathBuf::from("/srv/campus/vectorstore.json")
    );
    assert_eq!(
        config.knowledge_dir(),
        PathBuf::from("/srv/campus/knowledge")
    );
}

#[test]
#[serial]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    // SAFETY: env access is serialized by #[serial]
    unsafe {
        env::remove_var(TOP_K_ENV);
        env::remove_var(PROVIDER_ENV);
        env::remove_var(GROQ_MODEL_ENV);
    }

    let config = Config::load(temp_dir.path()).expect("should load defaults");

    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.get_base_dir(), temp_dir.path());
}

#[test]
#[serial]
fn load_applies_environment() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    // SAFETY: env access is serialized by #[serial]
    unsafe {
        env::set_var(TOP_K_ENV, "9");
        env::remove_var(PROVIDER_ENV);
        env::remove_var(GROQ_MODEL_ENV);
    }

    let result = Config::load(temp_dir.path());

    // SAFETY: env access is serialized by #[serial]
    unsafe {
        env::remove_var(TOP_K_ENV);
    }

    assert_eq!(result.expect("should load").retrieval.top_k, 9);
}

#[test]
#[serial]
fn config_dir_honours_home_override() {
    // SAFETY: env access is serialized by #[serial]
    unsafe {
        env::set_var(HOME_ENV, "/tmp/campus-rag-home");
    }

    let dir = Config::config_dir();

    // SAFETY: env access is serialized by #[serial]
    unsafe {
        env::remove_var(HOME_ENV);
    }

    assert_eq!(
        dir.expect("override should resolve"),
        PathBuf::from("/tmp/campus-rag-home")
    );
}

#[test]
#[serial]
fn api_key_comes_from_environment() {
    let generation = GenerationConfig::default();

    // SAFETY: env access is serialized by #[serial]
    unsafe {
        env::set_var("GROQ_API_KEY", "gsk-test");
    }
    let key = generation.api_key();
    // SAFETY: env access is serialized by #[serial]
    unsafe {
        env::set_var("GROQ_API_KEY", "   ");
    }
    let blank = generation.api_key();
    // SAFETY: env access is serialized by #[serial]
    unsafe {
        env::remove_var("GROQ_API_KEY");
    }

    assert_eq!(key.as_deref(), Some("gsk-test"));
    assert_eq!(blank, None);
}
