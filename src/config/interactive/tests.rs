use super::load_existing_config as load_existing_config_impl;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn load_existing_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(temp_dir.path().join("config.toml"), "[retrieval\n").expect("write");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.get_base_dir(), temp_dir.path());
}

#[test]
#[serial]
fn load_existing_config_reads_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[generation]\ninstitution = \"Riverside Institute\"\n",
    )
    .expect("write");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.generation.institution, "Riverside Institute");
}
