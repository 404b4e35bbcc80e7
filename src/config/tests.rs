use super::*;
use tempfile::TempDir;

#[test]
fn defaults_are_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.embedding.dimension, DEFAULT_EMBEDDING_DIMENSION);
    assert_eq!(config.search.limit, 5);
    assert_eq!(config.llm.provider, LlmProvider::Gemini);
}

#[test]
fn load_missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("load should succeed");

    assert_eq!(config, Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    });
}

#[test]
fn save_and_reload_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 9090,
        },
        embedding: EmbeddingConfig {
            model: "custom-e5".to_string(),
            batch_size: 32,
            ..EmbeddingConfig::default()
        },
        llm: LlmConfig {
            provider: LlmProvider::Local,
            ..LlmConfig::default()
        },
        ..Config::default()
    };

    config.save().expect("save should succeed");
    let reloaded = Config::load(temp_dir.path()).expect("reload should succeed");

    assert_eq!(reloaded, config);
}

#[test]
fn invalid_values_are_rejected() {
    let mut config = Config::default();
    config.embedding.protocol = "ftp".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));

    let mut config = Config::default();
    config.embedding.batch_size = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidBatchSize(0))
    ));

    let mut config = Config::default();
    config.embedding.dimension = 16;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidEmbeddingDimension(16))
    ));

    let mut config = Config::default();
    config.search.limit = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidSearchLimit(0))
    ));

    let mut config = Config::default();
    config.llm.local_url = "not a url".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
}

#[test]
fn embedding_url_from_parts() {
    let config = Config::default();
    let url = config.embedding_url().expect("url should build");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn vector_db_path_under_base_dir() {
    let config = Config {
        base_dir: PathBuf::from("/tmp/services-rag"),
        ..Config::default()
    };
    assert_eq!(
        config.vector_db_path(),
        PathBuf::from("/tmp/services-rag/vectors")
    );
}

#[test]
fn store_data_dir_overrides_vector_db_path() {
    let config = Config {
        base_dir: PathBuf::from("/tmp/services-rag"),
        store: StoreConfig {
            data_dir: Some(PathBuf::from("/data/lance")),
        },
        ..Config::default()
    };
    assert_eq!(config.vector_db_path(), PathBuf::from("/data/lance"));
}

#[test]
fn store_section_loads_from_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[store]\ndata_dir = \"/data/lance\"\n",
    )
    .expect("config file should write");

    let config = Config::load(temp_dir.path()).expect("load should succeed");
    assert_eq!(config.store.data_dir, Some(PathBuf::from("/data/lance")));
    assert_eq!(config.vector_db_path(), PathBuf::from("/data/lance"));
}
