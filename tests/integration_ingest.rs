#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! End-to-end ingestion: document text through the parser, a mocked
//! embedding server, and the LanceDB store.

use serde_json::json;
use services_rag::config::{Config, EmbeddingConfig};
use services_rag::database::VectorStore;
use services_rag::embeddings::EmbeddingClient;
use services_rag::fetcher::DocumentFetcher;
use services_rag::ingest::IngestPipeline;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIM: u32 = 64;

const DOCUMENT: &str = "Institution: Ministry A\n\
- Service: Passport\n\
- Requirements: ID card\n\
- Fee: 50\n\
- Sub-Service: Renewal\n\
- Requirements: Old passport";

fn config_for(embed_server: &MockServer, temp_dir: &TempDir) -> Config {
    let url = Url::parse(&embed_server.uri()).expect("mock uri should parse");
    Config {
        base_dir: temp_dir.path().to_path_buf(),
        embedding: EmbeddingConfig {
            host: url.host_str().expect("mock uri has host").to_string(),
            port: url.port().expect("mock uri has port"),
            dimension: DIM,
            ..EmbeddingConfig::default()
        },
        ..Config::default()
    }
}

fn axis_vector(axis: usize) -> Vec<f32> {
    (0..DIM as usize)
        .map(|i| if i == axis { 1.0 } else { 0.0 })
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn ingest_content_parses_embeds_and_stores() {
    let embed_server = MockServer::start().await;
    // Two parsed records arrive as one embedding batch.
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [axis_vector(0), axis_vector(1)]
        })))
        .expect(1)
        .mount(&embed_server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = config_for(&embed_server, &temp_dir);

    let store = VectorStore::new(&config).await.expect("store should open");
    let embedder = EmbeddingClient::new(&config).expect("client should build");
    let pipeline = IngestPipeline::new(DocumentFetcher::new(), embedder, store.clone());

    let stats = pipeline
        .ingest_content(DOCUMENT)
        .await
        .expect("ingest should succeed");

    assert_eq!(stats.records_parsed, 2);
    assert_eq!(stats.chunks_stored, 2);
    assert_eq!(store.count().await.expect("count should succeed"), 2);

    let results = store
        .search(&axis_vector(1), 1)
        .await
        .expect("search should succeed");
    assert!(results[0].text.contains("Passport \\ Renewal"));
    assert!(results[0].text.contains("requirements: Old passport"));
}

#[tokio::test(flavor = "multi_thread")]
async fn reingest_replaces_previous_index() {
    let embed_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [axis_vector(0), axis_vector(1)]
        })))
        .mount(&embed_server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = config_for(&embed_server, &temp_dir);

    let store = VectorStore::new(&config).await.expect("store should open");
    let embedder = EmbeddingClient::new(&config).expect("client should build");
    let pipeline = IngestPipeline::new(DocumentFetcher::new(), embedder, store.clone());

    pipeline
        .ingest_content(DOCUMENT)
        .await
        .expect("first ingest should succeed");
    pipeline
        .ingest_content(DOCUMENT)
        .await
        .expect("second ingest should succeed");

    // Full reload per ingest: the second run replaces, not appends.
    assert_eq!(store.count().await.expect("count should succeed"), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn ingest_of_empty_document_clears_index() {
    let embed_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [axis_vector(0), axis_vector(1)]
        })))
        .mount(&embed_server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = config_for(&embed_server, &temp_dir);

    let store = VectorStore::new(&config).await.expect("store should open");
    let embedder = EmbeddingClient::new(&config).expect("client should build");
    let pipeline = IngestPipeline::new(DocumentFetcher::new(), embedder, store.clone());

    pipeline
        .ingest_content(DOCUMENT)
        .await
        .expect("ingest should succeed");

    let stats = pipeline
        .ingest_content("no recognizable lines here")
        .await
        .expect("empty ingest should succeed");

    assert_eq!(stats.records_parsed, 0);
    assert_eq!(stats.chunks_stored, 0);
    assert_eq!(store.count().await.expect("count should succeed"), 0);
}
