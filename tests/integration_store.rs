#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! Integration tests for the LanceDB chunk store with realistic data.

use services_rag::config::{Config, EmbeddingConfig};
use services_rag::database::VectorStore;
use tempfile::TempDir;

const DIM: u32 = 64;

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        embedding: EmbeddingConfig {
            dimension: DIM,
            ..EmbeddingConfig::default()
        },
        ..Config::default()
    };
    (config, temp_dir)
}

/// Deterministic unit-ish vector leaning toward one axis, so nearest
/// neighbour ordering is predictable.
fn axis_vector(axis: usize) -> Vec<f32> {
    (0..DIM as usize)
        .map(|i| if i == axis { 1.0 } else { 0.01 })
        .collect()
}

#[tokio::test]
async fn empty_store_counts_zero() {
    let (config, _guard) = create_test_config();
    let store = VectorStore::new(&config).await.expect("store should open");

    assert_eq!(store.count().await.expect("count should succeed"), 0);
}

#[tokio::test]
async fn insert_then_search_returns_closest_chunk() {
    let (config, _guard) = create_test_config();
    let store = VectorStore::new(&config).await.expect("store should open");

    store
        .bulk_insert(vec![
            ("service_name: Passport. fee: 50".to_string(), axis_vector(0)),
            ("service_name: Visa. fee: 100".to_string(), axis_vector(1)),
            ("service_name: License. fee: 25".to_string(), axis_vector(2)),
        ])
        .await
        .expect("insert should succeed");

    assert_eq!(store.count().await.expect("count should succeed"), 3);

    let results = store
        .search(&axis_vector(1), 2)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].text, "service_name: Visa. fee: 100");
    assert!(results[0].score >= results[1].score);
}

#[tokio::test]
async fn clear_recreates_empty_table() {
    let (config, _guard) = create_test_config();
    let store = VectorStore::new(&config).await.expect("store should open");

    store
        .bulk_insert(vec![("chunk".to_string(), axis_vector(0))])
        .await
        .expect("insert should succeed");
    assert_eq!(store.count().await.expect("count should succeed"), 1);

    store.clear().await.expect("clear should succeed");
    assert_eq!(store.count().await.expect("count should succeed"), 0);

    // The store stays usable after a clear.
    store
        .bulk_insert(vec![("fresh chunk".to_string(), axis_vector(1))])
        .await
        .expect("insert after clear should succeed");
    assert_eq!(store.count().await.expect("count should succeed"), 1);
}

#[tokio::test]
async fn insert_normalizes_doubled_periods() {
    let (config, _guard) = create_test_config();
    let store = VectorStore::new(&config).await.expect("store should open");

    store
        .bulk_insert(vec![(
            "service_name: Passport Renewal.. institution_name: Ministry A".to_string(),
            axis_vector(0),
        )])
        .await
        .expect("insert should succeed");

    let results = store
        .search(&axis_vector(0), 1)
        .await
        .expect("search should succeed");
    assert_eq!(
        results[0].text,
        "service_name: Passport Renewal. institution_name: Ministry A"
    );
}

#[tokio::test]
async fn wrong_dimension_is_rejected() {
    let (config, _guard) = create_test_config();
    let store = VectorStore::new(&config).await.expect("store should open");

    let result = store
        .bulk_insert(vec![("bad".to_string(), vec![1.0, 2.0])])
        .await;
    assert!(result.is_err());

    let result = store.search(&[1.0, 2.0], 1).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn store_reopens_existing_table() {
    let (config, _guard) = create_test_config();

    {
        let store = VectorStore::new(&config).await.expect("store should open");
        store
            .bulk_insert(vec![("persisted chunk".to_string(), axis_vector(0))])
            .await
            .expect("insert should succeed");
    }

    let reopened = VectorStore::new(&config).await.expect("store should reopen");
    assert_eq!(reopened.count().await.expect("count should succeed"), 1);
}
