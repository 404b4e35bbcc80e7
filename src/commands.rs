//! Implementations of the CLI subcommands.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::EmbeddingClient;
use crate::fetcher::{DocumentFetcher, doc_url_from_id};
use crate::ingest::IngestPipeline;
use crate::llm;
use crate::server;

fn load_config() -> Result<Config> {
    let config_dir = Config::default_dir()?;
    Config::load(config_dir)
}

/// Print the resolved configuration as TOML.
#[inline]
pub fn show_config() -> Result<()> {
    let config = load_config()?;
    let rendered =
        toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("# {}", config.base_dir.join("config.toml").display());
    println!("{}", rendered);
    Ok(())
}

/// Ingest a services document given a Google Doc id or sharing URL.
#[inline]
pub async fn ingest(doc: &str) -> Result<()> {
    let config = load_config()?;
    let url = if doc.contains("docs.google.com") {
        doc.to_string()
    } else {
        doc_url_from_id(doc)
    };

    info!("Ingesting services document from {}", url);

    let store = VectorStore::new(&config)
        .await
        .context("Failed to initialize vector store")?;
    let embedder = EmbeddingClient::new(&config)?;
    let pipeline = IngestPipeline::new(DocumentFetcher::new(), embedder, store);

    let stats = pipeline.ingest_url(&url).await?;

    println!("Ingestion complete:");
    println!("  Records parsed: {}", stats.records_parsed);
    println!("  Chunks stored:  {}", stats.chunks_stored);
    Ok(())
}

/// Answer a single question from the command line.
#[inline]
pub async fn ask(question: &str, limit: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let limit = limit.unwrap_or(config.search.limit);

    let store = VectorStore::new(&config)
        .await
        .context("Failed to initialize vector store")?;
    let embedder = EmbeddingClient::new(&config)?;
    let model = llm::from_config(&config)?;

    let query = question.to_string();
    let query_vector = tokio::task::spawn_blocking(move || embedder.embed_query(&query))
        .await
        .context("Embedding task panicked")?
        .context("Failed to embed question")?;

    let relevant = store.search(&query_vector, limit).await?;
    let context = relevant
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let question_owned = question.to_string();
    let answer = tokio::task::spawn_blocking(move || model.generate(&question_owned, &context))
        .await
        .context("Generation task panicked")?
        .context("Failed to generate answer")?;

    println!("{}", answer);
    Ok(())
}

/// Run the HTTP API server.
#[inline]
pub async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate().context("Configuration validation failed")?;

    server::serve(config).await
}

/// Show the state of the index and the backing services.
#[inline]
pub async fn show_status() -> Result<()> {
    let config = load_config()?;

    println!("services-rag status");
    println!("  Config dir:   {}", config.base_dir.display());
    println!("  LLM provider: {:?}", config.llm.provider);

    match VectorStore::new(&config).await {
        Ok(store) => match store.count().await {
            Ok(count) => println!("  Indexed chunks: {}", count),
            Err(e) => println!("  Indexed chunks: unavailable ({})", e),
        },
        Err(e) => println!("  Vector store: unavailable ({})", e),
    }

    let embedder = EmbeddingClient::new(&config)?;
    let health = tokio::task::spawn_blocking(move || embedder.health_check())
        .await
        .context("Health check task panicked")?;
    match health {
        Ok(()) => println!(
            "  Embedding server: ok ({} @ {}:{})",
            config.embedding.model, config.embedding.host, config.embedding.port
        ),
        Err(e) => println!("  Embedding server: unreachable ({})", e),
    }

    Ok(())
}
