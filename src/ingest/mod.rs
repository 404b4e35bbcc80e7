//! Ingestion pipeline: fetch the services document, parse it into records,
//! embed each record's text chunk, and reload the vector store.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::database::VectorStore;
use crate::embeddings::EmbeddingClient;
use crate::fetcher::DocumentFetcher;
use crate::parser::HierarchicalServiceParser;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub records_parsed: usize,
    pub chunks_stored: usize,
}

/// One full-reload ingestion pass over a single document.
///
/// The store is cleared before inserting, so every run replaces the index
/// wholesale; there is no incremental update.
#[derive(Clone)]
pub struct IngestPipeline {
    fetcher: DocumentFetcher,
    parser: HierarchicalServiceParser,
    embedder: EmbeddingClient,
    store: VectorStore,
}

impl IngestPipeline {
    #[inline]
    pub fn new(
        fetcher: DocumentFetcher,
        embedder: EmbeddingClient,
        store: VectorStore,
    ) -> Self {
        Self {
            fetcher,
            parser: HierarchicalServiceParser::new(),
            embedder,
            store,
        }
    }

    /// Ingest the document behind a Google Docs sharing URL.
    #[inline]
    pub async fn ingest_url(&self, url: &str) -> Result<IngestStats> {
        let fetcher = self.fetcher.clone();
        let url_owned = url.to_string();
        let content = tokio::task::spawn_blocking(move || fetcher.fetch_document(&url_owned))
            .await
            .context("Fetch task panicked")??;

        self.ingest_content(&content).await
    }

    /// Parse, embed, and store already-fetched document text.
    #[inline]
    pub async fn ingest_content(&self, content: &str) -> Result<IngestStats> {
        let records = self.parser.parse(content);
        if records.is_empty() {
            warn!("Document produced no service records");
        }

        let texts: Vec<String> = records.iter().map(|r| r.to_chunk_text()).collect();

        let embedder = self.embedder.clone();
        let embed_texts = texts.clone();
        let vectors =
            tokio::task::spawn_blocking(move || embedder.embed_passages_batch(&embed_texts))
                .await
                .context("Embedding task panicked")?
                .context("Failed to embed service chunks")?;

        self.store
            .clear()
            .await
            .context("Failed to clear chunk store")?;

        let chunks: Vec<(String, Vec<f32>)> = texts.into_iter().zip(vectors).collect();
        let chunks_stored = chunks.len();
        self.store
            .bulk_insert(chunks)
            .await
            .context("Failed to store service chunks")?;

        info!(
            "Ingested {} records into {} chunks",
            records.len(),
            chunks_stored
        );

        Ok(IngestStats {
            records_parsed: records.len(),
            chunks_stored,
        })
    }
}
