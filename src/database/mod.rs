//! LanceDB-backed chunk store for the service text chunks.


use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::RagError;
use crate::config::Config;

const TABLE_NAME: &str = "service_chunks";

/// Vector store holding one row per service text chunk.
#[derive(Clone)]
pub struct VectorStore {
    connection: Connection,
    dimension: usize,
}

/// One retrieved chunk with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Connect to (or create) the chunk table under the configured data dir.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self, RagError> {
        let db_path = config.vector_db_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagError::Database(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            connection,
            dimension: config.embedding.dimension as usize,
        };
        store.ensure_table().await?;

        info!("Vector store initialized successfully");
        Ok(store)
    }

    /// Drop and recreate the chunk table. Ingestion is a full reload, so this
    /// runs before every bulk insert.
    #[inline]
    pub async fn clear(&self) -> Result<(), RagError> {
        self.drop_table_if_exists().await?;
        self.create_table().await?;
        info!("Cleared chunk table {}", TABLE_NAME);
        Ok(())
    }

    /// Insert a batch of `(text, vector)` chunks with fresh ids.
    #[inline]
    pub async fn bulk_insert(&self, chunks: Vec<(String, Vec<f32>)>) -> Result<(), RagError> {
        if chunks.is_empty() {
            debug!("No chunks to store");
            return Ok(());
        }

        for (_, vector) in &chunks {
            self.check_dimension(vector)?;
        }

        let record_batch = self.create_record_batch(&chunks)?;

        let table = self.open_table().await?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to insert chunks: {}", e)))?;

        info!("Successfully stored {} chunks", chunks.len());
        Ok(())
    }

    /// Nearest-neighbour search over the chunk vectors.
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        debug!("Searching for similar chunks with limit: {}", limit);
        self.check_dimension(query_vector)?;

        let table = self.open_table().await?;

        let mut results = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to execute search: {}", e)))?;

        let mut chunks = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Database(format!("Failed to read result stream: {}", e)))?
        {
            chunks.extend(parse_search_batch(&batch)?);
        }

        debug!("Search returned {} chunks", chunks.len());
        Ok(chunks)
    }

    /// Total number of stored chunks.
    #[inline]
    pub async fn count(&self) -> Result<u64, RagError> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))?;
        Ok(count as u64)
    }

    async fn open_table(&self) -> Result<lancedb::Table, RagError> {
        self.connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))
    }

    async fn ensure_table(&self) -> Result<(), RagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&TABLE_NAME.to_string()) {
            return Ok(());
        }
        self.create_table().await
    }

    async fn create_table(&self) -> Result<(), RagError> {
        self.connection
            .create_empty_table(TABLE_NAME, self.schema())
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    async fn drop_table_if_exists(&self) -> Result<(), RagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&TABLE_NAME.to_string()) {
            self.connection
                .drop_table(TABLE_NAME)
                .await
                .map_err(|e| RagError::Database(format!("Failed to drop table: {}", e)))?;
        }
        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("text", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), RagError> {
        if vector.len() != self.dimension {
            return Err(RagError::Database(format!(
                "Vector size must be {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        Ok(())
    }

    fn create_record_batch(
        &self,
        chunks: &[(String, Vec<f32>)],
    ) -> Result<RecordBatch, RagError> {
        let len = chunks.len();
        let created_at = Utc::now().to_rfc3339();

        let mut ids = Vec::with_capacity(len);
        let mut texts = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.dimension);

        for (text, vector) in chunks {
            ids.push(Uuid::new_v4().to_string());
            // Chunk texts join sentence fragments with ". "; fragments that
            // already end in a period would otherwise produce ".. ".
            texts.push(text.replace(".. ", ". "));
            created_ats.push(created_at.clone());
            flat_values.extend_from_slice(vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| RagError::Database(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(self.schema(), arrays)
            .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
    }
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<ScoredChunk>, RagError> {
    let texts = batch
        .column_by_name("text")
        .ok_or_else(|| RagError::Database("Missing text column".to_string()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Database("Invalid text column type".to_string()))?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut chunks = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        chunks.push(ScoredChunk {
            text: texts.value(row).to_string(),
            // Convert distance to similarity score (higher is better)
            score: 1.0 - distance,
            distance,
        });
    }
    Ok(chunks)
}
