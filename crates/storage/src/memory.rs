//! In-memory Feature Store

use crate::{check_batch, check_schema, FeatureRow, FeatureStore, FeatureTable, StorageError};
use async_trait::async_trait;
use feature_engine::FeatureSchema;
use std::sync::Mutex;
use tracing::{debug, info};

#[derive(Default)]
struct Inner {
    schema: Option<FeatureSchema>,
    rows: Vec<FeatureRow>,
}

/// Feature store kept in process memory
#[derive(Default)]
pub struct InMemoryFeatureStore {
    inner: Mutex<Inner>,
}

impl InMemoryFeatureStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        info!("Creating in-memory feature store");
        Self::default()
    }

    /// Get total row count
    pub fn row_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.rows.len())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }
}

#[async_trait]
impl FeatureStore for InMemoryFeatureStore {
    async fn ensure_schema(&self, schema: &FeatureSchema) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        if let Some(existing) = &inner.schema {
            return check_schema(schema, existing);
        }
        info!("Registered feature schema with {} columns", schema.len());
        inner.schema = Some(schema.clone());
        Ok(())
    }

    async fn schema(&self) -> Result<Option<FeatureSchema>, StorageError> {
        Ok(self.lock()?.schema.clone())
    }

    async fn append_batch(&self, rows: &[FeatureRow]) -> Result<u64, StorageError> {
        let mut inner = self.lock()?;
        let schema = inner.schema.as_ref().ok_or(StorageError::NoSchema)?;
        check_batch(schema, rows)?;

        inner.rows.extend_from_slice(rows);
        debug!("Appended {} rows", rows.len());
        Ok(rows.len() as u64)
    }

    async fn load(&self, datasets: &[String]) -> Result<FeatureTable, StorageError> {
        let inner = self.lock()?;
        let Some(schema) = &inner.schema else {
            return Ok(FeatureTable::default());
        };

        Ok(FeatureTable {
            columns: schema.columns().to_vec(),
            rows: inner
                .rows
                .iter()
                .filter(|r| datasets.contains(&r.dataset_name))
                .cloned()
                .collect(),
        })
    }
}
