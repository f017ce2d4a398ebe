//! Storage Layer
//!
//! Persists labeled feature rows under a versioned column schema. The SQLite
//! store backs production runs; the in-memory store serves tests and dry runs.

mod memory;
mod record;
mod sqlite;

pub use memory::InMemoryFeatureStore;
pub use record::{FeatureRow, FeatureTable};
pub use sqlite::SqliteFeatureStore;

use async_trait::async_trait;
use eeg_core::EegError;
use feature_engine::FeatureSchema;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Schema mismatch: store has {found}, pipeline expects {expected}")]
    SchemaMismatch { expected: String, found: String },
    #[error("No schema has been created")]
    NoSchema,
    #[error("Invalid row: {0}")]
    InvalidRow(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

impl From<StorageError> for EegError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SchemaMismatch { .. } => EegError::InvalidParameter(err.to_string()),
            other => EegError::StoreFailure(other.to_string()),
        }
    }
}

/// Persistence contract shared by every feature store
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Create the table for `schema`, or check it against the persisted one.
    /// Idempotent for an identical schema; any difference is a `SchemaMismatch`.
    async fn ensure_schema(&self, schema: &FeatureSchema) -> Result<(), StorageError>;

    /// Persisted schema, if any
    async fn schema(&self) -> Result<Option<FeatureSchema>, StorageError>;

    /// Append rows atomically: either every row is committed or none is.
    /// Returns the number of rows written.
    async fn append_batch(&self, rows: &[FeatureRow]) -> Result<u64, StorageError>;

    /// Load every row tagged with one of `datasets`, in insertion order
    async fn load(&self, datasets: &[String]) -> Result<FeatureTable, StorageError>;
}

/// Check a batch against the schema before anything is written
pub(crate) fn check_batch(schema: &FeatureSchema, rows: &[FeatureRow]) -> Result<(), StorageError> {
    for (idx, row) in rows.iter().enumerate() {
        if row.values.len() != schema.len() {
            return Err(StorageError::InvalidRow(format!(
                "row {} has {} values, schema has {} columns",
                idx,
                row.values.len(),
                schema.len()
            )));
        }
        if row.values.iter().any(|v| !v.is_finite()) {
            return Err(StorageError::InvalidRow(format!(
                "row {} ({}) contains a non-finite value",
                idx, row.group_id
            )));
        }
    }
    Ok(())
}

/// Check a requested schema against the persisted one
pub(crate) fn check_schema(expected: &FeatureSchema, found: &FeatureSchema) -> Result<(), StorageError> {
    if expected.is_compatible_with(found) {
        Ok(())
    } else {
        Err(StorageError::SchemaMismatch {
            expected: describe(expected),
            found: describe(found),
        })
    }
}

fn describe(schema: &FeatureSchema) -> String {
    format!(
        "v{} ({} channels × [{}])",
        schema.version(),
        schema.channel_count(),
        schema.bands().join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_core::canonical_bands;

    #[test]
    fn test_schema_mismatch_maps_to_invalid_parameter() {
        let a = FeatureSchema::generate(14, &canonical_bands());
        let b = FeatureSchema::generate(8, &canonical_bands());
        let err: EegError = check_schema(&a, &b).unwrap_err().into();
        assert!(matches!(err, EegError::InvalidParameter(_)));
    }

    #[test]
    fn test_database_error_maps_to_store_failure() {
        let err: EegError = StorageError::DatabaseError("disk full".into()).into();
        assert!(matches!(err, EegError::StoreFailure(_)));
        assert!(err.is_recoverable());
    }
}
