//! SQLite Feature Store

use crate::{check_batch, check_schema, FeatureRow, FeatureStore, FeatureTable, StorageError};
use async_trait::async_trait;
use eeg_core::MentalState;
use feature_engine::FeatureSchema;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

const CREATE_SCHEMA_TABLE: &str = "CREATE TABLE IF NOT EXISTS feature_schema (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    definition TEXT NOT NULL
)";

const CREATE_DATASET_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_eeg_features_dataset ON eeg_features (dataset_name)";

/// Feature store backed by a SQLite database
pub struct SqliteFeatureStore {
    pool: SqlitePool,
}

impl SqliteFeatureStore {
    /// Open (creating if missing) the database at `database_url`
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        info!("Opening feature store at {}", database_url);
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    /// Private in-memory database; lives as long as the store
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::query(CREATE_SCHEMA_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Total persisted rows across all datasets
    pub async fn row_count(&self) -> Result<u64, StorageError> {
        let mut conn = self.pool.acquire().await?;
        if read_schema(&mut conn).await?.is_none() {
            return Ok(0);
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM eeg_features")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count as u64)
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(schema: &FeatureSchema) -> String {
    let columns: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| format!("    {} REAL NOT NULL", quote_ident(c)))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS eeg_features (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset_name TEXT NOT NULL,
    group_id TEXT NOT NULL,
    label INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
{}
)",
        columns.join(",\n")
    )
}

fn insert_sql(schema: &FeatureSchema) -> String {
    let columns: Vec<String> = schema.columns().iter().map(|c| quote_ident(c)).collect();
    let placeholders = vec!["?"; schema.len() + 3].join(", ");
    format!(
        "INSERT INTO eeg_features (dataset_name, group_id, label, {}) VALUES ({})",
        columns.join(", "),
        placeholders
    )
}

async fn read_schema(conn: &mut SqliteConnection) -> Result<Option<FeatureSchema>, StorageError> {
    let definition: Option<String> =
        sqlx::query_scalar("SELECT definition FROM feature_schema WHERE id = 1")
            .fetch_optional(&mut *conn)
            .await?;

    match definition {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

fn decode_row(record: &SqliteRow, width: usize) -> Result<FeatureRow, StorageError> {
    let code: i64 = record.try_get(2)?;
    let label = MentalState::from_code(code)
        .ok_or_else(|| StorageError::SerializationError(format!("unknown label code {}", code)))?;

    let values = (0..width)
        .map(|i| record.try_get::<f64, _>(3 + i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FeatureRow {
        dataset_name: record.try_get(0)?,
        group_id: record.try_get(1)?,
        label,
        values,
    })
}

#[async_trait]
impl FeatureStore for SqliteFeatureStore {
    async fn ensure_schema(&self, schema: &FeatureSchema) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        if let Some(existing) = read_schema(&mut tx).await? {
            return check_schema(schema, &existing);
        }

        sqlx::query(&create_table_sql(schema)).execute(&mut *tx).await?;
        sqlx::query(CREATE_DATASET_INDEX).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO feature_schema (id, version, definition) VALUES (1, ?, ?)")
            .bind(schema.version() as i64)
            .bind(serde_json::to_string(schema)?)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Created eeg_features table with {} feature columns", schema.len());
        Ok(())
    }

    async fn schema(&self) -> Result<Option<FeatureSchema>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        read_schema(&mut conn).await
    }

    async fn append_batch(&self, rows: &[FeatureRow]) -> Result<u64, StorageError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let schema = read_schema(&mut tx).await?.ok_or(StorageError::NoSchema)?;
        check_batch(&schema, rows)?;

        let sql = insert_sql(&schema);
        for row in rows {
            let mut query = sqlx::query(&sql)
                .bind(row.dataset_name.as_str())
                .bind(row.group_id.as_str())
                .bind(row.label.code());
            for value in &row.values {
                query = query.bind(*value);
            }
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!("Committed batch of {} rows", rows.len());
        Ok(rows.len() as u64)
    }

    async fn load(&self, datasets: &[String]) -> Result<FeatureTable, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let Some(schema) = read_schema(&mut conn).await? else {
            return Ok(FeatureTable::default());
        };

        let mut table = FeatureTable {
            columns: schema.columns().to_vec(),
            rows: Vec::new(),
        };
        if datasets.is_empty() {
            return Ok(table);
        }

        let columns: Vec<String> = schema.columns().iter().map(|c| quote_ident(c)).collect();
        let sql = format!(
            "SELECT dataset_name, group_id, label, {} FROM eeg_features WHERE dataset_name IN ({}) ORDER BY id",
            columns.join(", "),
            vec!["?"; datasets.len()].join(", ")
        );

        let mut query = sqlx::query(&sql);
        for dataset in datasets {
            query = query.bind(dataset.as_str());
        }

        for record in query.fetch_all(&mut *conn).await? {
            table.rows.push(decode_row(&record, schema.len())?);
        }

        debug!("Loaded {} rows for {:?}", table.len(), datasets);
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_core::canonical_bands;

    fn schema() -> FeatureSchema {
        FeatureSchema::generate(14, &canonical_bands())
    }

    fn row(dataset: &str, group: &str, label: MentalState, seed: f64) -> FeatureRow {
        FeatureRow {
            dataset_name: dataset.to_string(),
            group_id: group.to_string(),
            label,
            values: (0..56).map(|i| seed * 0.1 + i as f64 * 1e-3).collect(),
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = SqliteFeatureStore::in_memory().await.unwrap();
        store.ensure_schema(&schema()).await.unwrap();

        let batch: Vec<FeatureRow> = (0..10)
            .map(|i| row("EMOTIV", "s01", MentalState::ALL[i % 3], i as f64))
            .collect();
        assert_eq!(store.append_batch(&batch).await.unwrap(), 10);
        store
            .append_batch(&[row("DEAP", "s02_t0", MentalState::Drowsy, 99.0)])
            .await
            .unwrap();

        let table = store.load(&["EMOTIV".to_string()]).await.unwrap();
        assert_eq!(table.columns, schema().columns());
        assert_eq!(table.rows, batch);
        assert_eq!(table.class_counts(), [4, 3, 3]);

        let both = store
            .load(&["EMOTIV".to_string(), "DEAP".to_string()])
            .await
            .unwrap();
        assert_eq!(both.len(), 11);
        assert_eq!(both.rows[10].group_id, "s02_t0");
        assert_eq!(store.row_count().await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let store = SqliteFeatureStore::in_memory().await.unwrap();
        assert!(store.schema().await.unwrap().is_none());

        store.ensure_schema(&schema()).await.unwrap();
        store.ensure_schema(&schema()).await.unwrap();
        assert_eq!(store.schema().await.unwrap(), Some(schema()));
    }

    #[tokio::test]
    async fn test_schema_mismatch() {
        let store = SqliteFeatureStore::in_memory().await.unwrap();
        store.ensure_schema(&schema()).await.unwrap();

        let narrower = FeatureSchema::generate(8, &canonical_bands());
        assert!(matches!(
            store.ensure_schema(&narrower).await,
            Err(StorageError::SchemaMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_batch_writes_nothing() {
        let store = SqliteFeatureStore::in_memory().await.unwrap();
        store.ensure_schema(&schema()).await.unwrap();

        let mut bad = row("EMOTIV", "s01", MentalState::Focused, 2.0);
        bad.values[5] = f64::NAN;
        let batch = vec![row("EMOTIV", "s01", MentalState::Focused, 1.0), bad];

        assert!(matches!(
            store.append_batch(&batch).await,
            Err(StorageError::InvalidRow(_))
        ));
        assert_eq!(store.row_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_without_schema_is_empty() {
        let store = SqliteFeatureStore::in_memory().await.unwrap();
        let table = store.load(&["EMOTIV".to_string()]).await.unwrap();
        assert!(table.is_empty());
        assert!(matches!(
            store.append_batch(&[row("EMOTIV", "s", MentalState::Focused, 0.0)]).await,
            Err(StorageError::NoSchema)
        ));
    }

    #[tokio::test]
    async fn test_schema_persists_across_connections() {
        let path = std::env::temp_dir().join(format!("eeg_store_{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let url = format!("sqlite://{}", path.display());

        {
            let store = SqliteFeatureStore::connect(&url).await.unwrap();
            store.ensure_schema(&schema()).await.unwrap();
            store
                .append_batch(&[row("EMOTIV", "s01", MentalState::Unfocused, 3.0)])
                .await
                .unwrap();
            store.close().await;
        }

        let store = SqliteFeatureStore::connect(&url).await.unwrap();
        assert_eq!(store.schema().await.unwrap(), Some(schema()));
        assert_eq!(store.row_count().await.unwrap(), 1);
        store.close().await;

        let _ = std::fs::remove_file(&path);
    }
}
