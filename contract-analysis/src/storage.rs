//! Persistence seam for completed analyses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::error::{AnalysisError, Result};
use crate::models::{AnalysisRecord, AnalysisResult};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS contract_analyses (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    file_name TEXT NOT NULL,
    analysis JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
)";

const CREATE_INDEX: &str = "CREATE INDEX IF NOT EXISTS contract_analyses_user_recency
    ON contract_analyses (user_id, created_at DESC)";

/// Datastore for analysis records.
///
/// Listing is always scoped to one user and ordered newest first; there is
/// deliberately no unscoped read.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn insert(&self, record: AnalysisRecord) -> Result<()>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<AnalysisRecord>>;
}

/// In-memory implementation of AnalysisStore
pub struct InMemoryAnalysisStore {
    records: DashMap<Uuid, AnalysisRecord>,
}

impl InMemoryAnalysisStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl Default for InMemoryAnalysisStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn insert(&self, record: AnalysisRecord) -> Result<()> {
        self.records.insert(record.id, record);
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<AnalysisRecord>> {
        let mut records: Vec<AnalysisRecord> = self
            .records
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

/// Postgres implementation of AnalysisStore
pub struct PostgresAnalysisStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct AnalysisRow {
    id: Uuid,
    user_id: String,
    file_name: String,
    analysis: sqlx::types::Json<AnalysisResult>,
    created_at: DateTime<Utc>,
}

impl From<AnalysisRow> for AnalysisRecord {
    fn from(row: AnalysisRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            file_name: row.file_name,
            analysis: row.analysis.0,
            created_at: row.created_at,
        }
    }
}

impl PostgresAnalysisStore {
    /// Connect to Postgres and make sure the `contract_analyses` table and
    /// its user/recency index exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| AnalysisError::Storage(format!("failed to connect to database: {e}")))?;

        for statement in [CREATE_TABLE, CREATE_INDEX] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| AnalysisError::Storage(format!("failed to prepare schema: {e}")))?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl AnalysisStore for PostgresAnalysisStore {
    async fn insert(&self, record: AnalysisRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO contract_analyses (id, user_id, file_name, analysis, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(&record.file_name)
        .bind(sqlx::types::Json(&record.analysis))
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AnalysisError::Storage(format!("failed to insert analysis: {e}")))?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<AnalysisRecord>> {
        let rows: Vec<AnalysisRow> = sqlx::query_as(
            "SELECT id, user_id, file_name, analysis, created_at
             FROM contract_analyses
             WHERE user_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AnalysisError::Storage(format!("failed to load analyses: {e}")))?;

        Ok(rows.into_iter().map(AnalysisRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::models::SectionSummary;

    fn sample_analysis() -> AnalysisResult {
        AnalysisResult {
            summary: "Residential lease".to_string(),
            risks: vec!["Late fee escalates".to_string()],
            obligations: vec!["Pay rent monthly".to_string()],
            red_flags: vec![],
            section_summaries: vec![SectionSummary {
                section: "Term".to_string(),
                summary: "Twelve months".to_string(),
            }],
        }
    }

    fn record_at(user: &str, file: &str, created_at: DateTime<Utc>) -> AnalysisRecord {
        AnalysisRecord {
            id: Uuid::new_v4(),
            user_id: user.to_string(),
            file_name: file.to_string(),
            analysis: sample_analysis(),
            created_at,
        }
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_requested_user() {
        let store = InMemoryAnalysisStore::new();
        let now = Utc::now();
        store.insert(record_at("alice", "lease.pdf", now)).await.unwrap();
        store.insert(record_at("bob", "nda.pdf", now)).await.unwrap();

        let records = store.list_for_user("alice").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_name, "lease.pdf");
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let store = InMemoryAnalysisStore::new();
        let now = Utc::now();
        store
            .insert(record_at("alice", "oldest.pdf", now - Duration::hours(2)))
            .await
            .unwrap();
        store.insert(record_at("alice", "newest.pdf", now)).await.unwrap();
        store
            .insert(record_at("alice", "middle.pdf", now - Duration::hours(1)))
            .await
            .unwrap();

        let records = store.list_for_user("alice").await.unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["newest.pdf", "middle.pdf", "oldest.pdf"]);
    }

    #[tokio::test]
    async fn unknown_user_gets_an_empty_list() {
        let store = InMemoryAnalysisStore::new();
        assert!(store.list_for_user("nobody").await.unwrap().is_empty());
    }
}
