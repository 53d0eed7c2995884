//! SQLite-backed staging table.
//!
//! `replace_all` drops and recreates `gitlab_issues` inside one
//! transaction, so a failed write leaves the previous run's rows intact.
//! Pages are read in rowid order, which is insertion order for a table
//! that is only ever bulk-written.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::error::PipelineResult;
use crate::migrate::{STAGING_COLUMNS, STAGING_TABLE};
use crate::models::{split_labels, IssueRecord};

use super::IssueStore;

pub struct SqliteIssueStore {
    pool: SqlitePool,
}

impl SqliteIssueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of staged rows.
    pub async fn count(&self) -> PipelineResult<i64> {
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", STAGING_TABLE))
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Staged row counts grouped by issue state, largest first.
    pub async fn count_by_state(&self) -> PipelineResult<Vec<(String, i64)>> {
        let rows = sqlx::query(&format!(
            "SELECT state, COUNT(*) AS n FROM {} GROUP BY state ORDER BY n DESC, state",
            STAGING_TABLE
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<String, _>("state"), row.get::<i64, _>("n")))
            .collect())
    }
}

#[async_trait]
impl IssueStore for SqliteIssueStore {
    async fn replace_all(&self, records: &[IssueRecord]) -> PipelineResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", STAGING_TABLE))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("CREATE TABLE {} ({})", STAGING_TABLE, STAGING_COLUMNS))
            .execute(&mut *tx)
            .await?;

        let insert = format!(
            "INSERT INTO {} (id, title, description, state, created_at, updated_at, author, labels, content) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            STAGING_TABLE
        );
        for record in records {
            sqlx::query(&insert)
                .bind(record.id)
                .bind(&record.title)
                .bind(&record.description)
                .bind(&record.state)
                .bind(&record.created_at)
                .bind(&record.updated_at)
                .bind(&record.author)
                .bind(record.labels_joined())
                .bind(record.content())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn read_page(&self, offset: usize, limit: usize) -> PipelineResult<Vec<IssueRecord>> {
        // SQLite reads a negative LIMIT as unbounded and a negative OFFSET
        // as zero, so neither may wrap. No row lives past i64::MAX.
        let Ok(offset) = i64::try_from(offset) else {
            return Ok(Vec::new());
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query(&format!(
            r#"
            SELECT id, title, description, state, created_at, updated_at, author, labels
            FROM {}
            ORDER BY rowid
            LIMIT ? OFFSET ?
            "#,
            STAGING_TABLE
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(|row| {
                let labels: String = row.get("labels");
                IssueRecord {
                    id: row.get("id"),
                    title: row.get("title"),
                    description: row.get("description"),
                    state: row.get("state"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                    author: row.get("author"),
                    labels: split_labels(&labels),
                }
            })
            .collect();

        Ok(records)
    }
}
