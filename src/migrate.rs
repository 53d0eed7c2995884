use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Name of the staging table.
pub const STAGING_TABLE: &str = "gitlab_issues";

/// Column layout shared by `init` and the whole-table replace in the store.
pub(crate) const STAGING_COLUMNS: &str = r#"
    id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    author TEXT NOT NULL,
    labels TEXT NOT NULL,
    content TEXT NOT NULL
"#;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_staging_table(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the staging table if it is missing. Idempotent.
pub async fn create_staging_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        STAGING_TABLE, STAGING_COLUMNS
    ))
    .execute(pool)
    .await?;
    Ok(())
}
