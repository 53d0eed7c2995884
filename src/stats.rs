//! Staging table overview for `issx stats`.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::store::{self, SqliteIssueStore};

/// Query the staging table and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::create_staging_table(&pool).await?;
    let store = SqliteIssueStore::new(pool);

    let total = store.count().await?;
    let by_state = store.count_by_state().await?;
    let (_, digest) = store::fingerprint_store(&store, config.pipeline.chunk_size.max(1)).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Issue Indexer — Staging Stats");
    println!("=============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Table:       {}", migrate::STAGING_TABLE);
    println!("  Records:     {}", total);
    println!("  Fingerprint: {}", digest);

    if !by_state.is_empty() {
        println!();
        println!("  {:<16} {:>8}", "STATE", "RECORDS");
        for (state, n) in &by_state {
            println!("  {:<16} {:>8}", state, n);
        }
    }

    store.pool().close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
