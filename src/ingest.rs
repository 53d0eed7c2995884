//! Command-level orchestration.
//!
//! Builds the production adapters from a [`Config`] and hands them to the
//! driver in [`crate::pipeline`]. Results are printed to stdout in
//! `key: value` lines ending with `ok`.

use anyhow::{bail, Context, Result};
use std::num::NonZeroUsize;

use crate::config::{Config, MAX_CHUNK_SIZE};
use crate::connector_gitlab::GitLabSource;
use crate::db;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::migrate;
use crate::pipeline::{self, IndexStats};
use crate::progress::ProgressReporter;
use crate::search_index::AzureSearchIndex;
use crate::store::{self, SqliteIssueStore};

/// Fetch all group issues and replace the staging table.
pub async fn run_extract(config: &Config, progress: &dyn ProgressReporter) -> Result<()> {
    let source = GitLabSource::from_config(config)?;
    let pool = db::connect(config).await?;
    let store = SqliteIssueStore::new(pool);

    let staged =
        pipeline::extract(&source, &store, &config.tracker.group_id, progress).await?;
    let (_, digest) = store::fingerprint_store(&store, page_size(config, None)?.get()).await?;

    println!("extract group {}", config.tracker.group_id);
    println!("  records staged: {}", staged);
    println!("  fingerprint: {}", digest);
    println!("ok");

    store.pool().close().await;
    Ok(())
}

/// Embed and upload everything currently staged.
pub async fn run_index(
    config: &Config,
    chunk_size: Option<NonZeroUsize>,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let page_size = page_size(config, chunk_size)?;
    let embedder = OpenAIEmbedder::from_config(config)?;
    let index = AzureSearchIndex::from_config(config)?;
    let pool = db::connect(config).await?;
    migrate::create_staging_table(&pool).await?;
    let store = SqliteIssueStore::new(pool);

    let stats = pipeline::index_staged(&store, &embedder, &index, page_size, progress).await?;

    println!("index {}", config.search.index);
    println!("  embedding model: {}", embedder.model_name());
    print_stats(&stats, page_size);
    println!("ok");

    store.pool().close().await;
    Ok(())
}

/// Extract, stage, embed and upload in one go.
pub async fn run_all(
    config: &Config,
    chunk_size: Option<NonZeroUsize>,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let page_size = page_size(config, chunk_size)?;
    // Adapters first: a missing secret fails before any I/O.
    let source = GitLabSource::from_config(config)?;
    let embedder = OpenAIEmbedder::from_config(config)?;
    let index = AzureSearchIndex::from_config(config)?;
    let pool = db::connect(config).await?;
    let store = SqliteIssueStore::new(pool);

    let (staged, stats) = pipeline::run(
        &source,
        &store,
        &embedder,
        &index,
        &config.tracker.group_id,
        page_size,
        progress,
    )
    .await?;

    println!("run group {} -> {}", config.tracker.group_id, config.search.index);
    println!("  records staged: {}", staged);
    println!("  embedding model: {}", embedder.model_name());
    print_stats(&stats, page_size);
    println!("ok");

    store.pool().close().await;
    Ok(())
}

fn page_size(config: &Config, chunk_size: Option<NonZeroUsize>) -> Result<NonZeroUsize> {
    let size = match chunk_size {
        Some(n) => n,
        None => NonZeroUsize::new(config.pipeline.chunk_size)
            .context("pipeline.chunk_size must be > 0")?,
    };
    if size.get() > MAX_CHUNK_SIZE {
        bail!("chunk size must be <= {}", MAX_CHUNK_SIZE);
    }
    Ok(size)
}

fn print_stats(stats: &IndexStats, page_size: NonZeroUsize) {
    println!("  chunk size: {}", page_size);
    println!("  pages: {}", stats.pages);
    println!("  records read: {}", stats.records_read);
    println!("  embedded: {}", stats.embedded);
    println!("  dropped (embedding failed): {}", stats.dropped);
    println!("  upload calls: {}", stats.upload_calls);
    println!("  documents accepted: {}", stats.docs_succeeded);
    println!("  documents rejected: {}", stats.docs_failed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn config() -> Config {
        parse_config(
            r#"
[tracker]
group_id = "1234"

[db]
path = "./data/issues.sqlite"

[search]
service_name = "acme"
index = "gitlab-issues"

[pipeline]
chunk_size = 50
"#,
        )
        .unwrap()
    }

    #[test]
    fn page_size_prefers_override() {
        let cfg = config();
        assert_eq!(page_size(&cfg, None).unwrap().get(), 50);
        assert_eq!(page_size(&cfg, NonZeroUsize::new(7)).unwrap().get(), 7);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn page_size_rejects_override_beyond_store_range() {
        let cfg = config();
        let err = page_size(&cfg, NonZeroUsize::new(usize::MAX)).unwrap_err();
        assert!(err.to_string().contains("chunk size"));
        assert!(page_size(&cfg, NonZeroUsize::new(MAX_CHUNK_SIZE)).is_ok());
    }
}
