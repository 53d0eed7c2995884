//! # Issue Indexer CLI (`issx`)
//!
//! ## Usage
//!
//! ```bash
//! issx --config ./config/issx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `issx init` | Create the SQLite database and staging table |
//! | `issx extract` | Fetch all group issues and replace the staging table |
//! | `issx index` | Embed staged issues and upload them page by page |
//! | `issx run` | `extract` followed by `index` |
//! | `issx stats` | Summarize what is staged |
//!
//! Secrets are read from `GITLAB_TOKEN`, `OPENAI_API_KEY` and
//! `AZURE_SEARCH_API_KEY`. Logging goes to stderr and honours `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use issue_indexer::progress::ProgressMode;
use issue_indexer::{config, ingest, migrate, stats};

/// Issue Indexer — stage GitLab group issues, embed them, and upload them
/// to a search index.
#[derive(Parser)]
#[command(name = "issx", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/issx.toml")]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and staging table. Safe to run repeatedly.
    Init,

    /// Fetch every issue of the configured group and replace the staging table.
    Extract,

    /// Embed staged issues and upload them, one batch per page.
    Index {
        /// Override `pipeline.chunk_size` (records per page).
        #[arg(long)]
        chunk_size: Option<NonZeroUsize>,
    },

    /// Extract, then index.
    Run {
        /// Override `pipeline.chunk_size` (records per page).
        #[arg(long)]
        chunk_size: Option<NonZeroUsize>,
    },

    /// Show staged record counts and fingerprint.
    Stats,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;
    let reporter = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Extract => {
            ingest::run_extract(&cfg, reporter.as_ref()).await?;
        }
        Commands::Index { chunk_size } => {
            ingest::run_index(&cfg, chunk_size, reporter.as_ref()).await?;
        }
        Commands::Run { chunk_size } => {
            ingest::run_all(&cfg, chunk_size, reporter.as_ref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
