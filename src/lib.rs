//! # Issue Indexer
//!
//! A batch pipeline that makes a GitLab group's issues searchable.
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │  GitLab  │──▶│  SQLite  │──▶│  Embeddings  │──▶│ Search index │
//! │  group   │   │ staging  │   │ (per record) │   │  (per page)  │
//! └──────────┘   └──────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! Issues are fetched in full, replace the staging table, then are read
//! back in fixed-size pages. Each record's `"{title}. {description}"` text
//! is embedded; records whose embedding fails are dropped. Each page's
//! embedded documents go to the index in one upload call.
//!
//! ## Quick Start
//!
//! ```bash
//! export GITLAB_TOKEN=... OPENAI_API_KEY=... AZURE_SEARCH_API_KEY=...
//! issx init            # create the staging table
//! issx run             # extract + embed + upload
//! issx stats           # what is staged
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment secrets |
//! | [`models`] | Issue records and enriched documents |
//! | [`connector_gitlab`] | Issue source adapter |
//! | [`store`] | Staging store (SQLite and in-memory) |
//! | [`embedding`] | Embedding service adapter |
//! | [`search_index`] | Search index adapter |
//! | [`pipeline`] | Paged embed-and-upload driver |
//! | [`ingest`] | CLI command orchestration |
//! | [`db`] | Database connection |
//! | [`migrate`] | Staging schema |

pub mod config;
pub mod connector_gitlab;
pub mod db;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod search_index;
pub mod stats;
pub mod store;
