// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # Quickbase App Migration Tool
//!
//! `qb-migrate` is a CLI tool and library that carries the configuration of
//! one Quickbase app over to another: code pages and formula fields are
//! rewritten so that table IDs, the app ID, the user token and the realm of
//! the source app point to their counterparts in the target app.
//!
//! ## Stages
//!
//! | Stage | Reads | Writes |
//! |-------|-------|--------|
//! | mapping | source & target tables | `tables/`, `mapping/mapping.json` |
//! | pages | configured page IDs | `pages/source/`, `pages/target/` |
//! | fields | formula fields of mapped tables | `fields/source/`, `fields/target/` |
//! | fields-length | target text fields | `fields.txt` |
//! | rules | target text & file fields, `placeholders/` | `rules/` |
//!
//! ## Quick Start
//!
//! ```bash
//! qb-migrate create-config   # writes an empty config.json
//! qb-migrate config          # checks both apps are reachable
//! qb-migrate run --dry-run   # rewrites locally without pushing
//! qb-migrate run
//! ```
//!
//! ## Configuration Example
//!
//! ```json
//! {
//!   "source": { "id": "bqsrc", "token": "b7xk_...", "realm": "acme.quickbase.com" },
//!   "target": { "id": "bqdst", "token": "b7xk_...", "realm": "acme-dev.quickbase.com" },
//!   "pages": [3, 7],
//!   "options": { "concurrency": 8, "max_retries": 2 }
//! }
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod fanout;
pub mod field_length;
pub mod fields;
pub mod mapping;
pub mod pages;
pub mod pipeline;
pub mod retry;
pub mod rewrite;
pub mod rules;
pub mod store;
pub mod ui;

pub use api::QuickbaseClient;
pub use config::{AppConfig, Config, MigrationOptions};
pub use error::{Error, Result};
pub use mapping::Mapping;
pub use pipeline::{Job, MigrationStats, Pipeline};
pub use store::Store;
