#![forbid(unsafe_code)]
//! sleepmerge-core: shared types for the sleep-stage merge pipeline.
//!
//! - `types`/`schema`: schema-less rows, headers and datasets.
//! - `config`: pipeline configuration (defaults → env → YAML file) and the
//!   on-disk layout derived from it.
//! - `hash`/`manifest`: content digests and the per-run manifest.
//!
//! No CSV or filesystem work happens here apart from loading a config file.

pub mod config;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod schema;
pub mod types;

/// Crate version recorded in run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
