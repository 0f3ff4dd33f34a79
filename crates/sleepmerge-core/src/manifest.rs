//! Per-run manifest for audit.
//!
//! The orchestrator emits one manifest per run. It records what each stage
//! did and digests of the files written so two runs can be compared.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

/// Counters reported by the batch converter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub rows_converted: usize,
    pub rows_skipped: usize,
}

/// Counters reported by the history merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub batch_rows: usize,
    pub unique_batch_rows: usize,
    pub history_rows_before: usize,
    pub delta_rows: usize,
    pub history_rows_after: usize,
    /// Rows whose timestamp failed to parse and sorted first.
    pub sort_fallbacks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome {
    Skipped { reason: String },
    Published { publisher: String, path: String },
    Failed { publisher: String, error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    /// Crate version string for provenance.
    pub version: String,

    /// Digest of the resolved pipeline config, so runs with different
    /// settings can be told apart in the run log.
    pub config_digest: Option<Hash256>,

    pub convert: Option<ConvertStats>,
    pub merge: Option<MergeStats>,

    /// Where the previous Delta Output was archived, if one existed.
    pub archived_to: Option<String>,

    pub delta_digest: Option<Hash256>,
    pub history_digest: Option<Hash256>,

    pub publish: Option<PublishOutcome>,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            version: crate::VERSION.to_string(),
            config_digest: None,
            convert: None,
            merge: None,
            archived_to: None,
            delta_digest: None,
            history_digest: None,
            publish: None,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64) -> Self {
        self.finished_ms = finished_ms;
        self
    }

    /// True when the merge stage ran and wrote a new store.
    pub fn merged(&self) -> bool {
        self.merge.is_some()
    }
}
