//! Runtime: convert → merge → publish, and emit a RunManifest.
//!
//! - Stages run in order on the calling thread; none is retried.
//! - A conversion that yields zero rows skips the merge.
//! - Publishing follows `PublishPolicy`; its failures end up on the
//!   manifest, never in the returned `Result`.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{info, warn};

use sleepmerge_core::config::{PipelineConfig, PublishPolicy};
use sleepmerge_core::hash::hash_serde;
use sleepmerge_core::manifest::{PublishOutcome, RunManifest};
use sleepmerge_io::writers::jsonl::append_json_line;
use sleepmerge_ops::convert::{convert_batch, ConvertOptions};
use sleepmerge_ops::OpError;

use crate::metrics::emit_stage;
use crate::publish::{publisher_from_config, Publisher};
use crate::store::{HistoryStore, StoreOutcome};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("config: {0}")]
    Config(#[from] sleepmerge_core::error::Error),
    #[error(transparent)]
    Io(#[from] sleepmerge_io::Error),
    #[error(transparent)]
    Op(#[from] OpError),
    #[error("new batch not found: {0}")]
    MissingBatch(String),
    #[error("new batch has no header row: {0}")]
    EmptyBatch(String),
}

/// Engine owns the resolved config and the publish collaborator.
pub struct Engine {
    cfg: PipelineConfig,
    store: HistoryStore,
    publisher: Box<dyn Publisher>,
}

impl Engine {
    pub fn new(cfg: PipelineConfig) -> Result<Self, ExecError> {
        cfg.validate()?;
        let publisher = publisher_from_config(&cfg.publish);
        Ok(Self {
            store: HistoryStore::from_config(&cfg),
            publisher,
            cfg,
        })
    }

    /// Replace the configured publisher (tests, embedding callers).
    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Run the whole pipeline once.
    pub fn run(&self) -> Result<RunManifest, ExecError> {
        let mut manifest = RunManifest::new(now_millis());
        manifest.config_digest = Some(hash_serde(&self.cfg)?);
        info!(run = %manifest.id.0, "pipeline run started");

        let report = convert_batch(&ConvertOptions::from_config(&self.cfg))?;
        let convert_stats = report.stats();
        emit_stage(
            "convert",
            &[
                ("files", convert_stats.files_processed.to_string()),
                ("failed", convert_stats.files_failed.to_string()),
                ("rows", convert_stats.rows_converted.to_string()),
                ("skipped", convert_stats.rows_skipped.to_string()),
            ],
        );
        manifest.convert = Some(convert_stats);

        if report.combined_rows == 0 {
            info!("conversion produced no rows; merge skipped");
        } else {
            let outcome = self.merge_at(&report.combined_path)?;
            record_merge(&mut manifest, outcome);
        }

        manifest.publish = Some(self.publish(manifest.merged()));
        let manifest = manifest.finish(now_millis());
        self.append_run_log(&manifest);
        info!(
            run = %manifest.id.0,
            merged = manifest.merged(),
            elapsed_ms = manifest.finished_ms.saturating_sub(manifest.started_ms),
            "pipeline run finished"
        );
        Ok(manifest)
    }

    /// Merge an already converted batch file into the store. No conversion,
    /// no publishing.
    pub fn merge_only(&self, batch_path: &Path) -> Result<RunManifest, ExecError> {
        let mut manifest = RunManifest::new(now_millis());
        manifest.config_digest = Some(hash_serde(&self.cfg)?);
        let outcome = self.merge_at(batch_path)?;
        record_merge(&mut manifest, outcome);
        let manifest = manifest.finish(now_millis());
        self.append_run_log(&manifest);
        Ok(manifest)
    }

    fn merge_at(&self, batch_path: &Path) -> Result<StoreOutcome, ExecError> {
        let now = chrono::Local::now().naive_local();
        let outcome = self.store.merge_batch(batch_path, now)?;
        let s = &outcome.stats;
        emit_stage(
            "merge",
            &[
                ("batch_rows", s.batch_rows.to_string()),
                ("unique_batch_rows", s.unique_batch_rows.to_string()),
                ("delta_rows", s.delta_rows.to_string()),
                ("history_rows", s.history_rows_after.to_string()),
                ("sort_fallbacks", s.sort_fallbacks.to_string()),
            ],
        );
        Ok(outcome)
    }

    fn publish(&self, merged: bool) -> PublishOutcome {
        if self.cfg.publish_policy == PublishPolicy::OnMerge && !merged {
            return PublishOutcome::Skipped {
                reason: "merge skipped".into(),
            };
        }
        let path = &self.store.layout().delta_path;
        if !path.exists() {
            return PublishOutcome::Skipped {
                reason: format!("{} does not exist", path.display()),
            };
        }

        let name = self.publisher.name();
        match self.publisher.publish(path) {
            Ok(()) => {
                emit_stage("publish", &[("publisher", name.to_string())]);
                PublishOutcome::Published {
                    publisher: name.to_string(),
                    path: path.display().to_string(),
                }
            }
            Err(e) => {
                // The merge is already on disk.
                warn!(publisher = name, error = %e, "publish failed");
                PublishOutcome::Failed {
                    publisher: name.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    fn append_run_log(&self, manifest: &RunManifest) {
        if let Some(log) = &self.cfg.run_log {
            if let Err(e) = append_json_line(Path::new(log), manifest) {
                warn!(path = %log, error = %e, "could not append to run log");
            }
        }
    }
}

fn record_merge(manifest: &mut RunManifest, outcome: StoreOutcome) {
    manifest.archived_to = outcome
        .archived_to
        .map(|p| p.display().to_string());
    manifest.delta_digest = Some(outcome.delta_digest);
    manifest.history_digest = Some(outcome.history_digest);
    manifest.merge = Some(outcome.stats);
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
