//! File protocol around the in-memory merge.
//!
//! Order of effects for one merge:
//! 1. read the new batch (missing/empty → hard stop, nothing touched);
//! 2. read the history, if any;
//! 3. compute delta + next history in memory;
//! 4. rename the previous Delta Output to an archive snapshot;
//! 5. write the new Delta Output;
//! 6. overwrite the Historical Store.
//!
//! Each file write is atomic on its own, but 5 and 6 are not atomic
//! together: a crash between them leaves a fresh delta next to a stale store.
//! Only one run may touch a store at a time; nothing here locks it.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{info, warn};

use sleepmerge_core::config::{LineTerminator, PipelineConfig, StoreLayout};
use sleepmerge_core::hash::{hash_dataset, Hash256};
use sleepmerge_core::manifest::MergeStats;
use sleepmerge_core::types::Dataset;
use sleepmerge_io::{read_rows, write_rows, FsStorage};
use sleepmerge_ops::merge::merge_history;
use sleepmerge_ops::sort::TimestampKey;

use crate::runtime::ExecError;

#[derive(Debug, Clone)]
pub struct StoreOutcome {
    pub stats: MergeStats,
    pub archived_to: Option<PathBuf>,
    pub delta_path: PathBuf,
    pub history_path: PathBuf,
    pub delta_digest: Hash256,
    pub history_digest: Hash256,
}

pub struct HistoryStore {
    layout: StoreLayout,
    key: TimestampKey,
    terminator: LineTerminator,
    storage: FsStorage,
}

impl HistoryStore {
    pub fn new(layout: StoreLayout, key: TimestampKey, terminator: LineTerminator) -> Self {
        Self {
            layout,
            key,
            terminator,
            storage: FsStorage::new(),
        }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(cfg.layout(), TimestampKey::from_config(cfg), cfg.line_terminator)
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Read the new batch. A missing file or one without even a header row
    /// is a hard stop.
    pub fn load_batch(&self, path: &Path) -> Result<Dataset, ExecError> {
        if !self.storage.exists(path) {
            return Err(ExecError::MissingBatch(path.display().to_string()));
        }
        let records = read_rows(path)?;
        Dataset::from_records(records).ok_or_else(|| ExecError::EmptyBatch(path.display().to_string()))
    }

    /// Read the Historical Store. Absent or empty files yield `None`.
    pub fn load_history(&self) -> Result<Option<Dataset>, ExecError> {
        let path = &self.layout.history_path;
        if !self.storage.exists(path) {
            return Ok(None);
        }
        Ok(Dataset::from_records(read_rows(path)?))
    }

    /// Rename the current Delta Output to `<prefix><stamp>.csv`.
    pub fn archive_delta(&self, now: NaiveDateTime) -> Result<Option<PathBuf>, ExecError> {
        let delta = &self.layout.delta_path;
        if !self.storage.exists(delta) {
            return Ok(None);
        }
        let stamp = now.format(&self.layout.archive_stamp_format).to_string();
        let target = self.layout.archive_path(&stamp);
        if self.storage.exists(&target) {
            // Two runs within one stamp period; the older snapshot is lost.
            warn!(snapshot = %target.display(), "archive snapshot already exists; overwriting");
        }
        self.storage.rename(delta, &target)?;
        info!(snapshot = %target.display(), "archived previous delta output");
        Ok(Some(target))
    }

    /// Merge the batch at `batch_path` into the store. `now` names the
    /// archive snapshot.
    pub fn merge_batch(&self, batch_path: &Path, now: NaiveDateTime) -> Result<StoreOutcome, ExecError> {
        let batch = self.load_batch(batch_path)?;
        let history = self.load_history()?;
        if history.is_none() {
            info!(path = %self.layout.history_path.display(), "no history yet; bootstrapping from batch");
        }

        let outcome = merge_history(&batch, history.as_ref(), &self.key);
        if outcome.sort.fell_back() {
            warn!(
                rows = outcome.sort.fallbacks,
                "history rows with unparsable timestamps sorted first"
            );
        }

        self.storage.ensure_dir(&self.layout.store_dir)?;
        let archived_to = self.archive_delta(now)?;

        write_rows(&self.layout.delta_path, &outcome.delta.to_records(), self.terminator)?;
        info!(
            path = %self.layout.delta_path.display(),
            rows = outcome.delta.num_rows(),
            "delta output written"
        );

        crate::fail_point!("after_delta_write");

        write_rows(&self.layout.history_path, &outcome.history.to_records(), self.terminator)?;
        info!(
            path = %self.layout.history_path.display(),
            rows = outcome.history.num_rows(),
            "historical store written"
        );

        Ok(StoreOutcome {
            stats: outcome.stats,
            archived_to,
            delta_path: self.layout.delta_path.clone(),
            history_path: self.layout.history_path.clone(),
            delta_digest: hash_dataset(&outcome.delta),
            history_digest: hash_dataset(&outcome.history),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    fn config_in(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            converted_dir: dir.join("converted_csvs").display().to_string(),
            store_dir: dir.join("combined").display().to_string(),
            line_terminator: LineTerminator::Lf,
            ..Default::default()
        }
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    #[test]
    fn missing_batch_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        let store = HistoryStore::from_config(&cfg);
        let err = store
            .merge_batch(&cfg.layout().batch_path, at(1, 0, 0))
            .unwrap_err();
        assert!(matches!(err, ExecError::MissingBatch(_)));
        assert!(!cfg.layout().store_dir.exists());
    }

    #[test]
    fn empty_batch_file_is_a_hard_stop() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        let layout = cfg.layout();
        fs::create_dir_all(&layout.converted_dir).unwrap();
        fs::write(&layout.batch_path, "").unwrap();
        fs::create_dir_all(&layout.store_dir).unwrap();
        fs::write(&layout.delta_path, "start datetime,end datetime,sleep\n").unwrap();

        let store = HistoryStore::from_config(&cfg);
        let err = store.merge_batch(&layout.batch_path, at(1, 0, 0)).unwrap_err();
        assert!(matches!(err, ExecError::EmptyBatch(_)));
        // previous delta is neither archived nor replaced
        assert!(layout.delta_path.exists());
        assert_eq!(fs::read_dir(&layout.store_dir).unwrap().count(), 1);
    }

    #[test]
    fn archive_uses_stamp_format() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        let layout = cfg.layout();
        fs::create_dir_all(&layout.store_dir).unwrap();
        fs::write(&layout.delta_path, "old").unwrap();

        let store = HistoryStore::from_config(&cfg);
        let archived = store.archive_delta(at(13, 4, 5)).unwrap().unwrap();
        assert_eq!(
            archived.file_name().unwrap().to_string_lossy(),
            "combined+20240102_130405.csv"
        );
        assert!(!layout.delta_path.exists());
        assert_eq!(fs::read_to_string(archived).unwrap(), "old");
    }

    #[test]
    fn empty_history_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        let layout = cfg.layout();
        fs::create_dir_all(&layout.store_dir).unwrap();
        fs::write(&layout.history_path, "").unwrap();
        let store = HistoryStore::from_config(&cfg);
        assert!(store.load_history().unwrap().is_none());
    }
}
