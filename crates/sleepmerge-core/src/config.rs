//! Pipeline configuration that downstream crates can serialize/deserialize.
//!
//! Precedence, lowest to highest: `Default` → `SLEEPMERGE_*` environment
//! variables → YAML config file → CLI flags (applied by the binary).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Record terminator used when writing CSV files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    /// `\r\n`, what earlier deployments wrote.
    #[default]
    Crlf,
    Lf,
}

impl FromStr for LineTerminator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crlf" => Ok(Self::Crlf),
            "lf" => Ok(Self::Lf),
            other => Err(Error::Config(format!("unknown line terminator '{other}'"))),
        }
    }
}

/// Where the Delta Output is handed after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PublishConfig {
    #[default]
    None,
    /// Copy the file into a local (or mounted) directory.
    Directory { dir: String },
    /// Spawn `program args... <path>`.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

/// Whether the publish collaborator runs when the merge was skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishPolicy {
    /// Publish the current Delta Output on every run, merged or not.
    #[default]
    Always,
    /// Publish only when the merge stage ran.
    OnMerge,
}

impl FromStr for PublishPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always" => Ok(Self::Always),
            "on_merge" => Ok(Self::OnMerge),
            other => Err(Error::Config(format!("unknown publish policy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the raw per-export files.
    pub input_dir: String,

    /// Directory receiving one converted file per export plus the combined batch.
    pub converted_dir: String,

    /// File name of the combined batch inside `converted_dir`.
    pub combined_name: String,

    /// Directory holding the Delta Output, Historical Store and archive snapshots.
    pub store_dir: String,
    pub delta_name: String,
    pub history_name: String,
    pub archive_prefix: String,
    /// strftime pattern for archive snapshot names.
    pub archive_stamp_format: String,

    /// Index of the timestamp field used to order the Historical Store.
    pub timestamp_column: usize,
    /// strftime pattern of the converted start/end fields.
    pub timestamp_format: String,

    /// strftime pattern of the device export `Date` field.
    pub source_timestamp_format: String,
    pub source_date_column: String,
    pub source_duration_column: String,
    pub source_category_column: String,

    pub line_terminator: LineTerminator,

    pub publish: PublishConfig,
    pub publish_policy: PublishPolicy,

    /// Optional JSONL file each run appends its manifest to.
    pub run_log: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: "input_csvs".to_string(),
            converted_dir: "converted_csvs".to_string(),
            combined_name: "combined.csv".to_string(),
            store_dir: "combined".to_string(),
            delta_name: "combined.csv".to_string(),
            history_name: "combined_old.csv".to_string(),
            archive_prefix: "combined+".to_string(),
            archive_stamp_format: "%Y%m%d_%H%M%S".to_string(),
            timestamp_column: 0,
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
            source_timestamp_format: "%Y.%m.%d %H:%M:%S".to_string(),
            source_date_column: "Date".to_string(),
            source_duration_column: "Duration in seconds".to_string(),
            source_category_column: "Sleep stage".to_string(),
            line_terminator: LineTerminator::Crlf,
            publish: PublishConfig::None,
            publish_policy: PublishPolicy::Always,
            run_log: None,
        }
    }
}

/// Resolved on-disk locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub input_dir: PathBuf,
    pub converted_dir: PathBuf,
    /// New-batch combined input (`converted_csvs/combined.csv`).
    pub batch_path: PathBuf,
    pub store_dir: PathBuf,
    /// Delta Output (`combined/combined.csv`).
    pub delta_path: PathBuf,
    /// Historical Store (`combined/combined_old.csv`).
    pub history_path: PathBuf,
    pub archive_prefix: String,
    pub archive_stamp_format: String,
}

impl StoreLayout {
    /// Path of the archive snapshot for an already formatted stamp.
    pub fn archive_path(&self, stamp: &str) -> PathBuf {
        self.store_dir
            .join(format!("{}{}.csv", self.archive_prefix, stamp))
    }
}

impl PipelineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SLEEPMERGE_INPUT_DIR`, `SLEEPMERGE_CONVERTED_DIR`, `SLEEPMERGE_COMBINED_NAME`
    /// - `SLEEPMERGE_STORE_DIR`
    /// - `SLEEPMERGE_TIMESTAMP_COLUMN`, `SLEEPMERGE_TIMESTAMP_FORMAT`
    /// - `SLEEPMERGE_SOURCE_TIMESTAMP_FORMAT`
    /// - `SLEEPMERGE_LINE_TERMINATOR` (`crlf` | `lf`)
    /// - `SLEEPMERGE_PUBLISH_DIR` or `SLEEPMERGE_PUBLISH_CMD`
    /// - `SLEEPMERGE_PUBLISH_POLICY` (`always` | `on_merge`)
    /// - `SLEEPMERGE_RUN_LOG`
    ///
    /// Unparsable numeric/enum values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PipelineConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(s) = lookup("SLEEPMERGE_INPUT_DIR") {
            cfg.input_dir = s;
        }

        if let Some(s) = lookup("SLEEPMERGE_CONVERTED_DIR") {
            cfg.converted_dir = s;
        }

        if let Some(s) = lookup("SLEEPMERGE_COMBINED_NAME") {
            cfg.combined_name = s;
        }

        if let Some(s) = lookup("SLEEPMERGE_STORE_DIR") {
            cfg.store_dir = s;
        }

        if let Some(s) = lookup("SLEEPMERGE_TIMESTAMP_COLUMN") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.timestamp_column = v;
            }
        }

        if let Some(s) = lookup("SLEEPMERGE_TIMESTAMP_FORMAT") {
            cfg.timestamp_format = s;
        }

        if let Some(s) = lookup("SLEEPMERGE_SOURCE_TIMESTAMP_FORMAT") {
            cfg.source_timestamp_format = s;
        }

        if let Some(s) = lookup("SLEEPMERGE_LINE_TERMINATOR") {
            if let Ok(v) = s.parse::<LineTerminator>() {
                cfg.line_terminator = v;
            }
        }

        if let Some(s) = lookup("SLEEPMERGE_PUBLISH_DIR") {
            cfg.publish = PublishConfig::Directory { dir: s };
        } else if let Some(s) = lookup("SLEEPMERGE_PUBLISH_CMD") {
            cfg.publish = PublishConfig::Command {
                program: s,
                args: Vec::new(),
            };
        }

        if let Some(s) = lookup("SLEEPMERGE_PUBLISH_POLICY") {
            if let Ok(v) = s.parse::<PublishPolicy>() {
                cfg.publish_policy = v;
            }
        }

        if let Some(s) = lookup("SLEEPMERGE_RUN_LOG") {
            cfg.run_log = Some(s);
        }

        cfg
    }

    /// Overlay the values present in a parsed config file.
    pub fn apply_file(&mut self, doc: &FileConfig) {
        if let Some(v) = &doc.input_dir {
            self.input_dir = v.clone();
        }
        if let Some(v) = &doc.converted_dir {
            self.converted_dir = v.clone();
        }
        if let Some(v) = &doc.combined_name {
            self.combined_name = v.clone();
        }
        if let Some(v) = &doc.store_dir {
            self.store_dir = v.clone();
        }
        if let Some(v) = &doc.delta_name {
            self.delta_name = v.clone();
        }
        if let Some(v) = &doc.history_name {
            self.history_name = v.clone();
        }
        if let Some(v) = &doc.archive_prefix {
            self.archive_prefix = v.clone();
        }
        if let Some(v) = &doc.archive_stamp_format {
            self.archive_stamp_format = v.clone();
        }
        if let Some(v) = doc.timestamp_column {
            self.timestamp_column = v;
        }
        if let Some(v) = &doc.timestamp_format {
            self.timestamp_format = v.clone();
        }
        if let Some(v) = &doc.source_timestamp_format {
            self.source_timestamp_format = v.clone();
        }
        if let Some(v) = &doc.source_date_column {
            self.source_date_column = v.clone();
        }
        if let Some(v) = &doc.source_duration_column {
            self.source_duration_column = v.clone();
        }
        if let Some(v) = &doc.source_category_column {
            self.source_category_column = v.clone();
        }
        if let Some(v) = doc.line_terminator {
            self.line_terminator = v;
        }
        if let Some(v) = &doc.publish {
            self.publish = v.clone();
        }
        if let Some(v) = doc.publish_policy {
            self.publish_policy = v;
        }
        if let Some(v) = &doc.run_log {
            self.run_log = Some(v.clone());
        }
    }

    /// Reject configurations that would write to ambiguous or empty paths.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("input_dir", &self.input_dir),
            ("converted_dir", &self.converted_dir),
            ("combined_name", &self.combined_name),
            ("store_dir", &self.store_dir),
            ("delta_name", &self.delta_name),
            ("history_name", &self.history_name),
            ("archive_stamp_format", &self.archive_stamp_format),
            ("timestamp_format", &self.timestamp_format),
            ("source_timestamp_format", &self.source_timestamp_format),
            ("source_date_column", &self.source_date_column),
            ("source_duration_column", &self.source_duration_column),
            ("source_category_column", &self.source_category_column),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("`{name}` must not be empty")));
            }
        }

        if self.delta_name == self.history_name {
            return Err(Error::Config(format!(
                "delta and history files must differ (both '{}')",
                self.delta_name
            )));
        }

        match &self.publish {
            PublishConfig::None => {}
            PublishConfig::Directory { dir } if dir.trim().is_empty() => {
                return Err(Error::Config("publish directory must not be empty".into()));
            }
            PublishConfig::Command { program, .. } if program.trim().is_empty() => {
                return Err(Error::Config("publish command must not be empty".into()));
            }
            _ => {}
        }

        Ok(())
    }

    /// Produce the on-disk layout snapshot used by the IO/exec layers.
    pub fn layout(&self) -> StoreLayout {
        let converted_dir = PathBuf::from(&self.converted_dir);
        let store_dir = PathBuf::from(&self.store_dir);
        StoreLayout {
            input_dir: PathBuf::from(&self.input_dir),
            batch_path: converted_dir.join(&self.combined_name),
            converted_dir,
            delta_path: store_dir.join(&self.delta_name),
            history_path: store_dir.join(&self.history_name),
            store_dir,
            archive_prefix: self.archive_prefix.clone(),
            archive_stamp_format: self.archive_stamp_format.clone(),
        }
    }
}

/// Partial configuration as written in a YAML file. Every key is optional.
///
/// ```yaml
/// input_dir: input_csvs
/// store_dir: combined
/// line_terminator: lf
/// publish:
///   kind: directory
///   dir: /mnt/shared/sleep
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub input_dir: Option<String>,
    pub converted_dir: Option<String>,
    pub combined_name: Option<String>,
    pub store_dir: Option<String>,
    pub delta_name: Option<String>,
    pub history_name: Option<String>,
    pub archive_prefix: Option<String>,
    pub archive_stamp_format: Option<String>,
    pub timestamp_column: Option<usize>,
    pub timestamp_format: Option<String>,
    pub source_timestamp_format: Option<String>,
    pub source_date_column: Option<String>,
    pub source_duration_column: Option<String>,
    pub source_category_column: Option<String>,
    pub line_terminator: Option<LineTerminator>,
    pub publish: Option<PublishConfig>,
    pub publish_policy: Option<PublishPolicy>,
    pub run_log: Option<String>,
}

pub fn parse_config_yaml(src: &str) -> Result<FileConfig> {
    // An empty document deserializes to unit, not a map.
    if src.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    Ok(serde_yaml::from_str(src)?)
}

pub fn load_config_file(path: &Path) -> Result<FileConfig> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| Error::IoLike(format!("read config {}: {e}", path.display())))?;
    parse_config_yaml(&src)
}
