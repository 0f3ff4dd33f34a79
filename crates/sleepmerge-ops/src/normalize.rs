//! Device-export record → canonical `{start, end, sleep}` row.
//!
//! A record that cannot be normalized is *skipped*, never fatal: callers get a
//! `RowSkip` describing why and carry on with the next record.

use chrono::{NaiveDateTime, TimeDelta};
use thiserror::Error;

use sleepmerge_core::config::PipelineConfig;
use sleepmerge_core::schema::Header;
use sleepmerge_core::types::Row;

use crate::error::OpError;

/// Why a source record was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowSkip {
    #[error("record has no value for column '{column}'")]
    MissingField { column: String },

    #[error("cannot parse date '{value}' with format '{format}'")]
    BadDate { value: String, format: String },

    #[error("cannot parse duration '{value}' as whole seconds")]
    BadDuration { value: String },

    #[error("end of interval out of range: '{start}' + {seconds}s")]
    OutOfRange { start: String, seconds: i64 },
}

/// Column names and timestamp formats of the export shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeSpec {
    pub date_column: String,
    pub duration_column: String,
    pub category_column: String,
    pub source_format: String,
    pub output_format: String,
}

impl NormalizeSpec {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            date_column: cfg.source_date_column.clone(),
            duration_column: cfg.source_duration_column.clone(),
            category_column: cfg.source_category_column.clone(),
            source_format: cfg.source_timestamp_format.clone(),
            output_format: cfg.timestamp_format.clone(),
        }
    }
}

impl Default for NormalizeSpec {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Normalizer bound to one file's header.
#[derive(Debug, Clone)]
pub struct Normalizer {
    spec: NormalizeSpec,
    date_idx: usize,
    duration_idx: usize,
    category_idx: usize,
}

impl Normalizer {
    /// Locate the needed columns in `header`. `path` is only used for errors.
    pub fn from_header(header: &Header, spec: &NormalizeSpec, path: &str) -> Result<Self, OpError> {
        // Exports sometimes start with a UTF-8 BOM glued to the first name.
        let names = Header::new(header.columns.iter().map(|c| c.trim_start_matches('\u{feff}')));
        let locate = |column: &str| {
            names
                .index_of(column)
                .ok_or_else(|| OpError::MissingColumn {
                    path: path.to_string(),
                    column: column.to_string(),
                })
        };
        Ok(Self {
            date_idx: locate(&spec.date_column)?,
            duration_idx: locate(&spec.duration_column)?,
            category_idx: locate(&spec.category_column)?,
            spec: spec.clone(),
        })
    }

    pub fn normalize(&self, row: &Row) -> Result<Row, RowSkip> {
        let field = |idx: usize, column: &str| {
            row.field(idx).ok_or_else(|| RowSkip::MissingField {
                column: column.to_string(),
            })
        };
        let date = field(self.date_idx, &self.spec.date_column)?;
        let duration = field(self.duration_idx, &self.spec.duration_column)?;
        let category = field(self.category_idx, &self.spec.category_column)?;
        normalize_record(date, duration, category, &self.spec)
    }
}

/// Convert one record given its three raw values.
///
/// `start` is `date` re-rendered in the output format, `end = start + duration`
/// and the category passes through untouched. Date is checked before duration.
pub fn normalize_record(
    date: &str,
    duration: &str,
    category: &str,
    spec: &NormalizeSpec,
) -> Result<Row, RowSkip> {
    let start = NaiveDateTime::parse_from_str(date, &spec.source_format).map_err(|_| {
        RowSkip::BadDate {
            value: date.to_string(),
            format: spec.source_format.clone(),
        }
    })?;

    let seconds: i64 = duration
        .trim()
        .parse()
        .map_err(|_| RowSkip::BadDuration {
            value: duration.to_string(),
        })?;

    let out_of_range = || RowSkip::OutOfRange {
        start: date.to_string(),
        seconds,
    };
    let delta = TimeDelta::try_seconds(seconds).ok_or_else(out_of_range)?;
    let end = start.checked_add_signed(delta).ok_or_else(out_of_range)?;

    Ok(Row::new(vec![
        start.format(&spec.output_format).to_string(),
        end.format(&spec.output_format).to_string(),
        category.to_string(),
    ]))
}
