//! Stable sort of rows by a parsed timestamp field.
//!
//! A field that is missing or does not parse sorts as the earliest possible
//! instant (`SortKey::Unparsed`). That is an explicit branch of the key, not
//! an error: the caller gets the count back in `SortReport` and each fallback
//! is logged at debug level.

use chrono::NaiveDateTime;

use sleepmerge_core::config::PipelineConfig;
use sleepmerge_core::types::Row;

/// Ordering key. `Unparsed` compares below every parsed instant and equal to
/// other `Unparsed` keys, so those rows keep their relative input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Unparsed,
    At(NaiveDateTime),
}

impl SortKey {
    pub fn is_fallback(&self) -> bool {
        matches!(self, SortKey::Unparsed)
    }
}

/// Which field holds the timestamp and how to parse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampKey {
    pub column: usize,
    pub format: String,
}

impl TimestampKey {
    pub fn new(column: usize, format: impl Into<String>) -> Self {
        Self {
            column,
            format: format.into(),
        }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(cfg.timestamp_column, cfg.timestamp_format.clone())
    }

    pub fn key_of(&self, row: &Row) -> SortKey {
        match row
            .field(self.column)
            .and_then(|v| NaiveDateTime::parse_from_str(v, &self.format).ok())
        {
            Some(ts) => SortKey::At(ts),
            None => SortKey::Unparsed,
        }
    }
}

impl Default for TimestampKey {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortReport {
    /// Rows whose timestamp fell back to the minimum instant.
    pub fallbacks: usize,
}

impl SortReport {
    pub fn fell_back(&self) -> bool {
        self.fallbacks > 0
    }
}

/// Sort `rows` ascending by timestamp, stably.
pub fn sort_by_timestamp(rows: &mut Vec<Row>, key: &TimestampKey) -> SortReport {
    let mut report = SortReport::default();
    let mut keyed: Vec<(SortKey, Row)> = rows
        .drain(..)
        .map(|row| {
            let k = key.key_of(&row);
            if k.is_fallback() {
                report.fallbacks += 1;
                tracing::debug!(
                    value = row.field(key.column).unwrap_or("<missing>"),
                    column = key.column,
                    "timestamp unparsable; sorting row first"
                );
            }
            (k, row)
        })
        .collect();

    // `sort_by` is stable.
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    rows.extend(keyed.into_iter().map(|(_, row)| row));
    report
}

/// True when every adjacent pair is in non-decreasing key order.
pub fn is_sorted_by_timestamp(rows: &[Row], key: &TimestampKey) -> bool {
    rows.windows(2)
        .all(|w| key.key_of(&w[0]) <= key.key_of(&w[1]))
}
