//! Invariant checks over a stored history: no duplicate rows, timestamps in
//! non-decreasing order (unparsable ones first).

use std::collections::HashSet;

use serde::Serialize;

use sleepmerge_core::types::{Dataset, Row};

use crate::sort::{SortKey, TimestampKey};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryAudit {
    pub rows: usize,
    pub duplicate_rows: usize,
    /// Adjacent pairs whose timestamps decrease.
    pub out_of_order: usize,
    pub unparsable_timestamps: usize,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
}

impl HistoryAudit {
    pub fn is_healthy(&self) -> bool {
        self.duplicate_rows == 0 && self.out_of_order == 0
    }
}

pub fn audit_history(history: &Dataset, key: &TimestampKey) -> HistoryAudit {
    let mut audit = HistoryAudit {
        rows: history.num_rows(),
        ..Default::default()
    };

    let mut seen: HashSet<&Row> = HashSet::with_capacity(history.num_rows());
    let mut prev: Option<SortKey> = None;
    for row in &history.rows {
        if !seen.insert(row) {
            audit.duplicate_rows += 1;
        }
        let k = key.key_of(row);
        match k {
            SortKey::Unparsed => audit.unparsable_timestamps += 1,
            SortKey::At(_) => {
                let value = row.field(key.column).map(str::to_string);
                if audit.first_timestamp.is_none() {
                    audit.first_timestamp = value.clone();
                }
                audit.last_timestamp = value;
            }
        }
        if prev.is_some_and(|p| p > k) {
            audit.out_of_order += 1;
        }
        prev = Some(k);
    }
    audit
}
