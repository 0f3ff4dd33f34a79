//! In-memory history merge.
//!
//! Given a new batch and the current history, compute
//! - the delta: batch rows (first occurrence only) absent from history, in
//!   batch order;
//! - the next history: history rows followed by the delta, de-duplicated and
//!   stably sorted by timestamp.
//!
//! The dedup sets are local to each call. Writing the results is the
//! caller's job (`sleepmerge-exec::store`).

use sleepmerge_core::manifest::MergeStats;
use sleepmerge_core::types::{Dataset, Row};

use crate::dedup::{dedup_first, not_in};
use crate::sort::{sort_by_timestamp, SortReport, TimestampKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Batch header + rows new relative to the history passed in.
    pub delta: Dataset,
    /// The de-duplicated, time-sorted history to persist.
    pub history: Dataset,
    pub sort: SortReport,
    pub stats: MergeStats,
}

/// Merge `batch` into `history`. An absent history is an empty dataset whose
/// header is the batch header.
pub fn merge_history(batch: &Dataset, history: Option<&Dataset>, key: &TimestampKey) -> MergeOutcome {
    let unique_new = dedup_first(batch.rows.iter().cloned());

    let (history_header, history_rows) = match history {
        Some(h) => (h.header.clone(), h.rows.as_slice()),
        None => (batch.header.clone(), &[][..]),
    };

    let delta: Vec<Row> = not_in(&unique_new, history_rows)
        .into_iter()
        .cloned()
        .collect();

    // Every delta row is absent from history by construction; dedup again
    // because history itself may carry duplicates from older writers.
    let combined = history_rows.iter().chain(delta.iter()).cloned();
    let mut next_rows = dedup_first(combined);
    let sort = sort_by_timestamp(&mut next_rows, key);

    let stats = MergeStats {
        batch_rows: batch.num_rows(),
        unique_batch_rows: unique_new.len(),
        history_rows_before: history_rows.len(),
        delta_rows: delta.len(),
        history_rows_after: next_rows.len(),
        sort_fallbacks: sort.fallbacks,
    };

    MergeOutcome {
        delta: Dataset::new(batch.header.clone(), delta),
        history: Dataset::new(history_header, next_rows),
        sort,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleepmerge_core::schema::Header;

    fn interval(start: &str, end: &str, stage: &str) -> Row {
        Row::from([start, end, stage])
    }

    fn batch(rows: Vec<Row>) -> Dataset {
        Dataset::new(Header::canonical(), rows)
    }

    #[test]
    fn first_run_bootstraps_history_from_unique_batch() {
        let a = interval("2024-01-01 00:00:00", "2024-01-01 00:05:00", "N2");
        let b = interval("2024-01-01 00:05:00", "2024-01-01 00:10:00", "N2");
        let out = merge_history(
            &batch(vec![b.clone(), a.clone(), b.clone()]),
            None,
            &TimestampKey::default(),
        );
        assert_eq!(out.delta.rows, vec![b.clone(), a.clone()]);
        assert_eq!(out.history.rows, vec![a, b]);
        assert_eq!(out.history.header, Header::canonical());
        assert_eq!(out.stats.unique_batch_rows, 2);
    }

    #[test]
    fn rows_already_in_history_are_dropped_from_delta() {
        let a = interval("2024-01-02 10:00:00", "2024-01-02 10:30:00", "REM");
        let b = interval("2024-01-01 09:00:00", "2024-01-01 09:30:00", "N1");
        let history = batch(vec![a.clone()]);
        let out = merge_history(
            &batch(vec![b.clone(), a.clone()]),
            Some(&history),
            &TimestampKey::default(),
        );
        assert_eq!(out.delta.rows, vec![b.clone()]);
        assert_eq!(out.history.rows, vec![b, a]);
        assert_eq!(out.stats.delta_rows, 1);
        assert_eq!(out.stats.history_rows_after, 2);
    }

    #[test]
    fn history_header_wins_when_present() {
        let history = Dataset::new(Header::new(["start", "end", "stage"]), vec![]);
        let out = merge_history(
            &batch(vec![interval("2024-01-01 00:00:00", "x", "N2")]),
            Some(&history),
            &TimestampKey::default(),
        );
        assert_eq!(out.history.header, Header::new(["start", "end", "stage"]));
        assert_eq!(out.delta.header, Header::canonical());
    }

    #[test]
    fn empty_batch_leaves_history_rows_unchanged() {
        let rows = vec![
            interval("2024-01-01 00:00:00", "x", "N2"),
            interval("2024-01-01 01:00:00", "x", "N3"),
        ];
        let history = batch(rows.clone());
        let out = merge_history(&batch(vec![]), Some(&history), &TimestampKey::default());
        assert!(out.delta.is_empty());
        assert_eq!(out.history.rows, rows);
    }

    #[test]
    fn duplicate_history_rows_collapse() {
        let a = interval("2024-01-01 00:00:00", "x", "N2");
        let history = batch(vec![a.clone(), a.clone()]);
        let out = merge_history(&batch(vec![]), Some(&history), &TimestampKey::default());
        assert_eq!(out.history.rows, vec![a]);
        assert_eq!(out.stats.history_rows_before, 2);
        assert_eq!(out.stats.history_rows_after, 1);
    }

    #[test]
    fn unparsable_history_timestamps_sort_first() {
        let good = interval("2024-01-01 00:00:00", "x", "N2");
        let bad = interval("not a time", "x", "N2");
        let history = batch(vec![good.clone()]);
        let out = merge_history(&batch(vec![bad.clone()]), Some(&history), &TimestampKey::default());
        assert_eq!(out.history.rows, vec![bad, good]);
        assert_eq!(out.stats.sort_fallbacks, 1);
    }
}
