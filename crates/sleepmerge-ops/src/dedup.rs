//! First-occurrence de-duplication by exact field tuple.

use std::collections::HashSet;

use sleepmerge_core::types::Row;

/// Keep the first occurrence of each distinct row, preserving input order.
pub fn dedup_first<I>(rows: I) -> Vec<Row>
where
    I: IntoIterator<Item = Row>,
{
    let mut seen: HashSet<Row> = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        if !seen.contains(&row) {
            seen.insert(row.clone());
            out.push(row);
        }
    }
    out
}

/// Rows of `candidates` (in order) that do not appear in `known`.
pub fn not_in<'a>(candidates: &'a [Row], known: &[Row]) -> Vec<&'a Row> {
    let known: HashSet<&Row> = known.iter().collect();
    candidates.iter().filter(|r| !known.contains(r)).collect()
}
