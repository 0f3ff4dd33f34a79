//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rand::prelude::*;
use sleepmerge_core::config::{LineTerminator, PipelineConfig};
use sleepmerge_core::schema::Header;
use sleepmerge_core::types::{Dataset, Row};
use sleepmerge_io::{read_rows, write_rows};
use tempfile::TempDir;

pub const EXPORT_HEADER: [&str; 3] = ["Date", "Duration in seconds", "Sleep stage"];

const STAGES: [&str; 4] = ["awake", "light", "deep", "rem"];

pub fn create_temp_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("sleepmerge-test-")
        .tempdir()
        .expect("create temp dir")
}

/// Config rooted at `dir`, writing LF so expected file contents stay readable.
pub fn pipeline_config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        input_dir: dir.join("input_csvs").display().to_string(),
        converted_dir: dir.join("converted_csvs").display().to_string(),
        store_dir: dir.join("combined").display().to_string(),
        line_terminator: LineTerminator::Lf,
        ..Default::default()
    }
}

/// Local wall clock used to name archive snapshots.
pub fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .and_then(|d| d.and_hms_opt(h, m, s))
        .expect("valid timestamp")
}

pub fn interval(start: &str, end: &str, stage: &str) -> Row {
    Row::from([start, end, stage])
}

/// Write a device export with `(date, seconds, stage)` records.
pub fn write_export(dir: &Path, name: &str, records: &[(&str, &str, &str)]) -> PathBuf {
    let mut rows = vec![Row::from(EXPORT_HEADER)];
    rows.extend(records.iter().map(|(d, s, c)| Row::from([*d, *s, *c])));
    let path = dir.join(name);
    write_rows(&path, &rows, LineTerminator::Lf).expect("write export");
    path
}

/// Write an already converted batch (canonical header + rows).
pub fn write_batch(path: &Path, rows: &[Row]) {
    write_dataset(path, &Dataset::new(Header::canonical(), rows.to_vec()));
}

pub fn write_dataset(path: &Path, ds: &Dataset) {
    write_rows(path, &ds.to_records(), LineTerminator::Lf).expect("write dataset");
}

pub fn read_dataset(path: &Path) -> Dataset {
    let records = read_rows(path).expect("read csv");
    Dataset::from_records(records).expect("file has a header")
}

pub fn read_text(path: &Path) -> String {
    fs::read_to_string(path).expect("read file")
}

pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// `n` canonical rows drawn from a pool of `pool` distinct intervals, so
/// batches overlap each other and contain internal duplicates.
pub fn generate_random_rows(seed: u64, n: usize, pool: u64) -> Vec<Row> {
    let base = at(1, 22, 0, 0);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let slot = rng.gen_range(0..pool) as i64;
            let start = base + TimeDelta::minutes(slot * 7);
            let end = start + TimeDelta::minutes(5);
            let stage = STAGES[(slot as usize) % STAGES.len()];
            Row::from(vec![
                start.format("%Y-%m-%d %H:%M:%S").to_string(),
                end.format("%Y-%m-%d %H:%M:%S").to_string(),
                stage.to_string(),
            ])
        })
        .collect()
}
