//! Batch converter tests over whole directories.

mod test_data_gen;

use std::fs;

use sleepmerge_core::config::PipelineConfig;
use sleepmerge_ops::convert::{convert_batch, ConvertOptions};
use sleepmerge_ops::OpError;
use test_data_gen::{create_temp_dir, interval, read_dataset, read_text, write_export};

fn options(dir: &std::path::Path) -> ConvertOptions {
    let mut cfg = test_data_gen::pipeline_config(dir);
    cfg.combined_name = "combined.csv".into();
    ConvertOptions::from_config(&cfg)
}

#[test]
fn combines_exports_in_file_name_order() {
    let dir = create_temp_dir();
    let opts = options(dir.path());
    fs::create_dir_all(&opts.input_dir).unwrap();

    write_export(
        &opts.input_dir,
        "b_night.csv",
        &[("2024.03.02 23:00:00", "60", "rem")],
    );
    write_export(
        &opts.input_dir,
        "a_night.csv",
        &[
            ("2024.03.01 23:00:00", "600", "light"),
            ("2024.03.01 23:10:00", "-30", "awake"),
        ],
    );
    fs::write(opts.input_dir.join("notes.txt"), "not an export").unwrap();

    let report = convert_batch(&opts).unwrap();
    assert_eq!(report.combined_rows, 3);
    assert_eq!(report.files.len(), 2);
    assert!(report.failures.is_empty());

    let combined = read_dataset(&report.combined_path);
    assert_eq!(
        combined.rows,
        vec![
            interval("2024-03-01 23:00:00", "2024-03-01 23:10:00", "light"),
            interval("2024-03-01 23:10:00", "2024-03-01 23:09:30", "awake"),
            interval("2024-03-02 23:00:00", "2024-03-02 23:01:00", "rem"),
        ]
    );
    // per-file outputs sit next to the combined batch
    assert_eq!(read_dataset(&opts.output_dir.join("b_night.csv")).num_rows(), 1);
}

#[test]
fn bad_rows_are_skipped_and_reported() {
    let dir = create_temp_dir();
    let opts = options(dir.path());
    fs::create_dir_all(&opts.input_dir).unwrap();
    write_export(
        &opts.input_dir,
        "night.csv",
        &[
            ("2024.03.01 23:00:00", "600", "light"),
            ("01/03/2024 23:10", "600", "deep"),
            ("2024.03.01 23:20:00", "ten", "deep"),
            ("2024.03.01 23:30:00", "60", "rem"),
        ],
    );

    let report = convert_batch(&opts).unwrap();
    let stats = report.stats();
    assert_eq!(stats.rows_converted, 2);
    assert_eq!(stats.rows_skipped, 2);
    let records: Vec<_> = report.files[0].skipped.iter().map(|s| s.record).collect();
    assert_eq!(records, vec![3, 4]);
}

#[test]
fn file_without_expected_columns_fails_alone() {
    let dir = create_temp_dir();
    let opts = options(dir.path());
    fs::create_dir_all(&opts.input_dir).unwrap();
    fs::write(opts.input_dir.join("a.csv"), "When,How long\n2024.03.01 23:00:00,60\n").unwrap();
    write_export(&opts.input_dir, "b.csv", &[("2024.03.01 23:00:00", "60", "rem")]);

    let report = convert_batch(&opts).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("Date"));
    assert_eq!(report.combined_rows, 1);
}

#[test]
fn empty_input_dir_writes_header_only_batch() {
    let dir = create_temp_dir();
    let opts = options(dir.path());
    fs::create_dir_all(&opts.input_dir).unwrap();

    let report = convert_batch(&opts).unwrap();
    assert_eq!(report.combined_rows, 0);
    assert_eq!(
        read_text(&report.combined_path),
        "start datetime,end datetime,sleep\n"
    );
}

#[test]
fn missing_input_dir_is_fatal() {
    let dir = create_temp_dir();
    let opts = options(dir.path());
    assert!(matches!(convert_batch(&opts), Err(OpError::Io(_))));
}

#[test]
fn combined_file_in_input_dir_is_not_reconverted() {
    let dir = create_temp_dir();
    let mut cfg = PipelineConfig::default();
    let shared = dir.path().join("csvs");
    cfg.input_dir = shared.display().to_string();
    cfg.converted_dir = shared.display().to_string();
    cfg.combined_name = "all.csv".into();
    let opts = ConvertOptions::from_config(&cfg);
    fs::create_dir_all(&shared).unwrap();
    fs::write(shared.join("all.csv"), "start datetime,end datetime,sleep\n").unwrap();

    let report = convert_batch(&opts).unwrap();
    assert!(report.files.is_empty());
    assert!(report.failures.is_empty());
}
