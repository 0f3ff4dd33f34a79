//! Batch converter: normalize every `*.csv` export in a directory.
//!
//! Each input file gets a converted sibling in the output directory (same
//! file name, canonical header) and every converted row is also collected
//! into one combined batch file written at the end.
//!
//! Failure policy: a bad record skips that record; a bad file (unreadable,
//! header without the needed columns) skips that file. Only an unreadable
//! input directory aborts the batch.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use sleepmerge_core::config::{LineTerminator, PipelineConfig};
use sleepmerge_core::manifest::ConvertStats;
use sleepmerge_core::schema::Header;
use sleepmerge_core::types::Row;
use sleepmerge_io::{write_rows, CsvReader, FsStorage};

use crate::error::OpError;
use crate::normalize::{NormalizeSpec, Normalizer};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// File name of the combined batch inside `output_dir`.
    pub combined_name: String,
    pub spec: NormalizeSpec,
    pub terminator: LineTerminator,
}

impl ConvertOptions {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            input_dir: PathBuf::from(&cfg.input_dir),
            output_dir: PathBuf::from(&cfg.converted_dir),
            combined_name: cfg.combined_name.clone(),
            spec: NormalizeSpec::from_config(cfg),
            terminator: cfg.line_terminator,
        }
    }

    pub fn combined_path(&self) -> PathBuf {
        self.output_dir.join(&self.combined_name)
    }
}

/// A record that was dropped, with its 1-based record number (header = 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub record: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows_converted: usize,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub input: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertReport {
    pub files: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
    pub combined_path: PathBuf,
    pub combined_rows: usize,
}

impl ConvertReport {
    pub fn stats(&self) -> ConvertStats {
        ConvertStats {
            files_processed: self.files.len(),
            files_failed: self.failures.len(),
            rows_converted: self.combined_rows,
            rows_skipped: self.files.iter().map(|f| f.skipped.len()).sum(),
        }
    }
}

/// Convert one export file, writing its converted copy to `output`.
/// Returns the report and the converted rows (without header).
pub fn convert_file(
    input: &Path,
    output: &Path,
    spec: &NormalizeSpec,
    terminator: LineTerminator,
) -> Result<(FileReport, Vec<Row>), OpError> {
    let label = input.display().to_string();
    let mut reader = CsvReader::open(input)?;
    let mut rows = reader.rows();

    let mut converted = Vec::new();
    let mut skipped = Vec::new();

    // An empty export has no header and converts to a header-only file.
    if let Some(first) = rows.next() {
        let header = Header::from(first?);
        let normalizer = Normalizer::from_header(&header, spec, &label)?;

        for (idx, item) in rows.enumerate() {
            let record = idx + 2;
            let row = match item {
                Ok(row) => row,
                Err(e) if e.is_format() => {
                    warn!(file = %label, record, error = %e, "skipping unreadable record");
                    skipped.push(SkippedRow {
                        record,
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            match normalizer.normalize(&row) {
                Ok(out) => converted.push(out),
                Err(skip) => {
                    warn!(file = %label, record, reason = %skip, "skipping record");
                    skipped.push(SkippedRow {
                        record,
                        reason: skip.to_string(),
                    });
                }
            }
        }
    }

    let mut records = Vec::with_capacity(converted.len() + 1);
    records.push(Header::canonical().to_row());
    records.extend(converted.iter().cloned());
    write_rows(output, &records, terminator)?;

    let report = FileReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        rows_converted: converted.len(),
        skipped,
    };
    Ok((report, converted))
}

/// Convert every export under `opts.input_dir` and write the combined batch.
pub fn convert_batch(opts: &ConvertOptions) -> Result<ConvertReport, OpError> {
    let storage = FsStorage::new();
    let inputs = storage.list_with_extension(&opts.input_dir, "csv")?;
    storage.ensure_dir(&opts.output_dir)?;

    let combined_path = opts.combined_path();
    if inputs.is_empty() {
        info!(dir = %opts.input_dir.display(), "no csv files found");
    }

    let mut files = Vec::new();
    let mut failures = Vec::new();
    let mut combined: Vec<Row> = vec![Header::canonical().to_row()];

    for input in inputs {
        let Some(name) = input.file_name() else {
            continue;
        };
        let output = opts.output_dir.join(name);
        if same_file(&input, &combined_path) {
            continue;
        }
        if same_file(&input, &output) {
            warn!(file = %input.display(), "output would overwrite input; skipping file");
            failures.push(FileFailure {
                input,
                error: "output path equals input path".into(),
            });
            continue;
        }

        info!(input = %input.display(), output = %output.display(), "converting");
        match convert_file(&input, &output, &opts.spec, opts.terminator) {
            Ok((report, rows)) => {
                combined.extend(rows);
                files.push(report);
            }
            Err(e) => {
                warn!(file = %input.display(), error = %e, "skipping file");
                failures.push(FileFailure {
                    input,
                    error: e.to_string(),
                });
            }
        }
    }

    let combined_rows = combined.len() - 1;
    write_rows(&combined_path, &combined, opts.terminator)?;
    info!(
        path = %combined_path.display(),
        rows = combined_rows,
        files = files.len(),
        failed = failures.len(),
        "combined batch written"
    );

    Ok(ConvertReport {
        files,
        failures,
        combined_path,
        combined_rows,
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
