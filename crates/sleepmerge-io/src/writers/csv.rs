//! CSV writer with overwrite semantics.
//!
//! `write_rows` writes to a sibling temp file and renames it over the target,
//! so a reader never observes a half-written file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sleepmerge_core::config::LineTerminator;
use sleepmerge_core::types::Row;

use crate::error::{Error, Result};

pub struct CsvWriter<W: Write> {
    inner: csv::Writer<W>,
    path: String,
}

impl CsvWriter<File> {
    /// Create (or truncate) `path`, creating parent directories first.
    pub fn create(path: &Path, terminator: LineTerminator) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::to_writer(file, terminator, path.display().to_string()))
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn to_writer(writer: W, terminator: LineTerminator, label: impl Into<String>) -> Self {
        let inner = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .terminator(match terminator {
                LineTerminator::Crlf => csv::Terminator::CRLF,
                LineTerminator::Lf => csv::Terminator::Any(b'\n'),
            })
            .from_writer(writer);
        Self {
            inner,
            path: label.into(),
        }
    }

    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        self.inner
            .write_record(row.fields())
            .map_err(|e| Error::from_csv(&self.path, e))
    }

    pub fn write_all<'a>(&mut self, rows: impl IntoIterator<Item = &'a Row>) -> Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Flush buffered records and hand back the underlying writer.
    pub fn finish(self) -> Result<W> {
        let path = self.path;
        self.inner.into_inner().map_err(|e| Error::Io {
            path,
            source: std::io::Error::new(e.error().kind(), e.error().to_string()),
        })
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `rows` verbatim, one record per line, replacing any existing file.
pub fn write_rows(path: &Path, rows: &[Row], terminator: LineTerminator) -> Result<()> {
    let tmp = temp_sibling(path);
    let mut writer = CsvWriter::create(&tmp, terminator)?;
    writer.write_all(rows)?;
    let file = writer.finish()?;
    file.sync_all().map_err(|e| Error::io(&tmp, e))?;
    drop(file);
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::csv::read_rows;

    #[test]
    fn crlf_is_the_default_terminator() {
        let mut w = CsvWriter::to_writer(Vec::new(), LineTerminator::default(), "mem");
        w.write_row(&Row::from(["a", "b"])).unwrap();
        let bytes = w.finish().unwrap();
        assert_eq!(bytes, b"a,b\r\n");
    }

    #[test]
    fn fields_with_delimiters_are_quoted() {
        let mut w = CsvWriter::to_writer(Vec::new(), LineTerminator::Lf, "mem");
        w.write_row(&Row::from(["2024-01-01 00:00:00", "light, N1", "q\"uote"]))
            .unwrap();
        let text = String::from_utf8(w.finish().unwrap()).unwrap();
        assert_eq!(text, "2024-01-01 00:00:00,\"light, N1\",\"q\"\"uote\"\n");
    }

    #[test]
    fn write_read_write_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        let rows = vec![
            Row::from(["start datetime", "end datetime", "sleep"]),
            Row::from(["2024-01-01 00:00:00", "2024-01-01 00:05:00", "N2, light"]),
            Row::from(["2024-01-01 00:05:00", "2024-01-01 00:10:00", "\"REM\""]),
        ];
        write_rows(&first, &rows, LineTerminator::Crlf).unwrap();
        let back = read_rows(&first).unwrap();
        assert_eq!(back, rows);
        write_rows(&second, &back, LineTerminator::Crlf).unwrap();
        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn single_empty_field_survives_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        let rows = vec![Row::from(["h"]), Row::from([""]), Row::from(["a,b"])];
        write_rows(&first, &rows, LineTerminator::Lf).unwrap();
        assert_eq!(fs::read_to_string(&first).unwrap(), "h\n\"\"\n\"a,b\"\n");
        let back = read_rows(&first).unwrap();
        assert_eq!(back, rows);
        write_rows(&second, &back, LineTerminator::Lf).unwrap();
        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn overwrites_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        write_rows(&path, &[Row::from(["old"]), Row::from(["old2"])], LineTerminator::Lf).unwrap();
        write_rows(&path, &[Row::from(["new"])], LineTerminator::Lf).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        assert!(!temp_sibling(&path).exists());
    }
}
