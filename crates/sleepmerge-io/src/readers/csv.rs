//! Delimiter/quote-aware CSV reader.
//!
//! Every non-blank line becomes one `Row`, header included; callers decide
//! what the first row means. Records may have varying field counts.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sleepmerge_core::types::Row;

use crate::error::{Error, Result};

pub struct CsvReader<R: Read> {
    inner: csv::Reader<R>,
    path: String,
}

impl CsvReader<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::from_reader(file, path.display().to_string()))
    }
}

impl<R: Read> CsvReader<R> {
    /// `label` is only used in error messages.
    pub fn from_reader(reader: R, label: impl Into<String>) -> Self {
        let inner = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        Self {
            inner,
            path: label.into(),
        }
    }

    /// Stream rows one record at a time. A malformed record yields an `Err`
    /// item; iteration may continue past it.
    pub fn rows(&mut self) -> Rows<'_, R> {
        Rows {
            iter: self.inner.records(),
            path: &self.path,
        }
    }

    /// Read every row, failing on the first malformed record.
    pub fn read_all(&mut self) -> Result<Vec<Row>> {
        self.rows().collect()
    }
}

pub struct Rows<'r, R: Read> {
    iter: csv::StringRecordsIter<'r, R>,
    path: &'r str,
}

impl<R: Read> Iterator for Rows<'_, R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.iter.next()? {
                // `""` on its own line is one empty field and is kept.
                Ok(record) if record.is_empty() => continue,
                Ok(record) => {
                    return Some(Ok(Row::new(record.iter().map(str::to_string).collect())));
                }
                Err(e) => return Some(Err(Error::from_csv(self.path, e))),
            }
        }
    }
}

/// Read a whole file into rows. Fails with `Error::Io` if the path cannot be
/// opened and `Error::Format` on the first record that cannot be tokenized.
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    CsvReader::open(path)?.read_all()
}
