//! Append-only NDJSON log writer (one serialized value per line).

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
}

impl JsonlWriter<File> {
    /// Open `path` for appending, creating it (and its parents) if needed.
    pub fn append_to(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::io(path, e))?;
        Ok(Self::to_writer(f))
    }
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    pub fn write_value<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let line = serde_json::to_string(value)?;
        writeln!(self.writer, "{}", line).map_err(|e| Error::Io {
            path: "<jsonl>".into(),
            source: e,
        })?;
        self.writer.flush().map_err(|e| Error::Io {
            path: "<jsonl>".into(),
            source: e,
        })?;
        Ok(())
    }
}

/// Append a single value to the log at `path`.
pub fn append_json_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    JsonlWriter::append_to(path)?.write_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/runs.jsonl");
        append_json_line(&path, &serde_json::json!({"run": 1})).unwrap();
        append_json_line(&path, &serde_json::json!({"run": 2})).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec![r#"{"run":1}"#, r#"{"run":2}"#]);
    }
}
