//! Row-oriented, schema-less tabular data.
//!
//! Identity is the exact tuple of field values: two rows are duplicates iff
//! every field matches. `Row` derives `Eq + Hash` on that tuple so it can be
//! used directly as a set key.

use serde::{Deserialize, Serialize};

use crate::schema::Header;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Vec<String>);

impl Row {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn field(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_fields(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for Row {
    fn from(fields: Vec<String>) -> Self {
        Self(fields)
    }
}

impl From<Vec<&str>> for Row {
    fn from(fields: Vec<&str>) -> Self {
        Self(fields.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Row {
    fn from(fields: [&str; N]) -> Self {
        Self(fields.iter().map(|f| f.to_string()).collect())
    }
}

/// A header plus an ordered sequence of data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub header: Header,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(header: Header, rows: Vec<Row>) -> Self {
        Self { header, rows }
    }

    /// Split raw records into header (first record) and data rows.
    /// Returns `None` when there is not even a header record.
    pub fn from_records(records: Vec<Row>) -> Option<Self> {
        let mut iter = records.into_iter();
        let header = Header::from(iter.next()?);
        Some(Self {
            header,
            rows: iter.collect(),
        })
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header record followed by every data row, ready for the codec.
    pub fn to_records(&self) -> Vec<Row> {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        out.push(self.header.to_row());
        out.extend(self.rows.iter().cloned());
        out
    }
}
