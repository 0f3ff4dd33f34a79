//! Header (column-name) handling. Rows themselves are schema-less; the header
//! is only used to locate named columns and is written back verbatim.

use serde::{Deserialize, Serialize};

use crate::types::Row;

/// Column names of the canonical converted shape `{start, end, category}`.
pub const CANONICAL_COLUMNS: [&str; 3] = ["start datetime", "end datetime", "sleep"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header {
    pub columns: Vec<String>,
}

impl Header {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// The 3-column header written by the converter and carried by the store.
    pub fn canonical() -> Self {
        Self::new(CANONICAL_COLUMNS)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The header as a record, for writing it as the first line of a file.
    pub fn to_row(&self) -> Row {
        Row::new(self.columns.clone())
    }
}

impl From<Row> for Header {
    fn from(row: Row) -> Self {
        Self {
            columns: row.into_fields(),
        }
    }
}
