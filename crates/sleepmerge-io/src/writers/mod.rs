//! Writers.

pub mod csv;
pub mod jsonl;
