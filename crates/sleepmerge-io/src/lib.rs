#![forbid(unsafe_code)]
//! sleepmerge-io: CSV codec, filesystem helpers and the JSONL run log.
//!
//! The codec is purely syntactic: it turns files into ordered sequences of
//! `Row`s and back, and knows nothing about headers or timestamps.

pub mod error;
pub mod readers;
pub mod storage;
pub mod writers;

pub use error::{Error, Result};
pub use readers::csv::{read_rows, CsvReader};
pub use storage::FsStorage;
pub use writers::csv::{write_rows, CsvWriter};
