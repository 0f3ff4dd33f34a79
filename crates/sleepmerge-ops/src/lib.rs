#![forbid(unsafe_code)]
//! sleepmerge-ops: the transformations of the pipeline.
//!
//! - `normalize`: one device-export record → canonical `{start, end, sleep}` row.
//! - `convert`: apply `normalize` to every export file in a directory.
//! - `dedup`/`sort`: first-occurrence de-duplication and the timestamp sort.
//! - `merge`: the in-memory history merge (no file access).
//! - `audit`: invariant checks over a stored history.
//!
//! File publication (archive, delta write, store write) lives in
//! `sleepmerge-exec`; everything here is either pure or per-file.

pub mod audit;
pub mod convert;
pub mod dedup;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod sort;

pub use convert::{convert_batch, ConvertOptions, ConvertReport};
pub use error::OpError;
pub use merge::{merge_history, MergeOutcome};
pub use normalize::{NormalizeSpec, Normalizer, RowSkip};
pub use sort::{sort_by_timestamp, SortKey, SortReport, TimestampKey};
