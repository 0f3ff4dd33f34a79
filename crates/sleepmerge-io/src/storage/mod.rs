//! Filesystem helpers used by the converter, the history store and the
//! directory publisher.

mod fs;
pub use fs::FsStorage;
