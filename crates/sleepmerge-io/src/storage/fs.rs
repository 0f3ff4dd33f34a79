use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Local filesystem storage (rooted at the host filesystem).
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    pub fn ensure_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))
    }

    /// Regular files directly under `dir` whose extension matches `ext`
    /// (case-insensitive), sorted by file name. Fails if `dir` is unreadable.
    pub fn list_with_extension(&self, dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
        let mut results = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext));
            if matches {
                results.push(path);
            }
        }
        results.sort();
        Ok(results)
    }

    /// Move `from` to `to`, replacing `to` if present.
    pub fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::rename(from, to).map_err(|e| Error::io(from, e))
    }

    /// Copy `from` into `to`, replacing `to` if present. Returns bytes copied.
    pub fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        if to.exists() {
            fs::remove_file(to).map_err(|e| Error::io(to, e))?;
        }
        fs::copy(from, to).map_err(|e| Error::io(from, e))
    }
}
