//! Publish hooks: hand the Delta Output to a downstream consumer.
//!
//! A failed publish never aborts a run; the engine records it in the
//! manifest and logs it.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::info;

use sleepmerge_core::config::PublishConfig;
use sleepmerge_io::FsStorage;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Io(#[from] sleepmerge_io::Error),
    #[error("spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {status}")]
    Status { program: String, status: String },
    #[error("nothing to publish: {0} does not exist")]
    Missing(String),
}

pub trait Publisher {
    /// Short name recorded in the run manifest.
    fn name(&self) -> &'static str;

    fn publish(&self, path: &Path) -> Result<(), PublishError>;
}

/// Publisher used when no destination is configured.
#[derive(Debug, Default)]
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn name(&self) -> &'static str {
        "none"
    }

    fn publish(&self, _path: &Path) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Copies the file into `dir` under its own name, replacing any earlier copy.
#[derive(Debug)]
pub struct DirectoryPublisher {
    dir: PathBuf,
    storage: FsStorage,
}

impl DirectoryPublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            storage: FsStorage::new(),
        }
    }

    pub fn target_for(&self, path: &Path) -> PathBuf {
        match path.file_name() {
            Some(name) => self.dir.join(name),
            None => self.dir.join("combined.csv"),
        }
    }
}

impl Publisher for DirectoryPublisher {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn publish(&self, path: &Path) -> Result<(), PublishError> {
        if !self.storage.exists(path) {
            return Err(PublishError::Missing(path.display().to_string()));
        }
        self.storage.ensure_dir(&self.dir)?;
        let target = self.target_for(path);
        let bytes = self.storage.copy(path, &target)?;
        info!(dest = %target.display(), bytes, "published delta output");
        Ok(())
    }
}

/// Runs `program args... <path>` and waits for it.
#[derive(Debug)]
pub struct CommandPublisher {
    program: String,
    args: Vec<String>,
}

impl CommandPublisher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Publisher for CommandPublisher {
    fn name(&self) -> &'static str {
        "command"
    }

    fn publish(&self, path: &Path) -> Result<(), PublishError> {
        if !path.exists() {
            return Err(PublishError::Missing(path.display().to_string()));
        }
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .status()
            .map_err(|source| PublishError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(PublishError::Status {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }
        info!(program = %self.program, "publish command finished");
        Ok(())
    }
}

pub fn publisher_from_config(cfg: &PublishConfig) -> Box<dyn Publisher> {
    match cfg {
        PublishConfig::None => Box::new(NoopPublisher),
        PublishConfig::Directory { dir } => Box::new(DirectoryPublisher::new(dir)),
        PublishConfig::Command { program, args } => {
            Box::new(CommandPublisher::new(program.clone(), args.clone()))
        }
    }
}
