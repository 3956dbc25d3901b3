//! Save-hook contract between a host (editor, watcher, CLI) and the backup routine.
//!
//! A host calls [`SaveHook::on_save`] once per completed save. The hook never
//! returns an error: a failed backup is logged and the save carries on.

use crate::backup::{backup_on_save, BackupResult};
use crate::config::Config;
use crate::naming::split_extension;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A completed save reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEvent {
    path: PathBuf,
}

impl SaveEvent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File extension without the dot, if the file name has one
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.path.file_name()?.to_str()?;
        split_extension(file_name).map(|(_, extension)| extension)
    }
}

pub trait SaveHook {
    /// Handle a completed save. Returns the backup written, if any.
    fn on_save(&self, event: &SaveEvent) -> Option<BackupResult>;

    /// Run host work that must happen while the document is locked.
    fn run_locked(&self, work: &mut dyn FnMut()) {
        work()
    }

    /// Abort request from the host. There is never anything to roll back.
    fn cancel(&self) -> bool {
        true
    }
}

/// Backs up every saved file under the configured backup root
#[derive(Debug, Clone)]
pub struct BackupHook {
    config: Config,
}

impl BackupHook {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Back up the saved file, returning the failure instead of logging it
    pub fn backup(&self, event: &SaveEvent) -> Result<BackupResult> {
        if self.config.debug {
            info!(
                extension = event.extension().unwrap_or(""),
                "Saving {}",
                event.path().display()
            );
        }

        backup_on_save(event.path(), &self.config)
    }
}

impl SaveHook for BackupHook {
    fn on_save(&self, event: &SaveEvent) -> Option<BackupResult> {
        match self.backup(event) {
            Ok(result) => {
                info!(
                    source = %result.source_path.display(),
                    backup = %result.backup_path.display(),
                    bytes = result.total_size,
                    "backup created"
                );
                Some(result)
            }
            Err(e) => {
                warn!(path = %event.path().display(), error = %e, "backup failed");
                None
            }
        }
    }
}
