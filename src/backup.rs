use crate::config::Config;
use crate::error::{IoOperation, SaveBackupError};
use crate::naming::resolve_backup_path_with;
use crate::utils::{canonical_path, copy_permissions, format_size};
use crate::Result;
use chrono::{Local, NaiveDateTime};
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug)]
pub struct BackupResult {
    pub source_path: PathBuf,
    pub backup_path: PathBuf,
    pub total_size: u64,
    pub duration: Duration,
}

impl BackupResult {
    pub fn new(source_path: PathBuf, backup_path: PathBuf) -> Self {
        Self {
            source_path,
            backup_path,
            total_size: 0,
            duration: Duration::from_secs(0),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Created backup: {} ({})",
            self.backup_path.display(),
            format_size(self.total_size)
        )
    }
}

/// Copy `source` to `destination`, creating any missing parent directories.
///
/// The source is opened first, so a source that cannot be read leaves nothing
/// behind. A failure after the destination is opened may leave it truncated;
/// it is not removed.
pub fn ensure_and_copy(source: &Path, destination: &Path) -> Result<BackupResult> {
    let start_time = Instant::now();

    let mut reader =
        File::open(source).map_err(|e| SaveBackupError::io(IoOperation::ReadSource, source, e))?;

    if let Some(parent) = destination.parent() {
        create_parent_dirs(parent)?;
    }

    let mut writer = File::create(destination)
        .map_err(|e| SaveBackupError::io(IoOperation::WriteDestination, destination, e))?;

    let mut result = BackupResult::new(source.to_path_buf(), destination.to_path_buf());
    result.total_size = copy_bytes(&mut reader, &mut writer, source, destination)?;
    result.duration = start_time.elapsed();

    Ok(result)
}

fn create_parent_dirs(dir: &Path) -> Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        // Another writer created it between our check and create
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(SaveBackupError::io(IoOperation::CreateDirectory, dir, e)),
    }
}

fn copy_bytes(
    reader: &mut File,
    writer: &mut File,
    source: &Path,
    destination: &Path,
) -> Result<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(SaveBackupError::io(IoOperation::ReadSource, source, e)),
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|e| SaveBackupError::io(IoOperation::WriteDestination, destination, e))?;
        total += read as u64;
    }

    writer
        .flush()
        .map_err(|e| SaveBackupError::io(IoOperation::WriteDestination, destination, e))?;

    Ok(total)
}

/// Back up a just-saved file using the current local time.
///
/// The source is canonicalized first so `..` segments and symlinks never
/// reach the backup path.
pub fn backup_on_save(source: &Path, config: &Config) -> Result<BackupResult> {
    let home = config.resolve_home()?;
    let source = canonical_path(source)?;
    backup_on_save_at(&source, &home, &Local::now().naive_local(), config)
}

/// Back up a just-saved file as if it had been saved at `now`
pub fn backup_on_save_at(
    source: &Path,
    home: &Path,
    now: &NaiveDateTime,
    config: &Config,
) -> Result<BackupResult> {
    let destination = plan_backup(source, home, now, config)?;
    debug!(
        source = %source.display(),
        destination = %destination.display(),
        "copying backup"
    );

    let result = ensure_and_copy(source, &destination)?;

    if config.preserve_permissions {
        copy_permissions(source, &destination)?;
    }

    Ok(result)
}

/// Backup destination for `source` without touching the filesystem
pub fn plan_backup(
    source: &Path,
    home: &Path,
    now: &NaiveDateTime,
    config: &Config,
) -> Result<PathBuf> {
    let source_str = source
        .to_str()
        .ok_or_else(|| SaveBackupError::validation("Source path is not valid UTF-8"))?;
    let home_str = home
        .to_str()
        .ok_or_else(|| SaveBackupError::validation("Home directory is not valid UTF-8"))?;

    let destination =
        resolve_backup_path_with(source_str, home_str, &config.naming_options(), now)?;
    Ok(PathBuf::from(destination))
}
