use crate::error::{IoOperation, SaveBackupError};
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Validate that a saved path exists and is a regular file
pub fn validate_source(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Ok(()),
        Ok(_) => Err(SaveBackupError::validation(format!(
            "Not a regular file: {}",
            path.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SaveBackupError::SourceNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(SaveBackupError::io(IoOperation::ReadSource, path, e)),
    }
}

/// Absolute form of an existing path with `.`, `..` and symlinks resolved
pub fn canonical_path(path: &Path) -> Result<PathBuf> {
    let canonical = fs::canonicalize(path)
        .map_err(|e| SaveBackupError::io(IoOperation::ReadSource, path, e))?;
    Ok(strip_verbatim_prefix(canonical))
}

/// Drop the `\\?\` prefix Windows canonicalization adds to drive paths
fn strip_verbatim_prefix(path: PathBuf) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_prefix(r"\\?\")) {
        Some(rest) if !rest.starts_with(r"UNC\") => PathBuf::from(rest),
        _ => path,
    }
}

/// Copy file permissions from source to destination
pub fn copy_permissions(source: &Path, dest: &Path) -> Result<()> {
    let permissions = fs::metadata(source)
        .map_err(|e| SaveBackupError::io(IoOperation::ReadSource, source, e))?
        .permissions();
    fs::set_permissions(dest, permissions)
        .map_err(|e| SaveBackupError::io(IoOperation::WriteDestination, dest, e))?;
    Ok(())
}

/// Format byte size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes < THRESHOLD {
        return format!("{bytes} B");
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    let unit = UNITS[unit_index];
    format!("{size:.1} {unit}")
}

/// Check if a path is hidden (starts with .)
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
