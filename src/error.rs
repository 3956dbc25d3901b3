use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The filesystem step that failed during a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    CreateDirectory,
    ReadSource,
    WriteDestination,
}

impl fmt::Display for IoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IoOperation::CreateDirectory => "create directory",
            IoOperation::ReadSource => "read source",
            IoOperation::WriteDestination => "write destination",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum SaveBackupError {
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Could not {operation} {path}: {source}")]
    IoFailure {
        operation: IoOperation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine the home directory")]
    HomeNotFound,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation interrupted by user")]
    Interrupted,

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl SaveBackupError {
    /// Create a configuration error with a custom message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a validation error with a custom message
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the step and path it happened on
    pub fn io(operation: IoOperation, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoFailure {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Check if this error is recoverable (remaining targets can still be processed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SaveBackupError::SourceNotFound { .. }
                | SaveBackupError::IoFailure { .. }
                | SaveBackupError::Validation { .. }
        )
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SaveBackupError::Interrupted => 130,
            SaveBackupError::Validation { .. } => 2,
            SaveBackupError::Config { .. } => 2,
            SaveBackupError::HomeNotFound => 2,
            _ => 1,
        }
    }

    /// Provide helpful suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            SaveBackupError::IoFailure {
                operation: IoOperation::CreateDirectory | IoOperation::WriteDestination,
                ..
            } => vec![
                "Check that the backup directory is writable".to_string(),
                "Free up disk space".to_string(),
            ],
            SaveBackupError::IoFailure {
                operation: IoOperation::ReadSource,
                ..
            } => vec!["Check file permissions on the saved file".to_string()],
            SaveBackupError::HomeNotFound => vec![
                "Set the HOME environment variable".to_string(),
                "Set home_dir in the savebak config file".to_string(),
            ],
            SaveBackupError::Config { .. } => vec![
                "Fix or remove the savebak config file".to_string(),
                "Run 'savebak --dump-config' to see which file is read".to_string(),
            ],
            _ => vec![],
        }
    }
}
