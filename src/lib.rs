pub mod backup;
pub mod config;
pub mod error;
pub mod hook;
pub mod naming;
pub mod signal;
pub mod utils;
pub mod watcher;

pub use backup::{backup_on_save, backup_on_save_at, ensure_and_copy, plan_backup, BackupResult};
pub use config::{create_sample_config, default_config, dump_config, load_config, Config};
pub use error::{IoOperation, SaveBackupError};
pub use hook::{BackupHook, SaveEvent, SaveHook};
pub use naming::{
    backup_root, format_timestamp, resolve_backup_path, resolve_backup_path_with, NamingOptions,
    PathStyle,
};
pub use signal::{install_interrupt_handler, WatchContext};
pub use utils::{canonical_path, format_size, validate_source};
pub use watcher::{SaveWatcher, WatchOptions};

/// Main library result type
pub type Result<T> = std::result::Result<T, SaveBackupError>;
