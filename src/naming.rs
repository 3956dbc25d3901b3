use crate::error::SaveBackupError;
use crate::Result;
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// Directory created under the home directory to hold all backups
pub const DEFAULT_BACKUP_DIR_NAME: &str = ".SaveBackup";

/// Second-resolution local timestamp, e.g. `2024-03-01_10-00-00`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Path separator convention of the platform a path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    Unix,
    Windows,
}

impl PathStyle {
    pub fn current() -> Self {
        if cfg!(windows) {
            PathStyle::Windows
        } else {
            PathStyle::Unix
        }
    }

    pub fn separator(self) -> char {
        match self {
            PathStyle::Unix => '/',
            PathStyle::Windows => '\\',
        }
    }

    fn is_separator(self, c: char) -> bool {
        match self {
            PathStyle::Unix => c == '/',
            PathStyle::Windows => c == '/' || c == '\\',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingOptions {
    pub backup_dir_name: String,
    pub style: PathStyle,
    /// Join the backup root and the source with exactly one separator.
    /// When false, Windows paths get the historical extra separator.
    pub normalize_separators: bool,
}

impl NamingOptions {
    pub fn new(style: PathStyle) -> Self {
        Self {
            backup_dir_name: DEFAULT_BACKUP_DIR_NAME.to_string(),
            style,
            normalize_separators: false,
        }
    }
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self::new(PathStyle::current())
    }
}

/// Compute the backup destination for `source` saved at `now`.
///
/// `<home>/.SaveBackup` followed by the source path with every `:` removed,
/// and the file's own extension rewritten to `-<timestamp>.<extension>`.
/// On Windows an extra separator follows the backup root.
pub fn resolve_backup_path(
    source: &str,
    home: &str,
    style: PathStyle,
    now: &NaiveDateTime,
) -> Result<String> {
    resolve_backup_path_with(source, home, &NamingOptions::new(style), now)
}

pub fn resolve_backup_path_with(
    source: &str,
    home: &str,
    options: &NamingOptions,
    now: &NaiveDateTime,
) -> Result<String> {
    if source.is_empty() {
        return Err(SaveBackupError::validation("Source path is empty"));
    }
    if home.is_empty() {
        return Err(SaveBackupError::validation("Home directory is empty"));
    }

    let style = options.style;
    let stripped: String = source.chars().filter(|&c| c != ':').collect();

    let mut dest = backup_root_string(home, options);
    if options.normalize_separators {
        dest.push(style.separator());
        dest.push_str(stripped.trim_start_matches(|c: char| style.is_separator(c)));
    } else {
        if style == PathStyle::Windows {
            dest.push(style.separator());
        }
        dest.push_str(&stripped);
    }

    let timestamp = format_timestamp(now);
    let file_name = file_name_of(&stripped, style);
    if file_name.is_empty() {
        return Err(SaveBackupError::validation(format!(
            "Source path has no file name: {source}"
        )));
    }

    // The file name is a suffix of `dest`, so its extension is too.
    let backup = match split_extension(file_name) {
        Some((_, extension)) => {
            let base_len = dest.len() - extension.len() - 1;
            format!("{}-{timestamp}.{extension}", &dest[..base_len])
        }
        None => format!("{dest}-{timestamp}"),
    };

    Ok(backup)
}

/// Directory holding all backups for `home`
pub fn backup_root(home: &str, options: &NamingOptions) -> PathBuf {
    PathBuf::from(backup_root_string(home, options))
}

fn backup_root_string(home: &str, options: &NamingOptions) -> String {
    let separator = options.style.separator();
    let mut root = home.to_string();
    if options.normalize_separators {
        while root.len() > 1 && root.ends_with(|c: char| options.style.is_separator(c)) {
            root.pop();
        }
    }
    root.push(separator);
    root.push_str(&options.backup_dir_name);
    root
}

pub fn format_timestamp(now: &NaiveDateTime) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Split a file name into stem and extension.
///
/// Names without a dot, with only a leading dot (`.bashrc`) or with a
/// trailing dot have no extension.
pub fn split_extension(file_name: &str) -> Option<(&str, &str)> {
    let dot_pos = file_name.rfind('.')?;
    if dot_pos == 0 || dot_pos == file_name.len() - 1 {
        return None;
    }
    Some((&file_name[..dot_pos], &file_name[dot_pos + 1..]))
}

fn file_name_of(path: &str, style: PathStyle) -> &str {
    match path.rfind(|c: char| style.is_separator(c)) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}
