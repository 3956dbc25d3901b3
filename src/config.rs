use crate::error::SaveBackupError;
use crate::naming::{NamingOptions, PathStyle, DEFAULT_BACKUP_DIR_NAME};
use crate::Result;
use configparser::ini::Ini;
use std::path::PathBuf;
use std::time::Duration;

const SECTION: &str = "savebak";

#[derive(Debug, Clone)]
pub struct Config {
    pub backup_dir_name: String,
    pub home_dir: Option<PathBuf>,
    pub normalize_separators: bool,
    pub preserve_permissions: bool,
    pub debug: bool,
    pub poll_interval_ms: u64,
    pub include_hidden: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backup_dir_name: DEFAULT_BACKUP_DIR_NAME.to_string(),
            home_dir: None,
            normalize_separators: false,
            preserve_permissions: false,
            debug: false,
            poll_interval_ms: 1000,
            include_hidden: false,
        }
    }
}

impl Config {
    /// Home directory backups are placed under: the configured override, else the user's home
    pub fn resolve_home(&self) -> Result<PathBuf> {
        match &self.home_dir {
            Some(home) => Ok(home.clone()),
            None => dirs::home_dir().ok_or(SaveBackupError::HomeNotFound),
        }
    }

    pub fn naming_options(&self) -> NamingOptions {
        NamingOptions {
            backup_dir_name: self.backup_dir_name.clone(),
            style: PathStyle::current(),
            normalize_separators: self.normalize_separators,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Get default configuration
pub fn default_config() -> Config {
    Config::default()
}

/// Load configuration from file, falling back to defaults when there is none.
///
/// A config file that exists but cannot be parsed is an error.
pub fn load_config() -> Result<Config> {
    let Ok(config_path) = get_config_path() else {
        return Ok(default_config());
    };

    if !config_path.exists() {
        return Ok(default_config());
    }

    let mut conf = Ini::new();
    conf.load(&config_path)
        .map_err(|e| SaveBackupError::config(format!("Failed to parse config file: {e}")))?;

    parse_config(&conf)
}

fn parse_config(conf: &Ini) -> Result<Config> {
    let mut config = default_config();

    if let Some(value) = conf.get(SECTION, "backup_dir_name") {
        let value = value.trim();
        if value.is_empty() || value.contains(['/', '\\']) {
            return Err(SaveBackupError::config(format!(
                "Invalid backup_dir_name: {value:?}"
            )));
        }
        config.backup_dir_name = value.to_string();
    }
    if let Some(value) = conf.get(SECTION, "home_dir") {
        if !value.trim().is_empty() {
            config.home_dir = Some(PathBuf::from(value.trim()));
        }
    }

    if let Some(value) = conf.get(SECTION, "normalize_separators") {
        config.normalize_separators = parse_bool(&value).unwrap_or(config.normalize_separators);
    }
    if let Some(value) = conf.get(SECTION, "preserve_permissions") {
        config.preserve_permissions = parse_bool(&value).unwrap_or(config.preserve_permissions);
    }
    if let Some(value) = conf.get(SECTION, "debug") {
        config.debug = parse_bool(&value).unwrap_or(config.debug);
    }
    if let Some(value) = conf.get(SECTION, "include_hidden") {
        config.include_hidden = parse_bool(&value).unwrap_or(config.include_hidden);
    }

    if let Some(value) = conf.get(SECTION, "poll_interval_ms") {
        let interval: u64 = value
            .trim()
            .parse()
            .map_err(|_| SaveBackupError::config(format!("Invalid poll_interval_ms: {value}")))?;
        if interval == 0 {
            return Err(SaveBackupError::config("poll_interval_ms must be positive"));
        }
        config.poll_interval_ms = interval;
    }

    Ok(config)
}

/// Get the configuration file path for the current platform
fn get_config_path() -> Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Ok(PathBuf::from(appdata).join("savebak").join("config.ini"));
        }
    }

    if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
        Ok(PathBuf::from(config_dir).join("savebak").join("config.ini"))
    } else if let Some(home) = std::env::var_os("HOME") {
        Ok(PathBuf::from(home)
            .join(".config")
            .join("savebak")
            .join("config.ini"))
    } else {
        Err(SaveBackupError::config("Could not determine config directory"))
    }
}

/// Parse a boolean value from INI string
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Create a sample configuration file
pub fn create_sample_config() -> String {
    r#"[savebak]
# Directory created under the home directory to hold every backup
backup_dir_name = .SaveBackup

# Override the home directory backups are placed under
# home_dir = /home/you

# Join the backup root and the source path with exactly one separator.
# Leave false to keep the layout of existing Windows backups.
normalize_separators = false

# Copy the saved file's permissions onto its backup (true/false)
preserve_permissions = false

# Log every save that triggers a backup
debug = false

# How often --watch scans for saved files, in milliseconds
poll_interval_ms = 1000

# Watch hidden files and directories too
include_hidden = false
"#
    .to_string()
}

/// Display the current configuration in a user-friendly format
pub fn dump_config(config: &Config) -> Result<()> {
    let config_path = get_config_path()?;

    println!("savebak Configuration");
    println!("=====================");
    println!();

    if config_path.exists() {
        println!("Config file: {} (found)", config_path.display());
    } else {
        println!(
            "Config file: {} (not found, using defaults)",
            config_path.display()
        );
    }
    println!();

    let home = config
        .home_dir
        .as_ref()
        .map(|h| h.display().to_string())
        .unwrap_or_else(|| "(user home)".to_string());

    println!("Current Settings:");
    println!("----------------");
    println!("backup_dir_name      = {}", config.backup_dir_name);
    println!("home_dir             = {home}");
    println!("normalize_separators = {}", config.normalize_separators);
    println!("preserve_permissions = {}", config.preserve_permissions);
    println!("debug                = {}", config.debug);
    println!("poll_interval_ms     = {}", config.poll_interval_ms);
    println!("include_hidden       = {}", config.include_hidden);
    println!();

    println!("Example backup path with current settings:");
    println!("------------------------------------------");
    println!(
        "/home/you/notes.txt → ~/{}/home/you/notes-YYYY-MM-DD_HH-MM-SS.txt",
        config.backup_dir_name
    );
    println!();

    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            println!("To create a configuration file:");
            println!("------------------------------");
            println!("1. Create directory: mkdir -p {}", parent.display());
            println!("2. Create config.ini with your preferred settings");
            println!("3. Use 'savebak --dump-config' again to verify");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct EnvSnapshot {
        xdg: Option<OsString>,
        home: Option<OsString>,
        appdata: Option<OsString>,
    }

    impl EnvSnapshot {
        fn take() -> Self {
            Self {
                xdg: std::env::var_os("XDG_CONFIG_HOME"),
                home: std::env::var_os("HOME"),
                appdata: std::env::var_os("APPDATA"),
            }
        }

        fn restore(self) {
            restore_var("XDG_CONFIG_HOME", self.xdg);
            restore_var("HOME", self.home);
            restore_var("APPDATA", self.appdata);
        }
    }

    fn restore_var(key: &str, value: Option<OsString>) {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }

    fn point_config_at(dir: &Path) {
        #[cfg(not(target_os = "windows"))]
        {
            std::env::remove_var("HOME");
            std::env::set_var("XDG_CONFIG_HOME", dir);
        }
        #[cfg(target_os = "windows")]
        std::env::set_var("APPDATA", dir);
    }

    fn write_config(dir: &Path, content: &str) {
        let config_dir = dir.join("savebak");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.ini"), content).unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert_eq!(config.backup_dir_name, ".SaveBackup");
        assert!(config.home_dir.is_none());
        assert!(!config.normalize_separators);
        assert!(!config.preserve_permissions);
        assert!(!config.debug);
        assert_eq!(config.poll_interval_ms, 1000);
        assert!(!config.include_hidden);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("On"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_resolve_home_override() {
        let mut config = default_config();
        config.home_dir = Some(PathBuf::from("/srv/alice"));
        assert_eq!(config.resolve_home().unwrap(), PathBuf::from("/srv/alice"));
    }

    #[test]
    fn test_load_config_nonexistent_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let snapshot = EnvSnapshot::take();

        let dir = tempdir().unwrap();
        point_config_at(dir.path());

        let config = load_config().unwrap();
        assert_eq!(config.backup_dir_name, default_config().backup_dir_name);
        assert_eq!(config.debug, default_config().debug);

        snapshot.restore();
    }

    #[test]
    fn test_load_config_without_config_dir() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let snapshot = EnvSnapshot::take();

        std::env::remove_var("XDG_CONFIG_HOME");
        std::env::remove_var("HOME");
        std::env::remove_var("APPDATA");

        let config = load_config().unwrap();
        assert_eq!(config.poll_interval_ms, default_config().poll_interval_ms);

        snapshot.restore();
    }

    #[test]
    fn test_config_from_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let snapshot = EnvSnapshot::take();

        let dir = tempdir().unwrap();
        write_config(
            dir.path(),
            r#"[savebak]
backup_dir_name = .Backups
home_dir = /srv/home/bob
normalize_separators = true
preserve_permissions = yes
debug = on
poll_interval_ms = 250
include_hidden = true
"#,
        );
        point_config_at(dir.path());

        let config = load_config().unwrap();
        assert_eq!(config.backup_dir_name, ".Backups");
        assert_eq!(config.home_dir, Some(PathBuf::from("/srv/home/bob")));
        assert!(config.normalize_separators);
        assert!(config.preserve_permissions);
        assert!(config.debug);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert!(config.include_hidden);

        snapshot.restore();
    }

    #[test]
    fn test_config_partial_override_and_invalid_bool() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let snapshot = EnvSnapshot::take();

        let dir = tempdir().unwrap();
        write_config(
            dir.path(),
            r#"[savebak]
debug = true
preserve_permissions = maybe
"#,
        );
        point_config_at(dir.path());

        let config = load_config().unwrap();
        let default = default_config();
        assert!(config.debug);
        assert_eq!(config.preserve_permissions, default.preserve_permissions);
        assert_eq!(config.backup_dir_name, default.backup_dir_name);
        assert_eq!(config.poll_interval_ms, default.poll_interval_ms);

        snapshot.restore();
    }

    #[test]
    fn test_config_invalid_numeric() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let snapshot = EnvSnapshot::take();

        let dir = tempdir().unwrap();
        write_config(dir.path(), "[savebak]\npoll_interval_ms = soon\n");
        point_config_at(dir.path());

        let result = load_config();
        assert!(matches!(result, Err(SaveBackupError::Config { .. })));

        write_config(dir.path(), "[savebak]\npoll_interval_ms = 0\n");
        assert!(load_config().is_err());

        snapshot.restore();
    }

    #[test]
    fn test_config_rejects_nested_backup_dir_name() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let snapshot = EnvSnapshot::take();

        let dir = tempdir().unwrap();
        write_config(dir.path(), "[savebak]\nbackup_dir_name = a/b\n");
        point_config_at(dir.path());

        assert!(load_config().is_err());

        snapshot.restore();
    }

    #[test]
    fn test_create_sample_config_parses_to_defaults() {
        let sample = create_sample_config();
        assert!(sample.contains("[savebak]"));
        assert!(sample.contains("backup_dir_name"));
        assert!(sample.contains("normalize_separators"));

        let mut conf = Ini::new();
        conf.read(sample).unwrap();
        let config = parse_config(&conf).unwrap();
        let default = default_config();
        assert_eq!(config.backup_dir_name, default.backup_dir_name);
        assert_eq!(config.normalize_separators, default.normalize_separators);
        assert_eq!(config.poll_interval_ms, default.poll_interval_ms);
        assert!(config.home_dir.is_none());
    }

    #[test]
    fn test_get_config_path_xdg() {
        let _guard = ENV_MUTEX.lock().unwrap();

        #[cfg(not(target_os = "windows"))]
        {
            let snapshot = EnvSnapshot::take();
            let dir = tempdir().unwrap();
            std::env::set_var("XDG_CONFIG_HOME", dir.path());

            let config_path = get_config_path().unwrap();
            assert_eq!(config_path, dir.path().join("savebak").join("config.ini"));

            snapshot.restore();
        }
    }

    #[test]
    fn test_get_config_path_no_env() {
        let _guard = ENV_MUTEX.lock().unwrap();

        #[cfg(not(target_os = "windows"))]
        {
            let snapshot = EnvSnapshot::take();
            std::env::remove_var("XDG_CONFIG_HOME");
            std::env::remove_var("HOME");

            assert!(get_config_path().is_err());

            snapshot.restore();
        }
    }

    #[test]
    fn test_dump_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let snapshot = EnvSnapshot::take();

        let dir = tempdir().unwrap();
        point_config_at(dir.path());
        assert!(dump_config(&default_config()).is_ok());

        snapshot.restore();
    }
}
