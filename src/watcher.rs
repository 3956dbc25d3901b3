use crate::hook::{SaveEvent, SaveHook};
use crate::signal::WatchContext;
use crate::utils::is_hidden;
use crate::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
struct FileFingerprint {
    modified: SystemTime,
    size: u64,
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    pub include_hidden: bool,
    /// Never reported, typically the backup root itself
    pub exclude: Option<PathBuf>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            include_hidden: false,
            exclude: None,
        }
    }
}

/// Detects completed saves under a set of directories by polling file fingerprints
pub struct SaveWatcher {
    roots: Vec<PathBuf>,
    options: WatchOptions,
    fingerprints: HashMap<PathBuf, FileFingerprint>,
    primed: bool,
}

impl SaveWatcher {
    pub fn new(roots: Vec<PathBuf>, options: WatchOptions) -> Self {
        Self {
            roots,
            options,
            fingerprints: HashMap::new(),
            primed: false,
        }
    }

    pub fn tracked_files(&self) -> usize {
        self.fingerprints.len()
    }

    /// Files written since the previous scan. The first scan only records state.
    pub fn scan(&mut self) -> Result<Vec<SaveEvent>> {
        let mut current = HashMap::new();
        for root in &self.roots {
            self.collect(root, &mut current);
        }

        let mut events = Vec::new();
        if self.primed {
            for (path, fingerprint) in &current {
                if self.fingerprints.get(path) != Some(fingerprint) {
                    events.push(SaveEvent::new(path.clone()));
                }
            }
            events.sort_by(|a, b| a.path().cmp(b.path()));
        }

        self.fingerprints = current;
        self.primed = true;
        Ok(events)
    }

    fn collect(&self, dir: &Path, out: &mut HashMap<PathBuf, FileFingerprint>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot scan directory");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !self.options.include_hidden && is_hidden(&path) {
                continue;
            }
            if let Some(excluded) = &self.options.exclude {
                if path.starts_with(excluded) {
                    continue;
                }
            }

            // Symlinks are not followed so a link cycle cannot trap the scan
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                self.collect(&path, out);
            } else if file_type.is_file() {
                if let Ok(metadata) = entry.metadata() {
                    let fingerprint = FileFingerprint {
                        modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                        size: metadata.len(),
                    };
                    out.insert(path, fingerprint);
                }
            }
        }
    }

    /// Scan and dispatch to `hook` until `context` is interrupted.
    /// Returns the number of saves dispatched.
    pub fn run(&mut self, hook: &dyn SaveHook, context: &WatchContext) -> Result<usize> {
        let mut dispatched = 0;
        self.scan()?;
        debug!(files = self.tracked_files(), "watching");

        while !context.is_interrupted() {
            sleep_unless_interrupted(self.options.poll_interval, context);
            if context.is_interrupted() {
                break;
            }

            for event in self.scan()? {
                debug!(path = %event.path().display(), "save detected");
                hook.on_save(&event);
                dispatched += 1;
            }
        }

        Ok(dispatched)
    }
}

fn sleep_unless_interrupted(interval: Duration, context: &WatchContext) {
    const SLICE: Duration = Duration::from_millis(50);
    let deadline = Instant::now() + interval;
    while !context.is_interrupted() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep(SLICE.min(deadline - now));
    }
}
