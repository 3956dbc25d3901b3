use anyhow::{bail, Context};
use chrono::Local;
use clap::{Arg, ArgAction, Command};
use savebak::{
    backup_root, canonical_path, dump_config, install_interrupt_handler, load_config,
    plan_backup, validate_source, BackupHook, Config, SaveBackupError, SaveEvent, SaveWatcher,
    WatchContext, WatchOptions,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let result = run();
    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(error) => {
            eprintln!("Error: {error}");

            // Show suggestions if available
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\nSuggestions:");
                for suggestion in suggestions {
                    eprintln!("  - {suggestion}");
                }
            }

            process::exit(error.exit_code());
        }
    }
}

fn run() -> Result<i32, SaveBackupError> {
    let matches = Command::new("savebak")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Keep a timestamped backup of every saved file")
        .long_about(
            "savebak copies each saved file into ~/.SaveBackup, mirroring its absolute path.\n\
             Example: /home/you/notes.txt → ~/.SaveBackup/home/you/notes-2024-03-01_10-00-00.txt",
        )
        .arg(
            Arg::new("targets")
                .help("Saved files to back up, or directories to watch with --watch")
                .required(false)
                .num_args(1..)
                .value_name("TARGET"),
        )
        .arg(
            Arg::new("watch")
                .short('w')
                .long("watch")
                .help("Watch the target directories and back up every file saved in them")
                .action(ArgAction::SetTrue)
                .conflicts_with("dry-run"),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Show where backups would go without copying anything")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show detailed output and debug logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress all output except errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("dump-config")
                .long("dump-config")
                .help("Display current configuration settings and exit")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // Parse command line flags
    let dump_config_flag = matches.get_flag("dump-config");
    let watch = matches.get_flag("watch");
    let dry_run = matches.get_flag("dry-run");
    let verbose = matches.get_flag("verbose");
    let quiet = matches.get_flag("quiet");

    // Load configuration
    let config = load_config()?;

    init_logging(verbose || config.debug, quiet);

    // Handle dump-config flag early
    if dump_config_flag {
        dump_config(&config)?;
        return Ok(0);
    }

    // Parse targets (only needed if not dumping config)
    let targets: Vec<&str> = if let Some(target_values) = matches.get_many::<String>("targets") {
        target_values.map(|s| s.as_str()).collect()
    } else {
        return Err(SaveBackupError::validation(
            "No targets specified. Use --help for usage information.",
        ));
    };

    if watch {
        return match run_watch(&targets, &config) {
            Ok(saves) => finish_watch(saves, quiet),
            Err(e) => {
                eprintln!("Error: {e:#}");
                Ok(1)
            }
        };
    }

    let hook = BackupHook::new(config);
    let mut success_count = 0;
    let mut error_count = 0;

    // Process each target
    for target_str in targets {
        let target_path = Path::new(target_str);

        match process_target(target_path, &hook, dry_run, verbose, quiet) {
            Ok(_) => success_count += 1,
            Err(e) => {
                error_count += 1;

                if e.is_recoverable() {
                    // For recoverable errors, show error but continue
                    if !quiet {
                        eprintln!("Error processing {target_str}: {e}");

                        let suggestions = e.suggestions();
                        if !suggestions.is_empty() && verbose {
                            eprintln!("Suggestions:");
                            for suggestion in suggestions {
                                eprintln!("  - {suggestion}");
                            }
                        }
                    }
                } else {
                    // For non-recoverable errors, fail immediately
                    return Err(e);
                }
            }
        }
    }

    // Summary
    if !quiet && (success_count > 1 || error_count > 0) {
        println!("Backup summary: {success_count} succeeded, {error_count} failed");
    }

    // Return appropriate exit code
    if error_count > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn init_logging(debug: bool, quiet: bool) {
    let level = if debug {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn process_target(
    target: &Path,
    hook: &BackupHook,
    dry_run: bool,
    verbose: bool,
    quiet: bool,
) -> Result<(), SaveBackupError> {
    validate_source(target)?;
    let source = canonical_path(target)?;

    if dry_run {
        // Dry run mode - just show what would be done
        let config = hook.config();
        let home = config.resolve_home()?;
        let backup_path = plan_backup(&source, &home, &Local::now().naive_local(), config)?;
        println!("Would create backup: {}", backup_path.display());
        return Ok(());
    }

    // Perform the actual backup
    let result = hook.backup(&SaveEvent::new(&source))?;

    // Output results based on verbosity
    if verbose {
        println!("Processed: {}", source.display());
        println!("  → {}", result.backup_path.display());
        let size_str = savebak::format_size(result.total_size);
        let duration = result.duration.as_secs_f64();
        println!("  Size: {size_str}");
        println!("  Duration: {duration:.2}s");
    } else if !quiet {
        println!("{}", result.summary());
    }

    Ok(())
}

fn run_watch(targets: &[&str], config: &Config) -> anyhow::Result<usize> {
    let roots = watch_roots(targets)?;
    let options = watch_options(config)?;

    // Set up signal handling so Ctrl+C ends the watch loop
    let context = WatchContext::new();
    install_interrupt_handler(&context)?;

    for root in &roots {
        tracing::info!(root = %root.display(), "watching for saves");
    }

    let hook = BackupHook::new(config.clone());
    let mut watcher = SaveWatcher::new(roots, options);
    let saves = watcher
        .run(&hook, &context)
        .context("Watching for saves failed")?;
    Ok(saves)
}

/// Canonical watch directories, so they compare against the canonical backup root
fn watch_roots(targets: &[&str]) -> anyhow::Result<Vec<PathBuf>> {
    let mut roots = Vec::with_capacity(targets.len());
    for target in targets {
        let root = canonical_path(Path::new(target))
            .with_context(|| format!("Cannot resolve watch directory {target}"))?;
        if !root.is_dir() {
            bail!("Not a directory: {}", root.display());
        }
        roots.push(root);
    }
    Ok(roots)
}

fn watch_options(config: &Config) -> anyhow::Result<WatchOptions> {
    let home = config.resolve_home()?;
    // The home directory may not exist yet, in which case nothing under it is watched either
    let home = canonical_path(&home).unwrap_or(home);
    Ok(WatchOptions {
        poll_interval: config.poll_interval(),
        include_hidden: config.include_hidden,
        exclude: Some(backup_root(
            &home.to_string_lossy(),
            &config.naming_options(),
        )),
    })
}

/// The watch loop only returns once interrupted
fn finish_watch(saves: usize, quiet: bool) -> Result<i32, SaveBackupError> {
    if !quiet {
        println!("Stopped watching after {saves} saves");
    }
    Err(SaveBackupError::Interrupted)
}
