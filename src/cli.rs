//! Command-line interface module for dirjanitor.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and the interactive prompts
//! - Target path validation
//! - Organization orchestration (config, log, lock, engine, manifest)
//! - Restore handling

use crate::action_log::{ActionLog, LOG_FILE_NAME};
use crate::config::{Configuration, LoadOutcome, default_config_path};
use crate::destination::Strategy;
use crate::file_organizer::{FileOrganizer, OrganizeError, RunSummary};
use crate::lock::{RunLock, state_dir};
use crate::output::OutputFormatter;
use crate::restore::{RestoreManifest, RestoreReport, Restorer};
use clap::Parser;
use dialoguer::{Confirm, Input};
use log::debug;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Organize a folder by duplicates, size and type.
#[derive(Parser, Debug)]
#[command(name = "dirjanitor", version, about)]
pub struct Args {
    /// Folder to organize. Prompts for one when omitted.
    pub path: Option<PathBuf>,

    /// Destination layout.
    #[arg(short, long, value_enum, default_value_t = Strategy::Flat)]
    pub strategy: Strategy,

    /// Show where everything would go without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Move organized entries back to the folder root.
    #[arg(long, conflicts_with = "dry_run")]
    pub restore: bool,

    /// Do not ask for confirmation.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Configuration file (JSON, or TOML by extension). Defaults to
    /// janitor_config.json inside the folder.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the large-file threshold in MB for this run.
    #[arg(long)]
    pub large_mb: Option<f64>,

    /// Override the huge-file threshold in MB for this run.
    #[arg(long)]
    pub huge_mb: Option<f64>,

    /// Console log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Copy)]
pub enum OrganizeCommand {
    /// Organize the top-level entries of a folder.
    Organize {
        /// If true, simulate the operation without making changes.
        dry_run: bool,
        strategy: Strategy,
    },
    /// Reverse previous organization runs.
    Restore {
        /// Used to walk the hierarchy when no manifest exists.
        strategy: Strategy,
        /// Skip the confirmation prompt.
        assume_yes: bool,
    },
}

/// Per-run threshold overrides from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdOverrides {
    pub large_mb: Option<f64>,
    pub huge_mb: Option<f64>,
}

impl ThresholdOverrides {
    fn apply(&self, config: &mut Configuration) {
        if let Some(large_mb) = self.large_mb {
            config.size_thresholds.large_mb = large_mb;
        }
        if let Some(huge_mb) = self.huge_mb {
            config.size_thresholds.huge_mb = huge_mb;
        }
    }
}

/// Why a target path was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Empty,
    NotFound(PathBuf),
    NotADirectory(PathBuf),
    /// The target is the working directory or one of its ancestors.
    ContainsWorkingDirectory { target: PathBuf, cwd: PathBuf },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Path cannot be empty"),
            Self::NotFound(path) => write!(f, "Path '{}' does not exist", path.display()),
            Self::NotADirectory(path) => write!(f, "'{}' is not a directory", path.display()),
            Self::ContainsWorkingDirectory { target, cwd } => write!(
                f,
                "Cannot organize {}: it contains the current directory {}",
                target.display(),
                cwd.display()
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Checks a user-supplied target folder.
///
/// Rejects empty input, paths that don't exist or aren't directories, and
/// the working directory itself or any ancestor of it. Only reads the
/// filesystem.
pub fn validate_target(input: &str, cwd: &Path) -> Result<PathBuf, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    let target = PathBuf::from(trimmed);
    if !target.exists() {
        return Err(ValidationError::NotFound(target));
    }
    if !target.is_dir() {
        return Err(ValidationError::NotADirectory(target));
    }

    let canonical_target = target.canonicalize().unwrap_or_else(|_| target.clone());
    let canonical_cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
    if canonical_cwd.starts_with(&canonical_target) {
        return Err(ValidationError::ContainsWorkingDirectory {
            target,
            cwd: canonical_cwd,
        });
    }

    Ok(canonical_target)
}

/// Entry point used by the binary.
pub fn run(args: Args) -> Result<(), String> {
    let cwd = env::current_dir().map_err(|e| format!("Cannot read current directory: {}", e))?;
    let interactive = args.path.is_none();

    let root = match &args.path {
        Some(path) => {
            validate_target(&path.to_string_lossy(), &cwd).map_err(|e| e.to_string())?
        }
        None => prompt_target_directory(&cwd, args.strategy)?,
    };
    let config_path = args.config.clone().unwrap_or_else(|| default_config_path(&root));

    if args.restore {
        return run_cli_with_config(
            OrganizeCommand::Restore {
                strategy: args.strategy,
                assume_yes: args.yes,
            },
            &root,
            Some(&config_path),
        );
    }

    if interactive && !args.dry_run && confirm("Customize settings?", false)? {
        customize_thresholds(&config_path)?;
    } else if !interactive && !args.yes && !args.dry_run {
        let prompt = format!(
            "Organize {} using the {} layout?",
            root.display(),
            args.strategy
        );
        if !confirm(&prompt, false)? {
            OutputFormatter::plain("Operation cancelled.");
            return Ok(());
        }
    }

    let overrides = ThresholdOverrides {
        large_mb: args.large_mb,
        huge_mb: args.huge_mb,
    };
    organize_directory_with_config(
        &root,
        Some(&config_path),
        args.strategy,
        args.dry_run,
        &overrides,
    )?;

    if !args.dry_run {
        OutputFormatter::info(&format!("Log file: {}", root.join(LOG_FILE_NAME).display()));
        OutputFormatter::info(&format!(
            "To restore the original structure run: dirjanitor {} --restore",
            root.display()
        ));
    }
    Ok(())
}

/// Runs a command against `dir_path` with the default configuration location.
///
/// # Examples
///
/// ```no_run
/// use dirjanitor::cli::{run_cli, OrganizeCommand};
/// use dirjanitor::destination::Strategy;
/// use std::path::Path;
///
/// let command = OrganizeCommand::Organize { dry_run: false, strategy: Strategy::Flat };
/// match run_cli(command, Path::new("/path/to/directory")) {
///     Ok(()) => println!("Operation completed successfully"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(command: OrganizeCommand, dir_path: &Path) -> Result<(), String> {
    run_cli_with_config(command, dir_path, None)
}

/// Runs a command with an optional configuration file.
pub fn run_cli_with_config(
    command: OrganizeCommand,
    dir_path: &Path,
    config_path: Option<&Path>,
) -> Result<(), String> {
    match command {
        OrganizeCommand::Organize { dry_run, strategy } => organize_directory_with_config(
            dir_path,
            config_path,
            strategy,
            dry_run,
            &ThresholdOverrides::default(),
        )
        .map(|_| ()),
        OrganizeCommand::Restore {
            strategy,
            assume_yes,
        } => {
            if !assume_yes
                && !confirm(
                    "WARNING: This will move all organized files back to the folder root. Continue?",
                    false,
                )?
            {
                OutputFormatter::plain("Restore cancelled.");
                return Ok(());
            }
            restore_directory(dir_path, strategy).map(|_| ())
        }
    }
}

/// Organizes `base_path` and records the moves in the restore manifest.
///
/// This function:
/// 1. Loads the configuration (creating or regenerating it on real runs)
/// 2. Opens the action log and takes the run lock
/// 3. Runs the engine over the folder's top-level entries
/// 4. Appends the moves to the restore manifest
/// 5. Prints every event and a summary table
///
/// A dry run writes nothing: no config, no log file, no lock, no manifest.
pub fn organize_directory_with_config(
    base_path: &Path,
    config_path: Option<&Path>,
    strategy: Strategy,
    dry_run: bool,
    overrides: &ThresholdOverrides,
) -> Result<RunSummary, String> {
    if !base_path.is_dir() {
        return Err(format!(
            "Error reading directory {}: not a directory",
            base_path.display()
        ));
    }

    if dry_run {
        OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", base_path.display()));
    } else {
        OutputFormatter::info(&format!("Organizing contents of: {}", base_path.display()));
    }

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_config_path(base_path));

    let mut log = if dry_run {
        ActionLog::in_memory()
    } else {
        ActionLog::open(&base_path.join(LOG_FILE_NAME))
            .map_err(|e| format!("Error opening action log: {}", e))?
    };
    log.note(&format!("=== DIRJANITOR STARTED ({}) ===", strategy));
    log.note(&format!("Target directory: {}", base_path.display()));

    let mut config = load_configuration(&config_path, !dry_run, &mut log)?;
    overrides.apply(&mut config);
    for warning in config.sanitize() {
        OutputFormatter::warning(&warning);
        log.note(&format!("Config warning: {}", warning));
    }

    let _lock = if dry_run {
        None
    } else {
        Some(acquire_lock(base_path)?)
    };

    let mut organizer = FileOrganizer::new(base_path, config, strategy, log)
        .map_err(|e| format!("Error compiling filters: {}", e))?
        .with_dry_run(dry_run)
        .with_progress(OutputFormatter::create_progress_bar(0));
    if config_path.parent() == Some(base_path)
        && let Some(name) = config_path.file_name()
    {
        organizer = organizer.with_artifact(name.to_string_lossy().into_owned());
    }

    let summary = organizer.organize().map_err(|e| format!("Error: {}", e))?;
    let mut log = organizer.into_log();

    for event in log.events() {
        OutputFormatter::event(event, dry_run);
    }

    if !dry_run && !summary.operations.is_empty() {
        let mut manifest = RestoreManifest::load(base_path)
            .map_err(|e| format!("Error: {}", e))?
            .unwrap_or_else(|| RestoreManifest::new(base_path, strategy));
        manifest.extend(strategy, &summary.operations);

        match manifest.save() {
            Ok(()) => log.note(&format!(
                "Restore manifest updated: {}",
                RestoreManifest::path(base_path).display()
            )),
            Err(e) => {
                OutputFormatter::warning(&format!("Could not save restore manifest: {}", e));
                log.note(&format!("Could not save restore manifest: {}", e));
            }
        }
    }
    log.note("=== DIRJANITOR COMPLETED ===");

    OutputFormatter::summary_table(&summary);
    if dry_run {
        OutputFormatter::success("Dry run complete. No files were modified.");
    } else if summary.failed > 0 {
        OutputFormatter::warning("Some entries could not be organized. Please review errors above.");
    } else {
        OutputFormatter::success("Organization complete!");
    }

    Ok(summary)
}

/// Restores `base_path` from its manifest (or its hierarchy) without prompting.
pub fn restore_directory(base_path: &Path, strategy: Strategy) -> Result<RestoreReport, String> {
    OutputFormatter::info("Restoring previous organization...");

    let lock = acquire_lock(base_path)?;
    let report = Restorer::restore_root(base_path, strategy).map_err(|e| format!("Error: {}", e));
    drop(lock);
    // Leaves the folder clean once nothing is left to restore.
    if let Err(e) = fs::remove_dir(state_dir(base_path)) {
        debug!("Keeping {}: {}", state_dir(base_path).display(), e);
    }
    let report = report?;

    if let Ok(mut log) = ActionLog::open(&base_path.join(LOG_FILE_NAME)) {
        log.note(&format!(
            "RESTORED {} entries ({} skipped, {} failed)",
            report.restored_files,
            report.skipped_files.len(),
            report.failed_restores.len()
        ));
    }

    OutputFormatter::restore_report(&report);
    Ok(report)
}

fn acquire_lock(base_path: &Path) -> Result<RunLock, String> {
    RunLock::acquire(base_path).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            OrganizeError::AlreadyRunning {
                lock_path: state_dir(base_path),
            }
            .to_string()
        } else {
            format!("Error taking run lock: {}", e)
        }
    })
}

/// Loads the configuration, writing defaults only when `persist` is set.
fn load_configuration(
    path: &Path,
    persist: bool,
    log: &mut ActionLog,
) -> Result<Configuration, String> {
    if !persist {
        return Ok(match Configuration::load_from_file(path) {
            Ok(config) => config,
            Err(_) => Configuration::default(),
        });
    }

    let (config, outcome) = Configuration::load_or_create(path)
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    match outcome {
        LoadOutcome::Loaded => log.note(&format!("Config loaded: {}", path.display())),
        LoadOutcome::Created => {
            OutputFormatter::info("No config file found, created a default one");
            log.note(&format!("Default config created: {}", path.display()));
        }
        LoadOutcome::Regenerated { reason } => {
            OutputFormatter::warning("Configuration file corrupted, created a new default config");
            log.note(&format!("Config regenerated ({}): {}", reason, path.display()));
        }
    }
    Ok(config)
}

fn confirm(prompt: &str, default: bool) -> Result<bool, String> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|e| format!("Prompt failed: {}", e))
}

/// Asks for a target folder until a valid one is confirmed.
fn prompt_target_directory(cwd: &Path, strategy: Strategy) -> Result<PathBuf, String> {
    loop {
        let input: String = Input::new()
            .with_prompt("Please enter the full path to target folder")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| format!("Prompt failed: {}", e))?;

        let root = match validate_target(&input, cwd) {
            Ok(root) => root,
            Err(e) => {
                OutputFormatter::error(&format!("{}. Please try again.", e));
                continue;
            }
        };

        OutputFormatter::plain(&format!("\nWill organize folder: {}", root.display()));
        OutputFormatter::plain(&format!("Layout: {}", strategy));
        if confirm("Continue?", false)? {
            return Ok(root);
        }
        OutputFormatter::plain("Operation cancelled. Choose a different folder.");
    }
}

/// Prompts for new thresholds and saves them to the configuration file.
fn customize_thresholds(config_path: &Path) -> Result<(), String> {
    let (mut config, _) = Configuration::load_or_create(config_path)
        .map_err(|e| format!("Error loading configuration: {}", e))?;

    OutputFormatter::header("CUSTOMIZE SETTINGS");
    config.size_thresholds.large_mb = Input::new()
        .with_prompt("Large file threshold in MB")
        .default(config.size_thresholds.large_mb)
        .interact_text()
        .map_err(|e| format!("Prompt failed: {}", e))?;
    config.size_thresholds.huge_mb = Input::new()
        .with_prompt("Huge file threshold in MB")
        .default(config.size_thresholds.huge_mb)
        .interact_text()
        .map_err(|e| format!("Prompt failed: {}", e))?;

    for warning in config.sanitize() {
        OutputFormatter::warning(&warning);
    }
    config
        .save(config_path)
        .map_err(|e| format!("Error saving configuration: {}", e))?;
    OutputFormatter::success("Custom configuration saved!");
    Ok(())
}
