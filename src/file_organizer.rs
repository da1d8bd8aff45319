/// The organization engine: one instance per run over one root folder.
///
/// The engine lists the root once, sorts the entries by name and dispatches
/// each one through a fixed precedence: skip-list, temp-folder deletion,
/// plain directory, file. Files are fingerprinted for duplicate detection,
/// classified by size and extension, and moved into the destination chosen
/// by the active [`Strategy`]. Per-entry failures are logged and never stop
/// the scan.
use crate::action_log::{ActionEvent, ActionKind, ActionLog, LOG_FILE_NAME};
use crate::config::{CompiledFilters, ConfigError, Configuration, DEFAULT_CONFIG_FILE};
use crate::destination::{CLOSET_DIR, DestinationResolver, Strategy};
use crate::file_category::{Category, FileMapper};
use crate::inspect::{Fingerprint, FileRecord, SizeClass};
use crate::lock::STATE_DIR;
use indicatif::ProgressBar;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Substring that marks a top-level directory as disposable.
const TEMP_MARKER: &str = "temp";

/// Represents a single relocation performed during a run.
///
/// Recorded in the restore manifest so the move can be reversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// The original path of the entry before organization.
    pub original_path: PathBuf,
    /// The path the entry was moved to.
    pub new_path: PathBuf,
    /// Key of the category the entry was moved to.
    pub category: String,
}

/// Errors that can occur during organization.
#[derive(Debug)]
pub enum OrganizeError {
    /// The root path does not exist or is not a directory.
    InvalidBasePath {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The root directory could not be listed.
    EnumerationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to create a destination directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move an entry to its destination.
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
    /// Failed to delete a temp folder.
    DeleteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Another run holds the lock for this root.
    AlreadyRunning { lock_path: PathBuf },
    /// Filter rules could not be compiled.
    InvalidConfiguration(ConfigError),
    /// Failed to write the restore manifest.
    ManifestWriteFailed { source: std::io::Error },
    /// Failed to read the restore manifest.
    ManifestReadFailed { source: std::io::Error },
    /// The restore manifest has an invalid format.
    InvalidManifestFormat { reason: String },
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBasePath { path, source } => {
                write!(f, "Invalid base path {}: {}", path.display(), source)
            }
            Self::EnumerationFailed { path, source } => {
                write!(f, "Failed to list {}: {}", path.display(), source)
            }
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::DeleteFailed { path, source } => {
                write!(f, "Failed to delete {}: {}", path.display(), source)
            }
            Self::AlreadyRunning { lock_path } => {
                write!(
                    f,
                    "Another run is in progress (lock file {} exists)",
                    lock_path.display()
                )
            }
            Self::InvalidConfiguration(e) => write!(f, "{}", e),
            Self::ManifestWriteFailed { source } => {
                write!(f, "Failed to write restore manifest: {}", source)
            }
            Self::ManifestReadFailed { source } => {
                write!(f, "Failed to read restore manifest: {}", source)
            }
            Self::InvalidManifestFormat { reason } => {
                write!(f, "Invalid restore manifest: {}", reason)
            }
        }
    }
}

impl std::error::Error for OrganizeError {}

impl From<ConfigError> for OrganizeError {
    fn from(e: ConfigError) -> Self {
        OrganizeError::InvalidConfiguration(e)
    }
}

/// Result type for organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Counts and moves from one run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Entries relocated, duplicates included.
    pub moved: usize,
    /// Entries relocated to the duplicates category.
    pub duplicates: usize,
    /// Entries left in place (skip-list, filters, unreadable).
    pub skipped: usize,
    /// Temp folders removed.
    pub deleted: usize,
    /// Moves or deletes that failed.
    pub failed: usize,
    /// Moved entries per destination folder name.
    pub per_category: BTreeMap<String, usize>,
    /// Every successful move, in scan order.
    pub operations: Vec<Operation>,
}

/// Builds `<stem>_<tag>_<n><suffix>` from an entry's file name.
///
/// ```
/// use dirjanitor::file_organizer::tagged_name;
/// use std::path::Path;
///
/// assert_eq!(tagged_name(Path::new("a/report.tar.gz"), "duplicate", 3), "report.tar_duplicate_3.gz");
/// assert_eq!(tagged_name(Path::new("README"), "restored", 1), "README_restored_1");
/// ```
pub fn tagged_name(path: &Path, tag: &str, n: u64) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{}_{}_{}{}", stem, tag, n, suffix)
}

/// Organizes the top-level entries of one folder.
pub struct FileOrganizer {
    root: PathBuf,
    config: Configuration,
    filters: CompiledFilters,
    resolver: DestinationResolver,
    mapper: FileMapper,
    fingerprints: HashMap<Fingerprint, PathBuf>,
    duplicate_counter: u64,
    artifact_names: Vec<String>,
    year_dir: Regex,
    log: ActionLog,
    dry_run: bool,
    progress: ProgressBar,
}

impl FileOrganizer {
    /// Creates an engine for `root` with an empty fingerprint table.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::InvalidConfiguration` if the filter rules do
    /// not compile.
    pub fn new(
        root: &Path,
        config: Configuration,
        strategy: Strategy,
        log: ActionLog,
    ) -> OrganizeResult<Self> {
        let filters = config.compile_filters()?;
        let resolver = DestinationResolver::new(root, strategy, &config);
        let year_dir = Regex::new(r"^[0-9]{4}$").expect("year pattern is valid");

        Ok(Self {
            root: root.to_path_buf(),
            config,
            filters,
            resolver,
            mapper: FileMapper::default(),
            fingerprints: HashMap::new(),
            duplicate_counter: 0,
            artifact_names: vec![LOG_FILE_NAME.to_string(), DEFAULT_CONFIG_FILE.to_string()],
            year_dir,
            log,
            dry_run: false,
            progress: ProgressBar::hidden(),
        })
    }

    /// Plan only: compute destinations and record events without touching disk.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Adds another top-level name the engine must never touch, such as a
    /// configuration file stored in the root under a custom name.
    pub fn with_artifact(mut self, name: impl Into<String>) -> Self {
        self.artifact_names.push(name.into());
        self
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    pub fn into_log(self) -> ActionLog {
        self.log
    }

    /// Runs one pass over the root.
    ///
    /// # Errors
    ///
    /// Only failures that happen before any entry is touched are returned:
    /// a missing or unlistable root, or (for the flat layout) a closet that
    /// cannot be created. Everything else is logged and counted.
    pub fn organize(&mut self) -> OrganizeResult<RunSummary> {
        if !self.root.is_dir() {
            return Err(OrganizeError::InvalidBasePath {
                path: self.root.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "base path does not exist or is not a directory",
                ),
            });
        }

        let mut entries: Vec<DirEntry> = fs::read_dir(&self.root)
            .map_err(|e| OrganizeError::EnumerationFailed {
                path: self.root.clone(),
                source: e,
            })?
            .flatten()
            .collect();
        entries.sort_by_key(|e| e.file_name());

        if !self.dry_run {
            self.resolver
                .prepare()
                .map_err(|e| OrganizeError::DirectoryCreationFailed {
                    path: self.root.join(CLOSET_DIR),
                    source: e,
                })?;
        }

        self.log.note(&format!(
            "Starting {} organization of {} ({} entries)",
            self.resolver.strategy(),
            self.root.display(),
            entries.len()
        ));
        self.progress.set_length(entries.len() as u64);

        let mut summary = RunSummary::default();
        for entry in &entries {
            self.progress
                .set_message(entry.file_name().to_string_lossy().into_owned());
            self.process_entry(entry, &mut summary);
            self.progress.inc(1);
        }
        self.progress.finish_and_clear();

        self.log.note(&format!(
            "Organization complete. Moved {}, found {} duplicates, skipped {}, deleted {}, failed {}",
            summary.moved, summary.duplicates, summary.skipped, summary.deleted, summary.failed
        ));

        Ok(summary)
    }

    fn process_entry(&mut self, entry: &DirEntry, summary: &mut RunSummary) {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                self.skip(&path, format!("cannot read entry type: {}", e), summary);
                return;
            }
        };

        if let Some(reason) = self.skip_reason(&name, file_type.is_dir()) {
            self.skip(&path, reason.to_string(), summary);
            return;
        }

        if file_type.is_dir() {
            if self.config.features.delete_temp_folder && name.contains(TEMP_MARKER) {
                self.delete_temp_folder(&path, summary);
            } else {
                self.move_folder(&path, summary);
            }
            return;
        }

        // FIFOs, sockets and device nodes are left alone: opening a FIFO
        // with no writer would block the run.
        let is_file = file_type.is_file()
            || (file_type.is_symlink() && fs::metadata(&path).is_ok_and(|m| m.is_file()));
        if !is_file {
            self.skip(&path, "not a regular file".to_string(), summary);
            return;
        }

        self.process_file(&path, summary);
    }

    /// Returns why an entry belongs to the skip-list, if it does.
    fn skip_reason(&self, name: &str, is_dir: bool) -> Option<&'static str> {
        if name.starts_with(STATE_DIR) {
            return Some("run state");
        }
        if self.artifact_names.iter().any(|a| a == name) {
            return Some("tool artifact");
        }
        if is_dir {
            match self.resolver.strategy() {
                Strategy::Flat if name == CLOSET_DIR => return Some("organization folder"),
                Strategy::DateFirst if self.year_dir.is_match(name) => {
                    return Some("already organized year folder");
                }
                _ => {}
            }
        }
        if !self.filters.should_include(name) {
            return Some("excluded by filters");
        }
        None
    }

    fn process_file(&mut self, path: &Path, summary: &mut RunSummary) {
        let record = match FileRecord::read(path) {
            Ok(record) => record,
            Err(e) => {
                self.skip(path, format!("hash error: {}", e.source), summary);
                return;
            }
        };

        if let Some(first) = self.fingerprints.get(&record.fingerprint) {
            debug!(
                "{} has the same content as {}",
                path.display(),
                first.display()
            );
            self.move_duplicate(&record, summary);
            return;
        }
        self.fingerprints
            .insert(record.fingerprint, record.path.clone());

        let size_mb = record.size_mb();
        let size_class = match SizeClass::classify(size_mb, &self.config.size_thresholds) {
            SizeClass::Large | SizeClass::Huge if !self.config.features.sort_by_size => {
                SizeClass::Normal
            }
            class => class,
        };
        let category = self
            .mapper
            .categorize(false, size_class, record.extension.as_deref());

        let detail = match category {
            Category::LargeFiles | Category::HugeFiles => {
                format!("{} ({:.1}MB)", category.description(), size_mb)
            }
            _ => category.description().to_string(),
        };

        let Some(name) = path.file_name() else {
            self.skip(path, "file has no name component".to_string(), summary);
            return;
        };
        let name = name.to_string_lossy().into_owned();
        self.move_entry(path, category, record.modified, &name, detail, summary);
    }

    fn move_duplicate(&mut self, record: &FileRecord, summary: &mut RunSummary) {
        let dest_dir = match self.destination_dir(Category::Duplicates, record.modified) {
            Ok(dir) => dir,
            Err(e) => {
                self.fail(&record.path, e.to_string(), summary);
                return;
            }
        };

        // The counter only ever grows, so names are unique within a run; the
        // existence check also steps over names left by earlier runs.
        let new_name = loop {
            self.duplicate_counter += 1;
            let candidate = tagged_name(&record.path, "duplicate", self.duplicate_counter);
            if !dest_dir.join(&candidate).exists() {
                break candidate;
            }
        };

        self.move_entry(
            &record.path,
            Category::Duplicates,
            record.modified,
            &new_name,
            Category::Duplicates.description().to_string(),
            summary,
        );
    }

    fn move_folder(&mut self, path: &Path, summary: &mut RunSummary) {
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.move_entry(
            path,
            Category::Folders,
            modified,
            &name,
            Category::Folders.description().to_string(),
            summary,
        );
    }

    fn delete_temp_folder(&mut self, path: &Path, summary: &mut RunSummary) {
        if !self.dry_run
            && let Err(e) = fs::remove_dir_all(path)
        {
            let error = OrganizeError::DeleteFailed {
                path: path.to_path_buf(),
                source: e,
            };
            self.fail(path, error.to_string(), summary);
            return;
        }

        self.log
            .record(ActionEvent::new(ActionKind::Deleted, path, "temp folder"));
        summary.deleted += 1;
    }

    fn destination_dir(&self, category: Category, modified: SystemTime) -> OrganizeResult<PathBuf> {
        if self.dry_run {
            return Ok(self.resolver.resolve(category, modified));
        }
        self.resolver
            .materialize(category, modified)
            .map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: self.resolver.resolve(category, modified),
                source: e,
            })
    }

    /// Moves `path` to `<destination of category>/<target_name>`.
    ///
    /// An existing entry at the target is never overwritten; the move fails
    /// instead.
    fn move_entry(
        &mut self,
        path: &Path,
        category: Category,
        modified: SystemTime,
        target_name: &str,
        detail: String,
        summary: &mut RunSummary,
    ) {
        let dest_dir = match self.destination_dir(category, modified) {
            Ok(dir) => dir,
            Err(e) => {
                self.fail(path, e.to_string(), summary);
                return;
            }
        };
        let destination = dest_dir.join(target_name);

        if !self.dry_run {
            let result = if fs::symlink_metadata(&destination).is_ok() {
                Err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "destination already exists",
                ))
            } else {
                fs::rename(path, &destination)
            };

            if let Err(e) = result {
                let error = OrganizeError::FileMoveFailure {
                    source: path.to_path_buf(),
                    destination,
                    source_error: e,
                };
                self.fail(path, error.to_string(), summary);
                return;
            }
        }

        let described = if category == Category::Duplicates {
            self.resolver.describe(&destination)
        } else {
            format!("{}/", self.resolver.describe(&dest_dir))
        };
        self.log
            .record(ActionEvent::new(ActionKind::Moved, path, detail).with_destination(described));

        summary.moved += 1;
        if category == Category::Duplicates {
            summary.duplicates += 1;
        }
        *summary
            .per_category
            .entry(self.config.folder_name(category))
            .or_insert(0) += 1;
        summary.operations.push(Operation {
            original_path: path.to_path_buf(),
            new_path: destination,
            category: category.key().to_string(),
        });
    }

    fn skip(&mut self, path: &Path, reason: String, summary: &mut RunSummary) {
        self.log
            .record(ActionEvent::new(ActionKind::Skipped, path, reason));
        summary.skipped += 1;
    }

    fn fail(&mut self, path: &Path, reason: String, summary: &mut RunSummary) {
        self.log
            .record(ActionEvent::new(ActionKind::Failed, path, reason));
        summary.failed += 1;
    }
}
