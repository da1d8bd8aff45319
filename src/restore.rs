/// Reversing an organization run.
///
/// A run's moves are recorded as a [`RestoreManifest`]: a list of
/// `{original_path, new_path}` pairs stored under the run-state folder.
/// [`Restorer`] replays a manifest backwards. When no manifest exists the
/// manifest can be rebuilt by walking the organized hierarchy, in which case
/// every entry goes back to the root under its current name.
///
/// Temp folders deleted during a run are gone and cannot be restored.
use crate::destination::{CLOSET_DIR, Strategy};
use crate::file_organizer::{Operation, OrganizeError, OrganizeResult, tagged_name};
use crate::lock::state_dir;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "restore_manifest.json";

/// Everything needed to put a folder back the way it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreManifest {
    /// RFC 3339 timestamp of the first run recorded here.
    pub created: String,
    /// The organized folder.
    pub root: PathBuf,
    /// Layout of the most recent run.
    pub strategy: Strategy,
    /// Moves in the order they happened.
    pub entries: Vec<Operation>,
}

impl RestoreManifest {
    pub fn new(root: &Path, strategy: Strategy) -> Self {
        Self {
            created: chrono::Utc::now().to_rfc3339(),
            root: root.to_path_buf(),
            strategy,
            entries: Vec::new(),
        }
    }

    /// Returns the manifest location for `root`.
    pub fn path(root: &Path) -> PathBuf {
        state_dir(root).join(MANIFEST_FILE)
    }

    /// Appends the moves of another run.
    pub fn extend(&mut self, strategy: Strategy, operations: &[Operation]) {
        self.strategy = strategy;
        self.entries.extend_from_slice(operations);
    }

    /// Saves the manifest as pretty JSON, creating the state folder if needed.
    pub fn save(&self) -> OrganizeResult<()> {
        let path = Self::path(&self.root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| OrganizeError::ManifestWriteFailed { source: e })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| {
            OrganizeError::ManifestWriteFailed {
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("JSON serialization failed: {}", e),
                ),
            }
        })?;

        fs::write(&path, json).map_err(|e| OrganizeError::ManifestWriteFailed { source: e })
    }

    /// Loads the manifest for `root`, if one exists.
    pub fn load(root: &Path) -> OrganizeResult<Option<Self>> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| OrganizeError::ManifestReadFailed { source: e })?;
        let manifest = serde_json::from_str(&json).map_err(|e| {
            OrganizeError::InvalidManifestFormat {
                reason: format!("JSON parse error: {}", e),
            }
        })?;

        Ok(Some(manifest))
    }

    /// Deletes the manifest for `root`.
    pub fn delete(root: &Path) -> OrganizeResult<()> {
        let path = Self::path(root);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| OrganizeError::ManifestWriteFailed { source: e })?;
        }
        Ok(())
    }

    /// Rebuilds a manifest from the organized hierarchy on disk.
    ///
    /// The flat layout is read as `closet/<category>/<entry>` and the
    /// date-first layout as `<YYYY>/<MM>/<category>/<entry>`. Each entry maps
    /// back to `<root>/<entry name>`.
    pub fn from_tree(root: &Path, strategy: Strategy) -> io::Result<Self> {
        let mut manifest = Self::new(root, strategy);

        let category_dirs = match strategy {
            Strategy::Flat => subdirs(&root.join(CLOSET_DIR))?,
            Strategy::DateFirst => {
                let year = Regex::new(r"^[0-9]{4}$").expect("year pattern is valid");
                let mut dirs = Vec::new();
                for year_dir in subdirs(root)?
                    .into_iter()
                    .filter(|d| d.file_name().is_some_and(|n| year.is_match(&n.to_string_lossy())))
                {
                    for month_dir in subdirs(&year_dir)? {
                        dirs.extend(subdirs(&month_dir)?);
                    }
                }
                dirs
            }
        };

        for category_dir in category_dirs {
            let category = category_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut items: Vec<_> = fs::read_dir(&category_dir)?.flatten().collect();
            items.sort_by_key(|e| e.file_name());

            for item in items {
                manifest.entries.push(Operation {
                    original_path: root.join(item.file_name()),
                    new_path: item.path(),
                    category: category.clone(),
                });
            }
        }

        Ok(manifest)
    }
}

/// Sorted subdirectories of `dir`; a missing `dir` has none.
fn subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Represents the result of a restore.
#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Number of entries moved back.
    pub restored_files: usize,
    /// Entries restored under a `_restored_<N>` name: (original, actual).
    pub renamed: Vec<(PathBuf, PathBuf)>,
    /// Entries that could not be moved back.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Entries no longer at their recorded location.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Organizational folders removed because they were left empty.
    pub removed_dirs: usize,
}

impl RestoreReport {
    /// Returns true if the restore was completely successful.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

/// Interprets restore manifests.
pub struct Restorer;

impl Restorer {
    /// Restores `root` from its manifest, or from its hierarchy if it has none.
    ///
    /// The manifest is deleted only if every entry was restored.
    ///
    /// # Errors
    ///
    /// Returns an error if the root doesn't exist, the manifest is corrupted,
    /// or there is nothing to restore.
    pub fn restore_root(root: &Path, strategy: Strategy) -> OrganizeResult<RestoreReport> {
        if !root.is_dir() {
            return Err(OrganizeError::InvalidBasePath {
                path: root.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "base path does not exist"),
            });
        }

        let manifest = match RestoreManifest::load(root)? {
            Some(manifest) => manifest,
            None => RestoreManifest::from_tree(root, strategy).map_err(|e| {
                OrganizeError::EnumerationFailed {
                    path: root.to_path_buf(),
                    source: e,
                }
            })?,
        };

        if manifest.entries.is_empty() {
            return Err(OrganizeError::InvalidManifestFormat {
                reason: "No previous organization found to restore".to_string(),
            });
        }

        let report = Self::restore(root, &manifest);

        if report.is_complete_success()
            && let Err(e) = RestoreManifest::delete(root)
        {
            warn!("Could not delete restore manifest: {}", e);
        }

        Ok(report)
    }

    /// Moves every entry of `manifest` back, newest first, then removes
    /// organizational folders left empty.
    pub fn restore(root: &Path, manifest: &RestoreManifest) -> RestoreReport {
        let mut report = RestoreReport::default();

        for entry in manifest.entries.iter().rev() {
            match Self::restore_entry(entry) {
                Ok(actual) => {
                    report.restored_files += 1;
                    if actual != entry.original_path {
                        report.renamed.push((entry.original_path.clone(), actual));
                    }
                }
                Err(RestoreFailure::Missing(path, reason)) => {
                    report.skipped_files.push((path, reason))
                }
                Err(RestoreFailure::Failed(path, reason)) => {
                    report.failed_restores.push((path, reason))
                }
            }
        }

        report.removed_dirs = Self::remove_empty_dirs(root, &manifest.entries);
        report
    }

    /// Moves one entry back, picking a `_restored_<N>` name if the original
    /// location is occupied. Returns the path it was restored to.
    fn restore_entry(entry: &Operation) -> Result<PathBuf, RestoreFailure> {
        if fs::symlink_metadata(&entry.new_path).is_err() {
            return Err(RestoreFailure::Missing(
                entry.new_path.clone(),
                "File not found at expected location".to_string(),
            ));
        }

        let target = Self::free_path(&entry.original_path);
        fs::rename(&entry.new_path, &target).map_err(|e| {
            RestoreFailure::Failed(
                entry.new_path.clone(),
                format!("Failed to restore file: {}", e),
            )
        })?;

        debug!("Restored {} -> {}", entry.new_path.display(), target.display());
        Ok(target)
    }

    /// `original` if free, otherwise the first free `<stem>_restored_<N><suffix>`.
    fn free_path(original: &Path) -> PathBuf {
        if fs::symlink_metadata(original).is_err() {
            return original.to_path_buf();
        }
        let parent = original.parent().unwrap_or(Path::new(""));
        (1..)
            .map(|n| parent.join(tagged_name(original, "restored", n)))
            .find(|candidate| fs::symlink_metadata(candidate).is_err())
            .unwrap_or_else(|| original.to_path_buf())
    }

    /// Removes now-empty folders between each restored entry and the root,
    /// plus any empty category folders left in the closet.
    fn remove_empty_dirs(root: &Path, entries: &[Operation]) -> usize {
        let mut removed = 0;

        for entry in entries {
            let mut dir = entry.new_path.parent();
            while let Some(current) = dir {
                if current == root || !current.starts_with(root) {
                    break;
                }
                if fs::remove_dir(current).is_err() {
                    break;
                }
                removed += 1;
                dir = current.parent();
            }
        }

        let closet = root.join(CLOSET_DIR);
        if let Ok(dirs) = subdirs(&closet) {
            removed += dirs.iter().filter(|d| fs::remove_dir(d).is_ok()).count();
            if fs::remove_dir(&closet).is_ok() {
                removed += 1;
            }
        }

        removed
    }
}

enum RestoreFailure {
    Missing(PathBuf, String),
    Failed(PathBuf, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn moved(root: &Path, name: &str, category: &str, content: &str) -> Operation {
        let dir = root.join(CLOSET_DIR).join(category);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
        Operation {
            original_path: root.join(name),
            new_path: dir.join(name),
            category: category.to_string(),
        }
    }

    #[test]
    fn test_restore_no_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = Restorer::restore_root(temp_dir.path(), Strategy::Flat);
        assert!(result.is_err());
    }

    #[test]
    fn test_restore_invalid_base_path() {
        let result = Restorer::restore_root(Path::new("/non/existent/path"), Strategy::Flat);
        assert!(matches!(result, Err(OrganizeError::InvalidBasePath { .. })));
    }

    #[test]
    fn test_manifest_save_load_and_delete() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        let mut manifest = RestoreManifest::new(root, Strategy::Flat);
        manifest.extend(Strategy::DateFirst, &[moved(root, "a.txt", "text_files", "a")]);
        manifest.save().expect("Save failed");

        let loaded = RestoreManifest::load(root).unwrap().expect("Manifest missing");
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.strategy, Strategy::DateFirst);

        RestoreManifest::delete(root).unwrap();
        assert!(RestoreManifest::load(root).unwrap().is_none());
    }

    #[test]
    fn test_corrupted_manifest_is_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(state_dir(root)).unwrap();
        fs::write(RestoreManifest::path(root), "[]garbage").unwrap();

        let result = Restorer::restore_root(root, Strategy::Flat);
        assert!(matches!(
            result,
            Err(OrganizeError::InvalidManifestFormat { .. })
        ));
    }

    #[test]
    fn test_restore_from_manifest_removes_empty_dirs() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        let mut manifest = RestoreManifest::new(root, Strategy::Flat);
        manifest.entries.push(moved(root, "a.txt", "text_files", "a"));
        manifest.entries.push(moved(root, "b.jpg", "images", "b"));
        fs::create_dir_all(root.join(CLOSET_DIR).join("code")).unwrap();
        manifest.save().unwrap();

        let report = Restorer::restore_root(root, Strategy::Flat).expect("Restore failed");

        assert_eq!(report.restored_files, 2);
        assert!(report.is_complete_success());
        assert!(root.join("a.txt").exists());
        assert!(root.join("b.jpg").exists());
        assert!(!root.join(CLOSET_DIR).exists());
        assert!(RestoreManifest::load(root).unwrap().is_none());
    }

    #[test]
    fn test_restore_collision_gets_restored_suffix() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        let mut manifest = RestoreManifest::new(root, Strategy::Flat);
        manifest.entries.push(moved(root, "a.txt", "text_files", "organized"));
        fs::write(root.join("a.txt"), "newer").unwrap();
        fs::write(root.join("a_restored_1.txt"), "older restore").unwrap();

        let report = Restorer::restore(root, &manifest);

        assert_eq!(report.restored_files, 1);
        assert_eq!(report.renamed.len(), 1);
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "newer");
        assert_eq!(
            fs::read_to_string(root.join("a_restored_2.txt")).unwrap(),
            "organized"
        );
    }

    #[test]
    fn test_restore_with_missing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        let mut manifest = RestoreManifest::new(root, Strategy::Flat);
        manifest.entries.push(Operation {
            original_path: root.join("nonexistent.txt"),
            new_path: root.join(CLOSET_DIR).join("text_files").join("nonexistent.txt"),
            category: "text_files".to_string(),
        });
        manifest.save().unwrap();

        let report = Restorer::restore_root(root, Strategy::Flat).expect("Restore failed");

        assert_eq!(report.restored_files, 0);
        assert_eq!(report.skipped_files.len(), 1);
        // Incomplete restore keeps the manifest for another attempt.
        assert!(RestoreManifest::load(root).unwrap().is_some());
    }

    #[test]
    fn test_from_tree_date_first() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("2024/05/images")).unwrap();
        fs::create_dir_all(root.join("2025/01/folders/project")).unwrap();
        fs::write(root.join("2024/05/images/b.jpg"), "b").unwrap();
        fs::create_dir_all(root.join("archive/07/images")).unwrap();
        fs::write(root.join("archive/07/images/not_ours.jpg"), "x").unwrap();

        let manifest = RestoreManifest::from_tree(root, Strategy::DateFirst).unwrap();

        let originals: Vec<_> = manifest
            .entries
            .iter()
            .map(|e| e.original_path.clone())
            .collect();
        assert_eq!(originals, vec![root.join("b.jpg"), root.join("project")]);

        let report = Restorer::restore(root, &manifest);
        assert_eq!(report.restored_files, 2);
        assert!(root.join("project").is_dir());
        assert!(!root.join("2024").exists());
        assert!(!root.join("2025").exists());
        assert!(root.join("archive").exists());
    }

    #[test]
    fn test_from_tree_ignores_non_ascii_year_folders() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        let foreign = root.join("\u{662}\u{660}\u{662}\u{663}/01/images");
        fs::create_dir_all(&foreign).unwrap();
        fs::write(foreign.join("x.jpg"), "x").unwrap();

        let manifest = RestoreManifest::from_tree(root, Strategy::DateFirst).unwrap();

        assert!(manifest.entries.is_empty());
    }
}
