//! Destination folder resolution for the two layout strategies.
//!
//! Resolution is a pure function of the category and (for the date-first
//! layout) the entry's modification time. Creating the folders is a
//! separate, idempotent step so paths can be computed for dry runs
//! without touching the disk.

use crate::config::Configuration;
use crate::file_category::Category;
use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Name of the single organization folder used by the flat layout.
pub const CLOSET_DIR: &str = "closet";

/// How destination folders are laid out under the organized root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// `<root>/closet/<category>`, created up front.
    #[default]
    Flat,
    /// `<root>/<YYYY>/<MM>/<category>`, created on first use.
    DateFirst,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Flat => write!(f, "flat"),
            Strategy::DateFirst => write!(f, "date-first"),
        }
    }
}

/// Computes and materializes destination folders for one run.
#[derive(Debug, Clone)]
pub struct DestinationResolver {
    root: PathBuf,
    strategy: Strategy,
    folder_names: Vec<(Category, String)>,
}

impl DestinationResolver {
    pub fn new(root: &Path, strategy: Strategy, config: &Configuration) -> Self {
        Self {
            root: root.to_path_buf(),
            strategy,
            folder_names: Category::ALL
                .iter()
                .map(|&c| (c, config.folder_name(c)))
                .collect(),
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    fn folder_name(&self, category: Category) -> &str {
        self.folder_names
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, name)| name.as_str())
            .unwrap_or_else(|| category.key())
    }

    /// Returns the destination folder for `category` without creating it.
    ///
    /// `modified` is only consulted by the date-first layout; year and month
    /// are taken in local time.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirjanitor::config::Configuration;
    /// use dirjanitor::destination::{DestinationResolver, Strategy};
    /// use dirjanitor::file_category::Category;
    /// use std::path::Path;
    /// use std::time::SystemTime;
    ///
    /// let resolver = DestinationResolver::new(Path::new("/data"), Strategy::Flat, &Configuration::default());
    /// assert_eq!(
    ///     resolver.resolve(Category::Images, SystemTime::now()),
    ///     Path::new("/data/closet/images")
    /// );
    /// ```
    pub fn resolve(&self, category: Category, modified: SystemTime) -> PathBuf {
        let folder = self.folder_name(category);
        match self.strategy {
            Strategy::Flat => self.root.join(CLOSET_DIR).join(folder),
            Strategy::DateFirst => {
                let local: DateTime<Local> = modified.into();
                self.root
                    .join(local.format("%Y").to_string())
                    .join(local.format("%m").to_string())
                    .join(folder)
            }
        }
    }

    /// Resolves the destination and creates it (and any parents) if needed.
    ///
    /// Creating a folder that already exists is not an error.
    pub fn materialize(&self, category: Category, modified: SystemTime) -> io::Result<PathBuf> {
        let path = self.resolve(category, modified);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Creates the folders a strategy needs before scanning starts.
    ///
    /// The flat layout creates the closet and every category folder; the
    /// date-first layout creates nothing up front.
    pub fn prepare(&self) -> io::Result<Vec<PathBuf>> {
        match self.strategy {
            Strategy::Flat => Category::ALL
                .iter()
                .map(|&c| self.materialize(c, SystemTime::UNIX_EPOCH))
                .collect(),
            Strategy::DateFirst => Ok(Vec::new()),
        }
    }

    /// Relative description of a destination, e.g. `closet/images` or
    /// `2025/08/images`, used in log lines.
    pub fn describe(&self, destination: &Path) -> String {
        destination
            .strip_prefix(&self.root)
            .unwrap_or(destination)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(year: i32, month: u32, day: u32) -> SystemTime {
        Local
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .expect("Unambiguous local time")
            .into()
    }

    #[test]
    fn test_flat_resolution_ignores_time() {
        let resolver =
            DestinationResolver::new(Path::new("/r"), Strategy::Flat, &Configuration::default());

        assert_eq!(
            resolver.resolve(Category::Code, at(2020, 1, 1)),
            Path::new("/r/closet/code")
        );
        assert_eq!(
            resolver.resolve(Category::Code, at(2024, 6, 1)),
            Path::new("/r/closet/code")
        );
    }

    #[test]
    fn test_date_first_resolution() {
        let resolver = DestinationResolver::new(
            Path::new("/r"),
            Strategy::DateFirst,
            &Configuration::default(),
        );

        assert_eq!(
            resolver.resolve(Category::Documents, at(2025, 8, 14)),
            Path::new("/r/2025/08/documents")
        );
        assert_eq!(
            resolver.resolve(Category::Duplicates, at(2019, 12, 31)),
            Path::new("/r/2019/12/duplicates")
        );
    }

    #[test]
    fn test_folder_name_override_applies() {
        let mut config = Configuration::default();
        config
            .folder_names
            .insert("images".to_string(), "pictures".to_string());
        let resolver = DestinationResolver::new(Path::new("/r"), Strategy::Flat, &config);

        assert_eq!(
            resolver.resolve(Category::Images, SystemTime::now()),
            Path::new("/r/closet/pictures")
        );
    }

    #[test]
    fn test_flat_prepare_creates_every_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let resolver =
            DestinationResolver::new(temp_dir.path(), Strategy::Flat, &Configuration::default());

        let created = resolver.prepare().expect("Prepare failed");

        assert_eq!(created.len(), Category::ALL.len());
        for category in Category::ALL {
            assert!(temp_dir.path().join(CLOSET_DIR).join(category.key()).is_dir());
        }
        // Second call is a no-op, not an error.
        resolver.prepare().expect("Prepare should be idempotent");
    }

    #[test]
    fn test_date_first_materializes_lazily() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let resolver = DestinationResolver::new(
            temp_dir.path(),
            Strategy::DateFirst,
            &Configuration::default(),
        );

        assert!(resolver.prepare().unwrap().is_empty());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);

        let path = resolver
            .materialize(Category::Media, at(2023, 3, 9))
            .expect("Materialize failed");
        assert!(path.ends_with("2023/03/media"));
        assert!(path.is_dir());
        resolver
            .materialize(Category::Media, at(2023, 3, 9))
            .expect("Materialize should be idempotent");
    }

    #[test]
    fn test_describe_is_root_relative() {
        let resolver =
            DestinationResolver::new(Path::new("/r"), Strategy::Flat, &Configuration::default());
        let dest = resolver.resolve(Category::Images, SystemTime::now());
        assert_eq!(resolver.describe(&dest), "closet/images");
    }
}
