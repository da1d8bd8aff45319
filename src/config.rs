//! Run configuration and file filtering rules.
//!
//! The configuration lives next to the organized folder as
//! `janitor_config.json` (or any explicit path; a `.toml` extension switches
//! the format to TOML). A missing or unreadable-as-configuration file is
//! replaced with the defaults, so a run never stops on a bad config.
//!
//! # Configuration File Format
//!
//! ```json
//! {
//!   "folder_names": { "images": "pictures" },
//!   "size_thresholds": { "large_mb": 2.0, "huge_mb": 10.0 },
//!   "features": { "delete_temp_folder": true, "sort_by_size": true },
//!   "filters": {
//!     "include_hidden": true,
//!     "exclude": { "filenames": ["Thumbs.db"], "patterns": ["*.part"],
//!                  "extensions": ["crdownload"], "regex": [] },
//!     "include": { "patterns": [] }
//!   }
//! }
//! ```

use crate::file_category::Category;
use glob::Pattern;
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the configuration inside the organized folder.
pub const DEFAULT_CONFIG_FILE: &str = "janitor_config.json";

/// Errors that can occur during configuration loading and filtering.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Invalid TOML/JSON syntax or structure.
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// IO error while reading or writing configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(
                    f,
                    "Invalid glob pattern '{}': expected *.ext or dir/**",
                    pattern
                )
            }
            ConfigError::InvalidRegexPattern { pattern, reason } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, reason)
            }
            ConfigError::IoError(msg) => write!(f, "IO error accessing configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Megabyte thresholds for the size classes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeThresholds {
    #[serde(default = "default_large_mb")]
    pub large_mb: f64,
    #[serde(default = "default_huge_mb")]
    pub huge_mb: f64,
}

fn default_large_mb() -> f64 {
    2.0
}

fn default_huge_mb() -> f64 {
    10.0
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            large_mb: default_large_mb(),
            huge_mb: default_huge_mb(),
        }
    }
}

/// Optional behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    /// Recursively delete top-level directories whose name contains "temp".
    #[serde(default = "default_true")]
    pub delete_temp_folder: bool,
    /// Route files above the thresholds to large/huge folders.
    #[serde(default = "default_true")]
    pub sort_by_size: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Features {
    fn default() -> Self {
        Self {
            delete_temp_folder: true,
            sort_by_size: true,
        }
    }
}

/// Settings for one organization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Directory name overrides keyed by category key (e.g. `"images"`).
    #[serde(default = "default_folder_names")]
    pub folder_names: BTreeMap<String, String>,

    #[serde(default)]
    pub size_thresholds: SizeThresholds,

    #[serde(default)]
    pub features: Features,

    #[serde(default)]
    pub filters: FilterRules,
}

fn default_folder_names() -> BTreeMap<String, String> {
    [
        Category::TextFiles,
        Category::Images,
        Category::Documents,
        Category::Media,
        Category::Code,
    ]
    .iter()
    .map(|c| (c.key().to_string(), c.key().to_string()))
    .collect()
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            folder_names: default_folder_names(),
            size_thresholds: SizeThresholds::default(),
            features: Features::default(),
            filters: FilterRules::default(),
        }
    }
}

/// How a configuration was obtained by [`Configuration::load_or_create`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The file existed and parsed.
    Loaded,
    /// No file existed; defaults were written.
    Created,
    /// The file did not parse; defaults were written over it.
    Regenerated { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

impl Configuration {
    /// Loads the configuration at `path`, writing defaults if it is missing
    /// or malformed.
    ///
    /// A loaded configuration is returned as written; callers run
    /// [`sanitize`] and report its corrections.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::IoError` only if the file exists but cannot be
    /// read, or if the defaults cannot be written.
    ///
    /// [`sanitize`]: Configuration::sanitize
    pub fn load_or_create(path: &Path) -> Result<(Self, LoadOutcome), ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok((config, LoadOutcome::Created));
        }

        match Self::load_from_file(path) {
            Ok(config) => Ok((config, LoadOutcome::Loaded)),
            Err(ConfigError::ConfigInvalid(reason)) => {
                warn!(
                    "Configuration file {} is corrupted, regenerating defaults: {}",
                    path.display(),
                    reason
                );
                let config = Self::default();
                config.save(path)?;
                Ok((config, LoadOutcome::Regenerated { reason }))
            }
            Err(e) => Err(e),
        }
    }

    /// Load configuration from a specific file without any fallback.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigInvalid` if parsing fails.
    /// Returns `ConfigError::IoError` if file cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        match ConfigFormat::for_path(path) {
            ConfigFormat::Json => serde_json::from_str(&content)
                .map_err(|e| ConfigError::ConfigInvalid(e.to_string())),
            ConfigFormat::Toml => {
                toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
            }
        }
    }

    /// Writes this configuration to `path` in the format its extension implies.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = match ConfigFormat::for_path(path) {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?,
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?,
        };

        fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Clamps thresholds into a usable range and drops unusable folder names.
    ///
    /// Negative or non-finite thresholds become 0 and `huge_mb` is raised to
    /// `large_mb` when inverted. Returns one message per correction.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        let t = &mut self.size_thresholds;

        if !t.large_mb.is_finite() || t.large_mb < 0.0 {
            warnings.push(format!("large_mb {} is invalid, using 0", t.large_mb));
            t.large_mb = 0.0;
        }
        if !t.huge_mb.is_finite() || t.huge_mb < 0.0 {
            warnings.push(format!("huge_mb {} is invalid, using 0", t.huge_mb));
            t.huge_mb = 0.0;
        }
        if t.huge_mb < t.large_mb {
            warnings.push(format!(
                "huge_mb {} is below large_mb {}, raising it to {}",
                t.huge_mb, t.large_mb, t.large_mb
            ));
            t.huge_mb = t.large_mb;
        }

        self.folder_names.retain(|key, name| {
            let usable = Category::from_key(key).is_some()
                && !name.trim().is_empty()
                && !name.contains(['/', '\\'])
                && name != "."
                && name != "..";
            if !usable {
                warnings.push(format!("Ignoring folder name override {} = {:?}", key, name));
            }
            usable
        });

        warnings
    }

    /// Directory name for `category`, honouring `folder_names` overrides.
    pub fn folder_name(&self, category: Category) -> String {
        self.folder_names
            .get(category.key())
            .cloned()
            .unwrap_or_else(|| category.key().to_string())
    }

    /// Compile the filter rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// User-defined rules for entries the organizer should leave alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to organize hidden entries (starting with "."). Defaults to true.
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Rules for excluding entries.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including entries (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            include_hidden: true,
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for excluding entries from organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact names to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the entry name (e.g., "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Extensions to exclude (e.g., "crdownload"), case-insensitive.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the entry name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including entries, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Compiled filter rules for matching top-level entry names.
pub struct CompiledFilters {
    include_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern)
                        .map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_hidden: rules.include_hidden,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Check if an entry should be organized (not excluded).
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden filter - if hidden and disabled, exclude
    /// 3. Exact name match - if matched, exclude
    /// 4. Extension match - if matched, exclude
    /// 5. Glob pattern match - if matched, exclude
    /// 6. Regex pattern match - if matched, exclude
    /// 7. Default: include
    pub fn should_include(&self, name: &str) -> bool {
        if self.include_patterns.iter().any(|p| p.matches(name)) {
            return true;
        }

        if !self.include_hidden && name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(name) {
            return false;
        }

        if let Some(ext) = Path::new(name).extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.exclude_patterns.iter().any(|p| p.matches(name)) {
            return false;
        }

        !self.exclude_regexes.iter().any(|r| r.is_match(name))
    }
}

/// Default configuration path for an organized folder.
pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_CONFIG_FILE)
}
