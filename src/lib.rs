//! dirjanitor - A directory organization and cleanup utility
//!
//! This library sorts the top-level entries of a folder into category
//! folders. Duplicates are detected by content fingerprint, files are
//! classified by size and extension, temp folders are removed, and every
//! move is recorded so the run can be restored later. Two layouts are
//! supported: a flat `closet/<category>` tree and a date-first
//! `<YYYY>/<MM>/<category>` tree.

pub mod action_log;
pub mod cli;
pub mod config;
pub mod destination;
pub mod file_category;
pub mod file_organizer;
pub mod inspect;
pub mod lock;
pub mod output;
pub mod restore;

pub use action_log::{ActionEvent, ActionKind, ActionLog};
pub use config::{CompiledFilters, ConfigError, Configuration, SizeThresholds};
pub use destination::{DestinationResolver, Strategy};
pub use file_category::{Category, FileMapper};
pub use file_organizer::{FileOrganizer, RunSummary};
pub use inspect::{Fingerprint, SizeClass};
pub use restore::{RestoreManifest, RestoreReport, Restorer};

pub use cli::{OrganizeCommand, run_cli};
