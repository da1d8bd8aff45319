//! Structured action events and the append-only log they are written to.
//!
//! The organizer emits exactly one [`ActionEvent`] per action. The log keeps
//! every event in memory for the run summary and, when backed by a file,
//! appends one `"<timestamp>: <message>"` line per event.

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name of the action log inside the organized folder.
pub const LOG_FILE_NAME: &str = "janitor_log.txt";

/// Timestamp format used at the start of every log line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Moved,
    Deleted,
    Skipped,
    /// A move or delete was attempted and failed; the run continued.
    Failed,
}

impl ActionKind {
    fn label(&self) -> &'static str {
        match self {
            ActionKind::Moved => "MOVED",
            ActionKind::Deleted => "DELETED",
            ActionKind::Skipped => "SKIPPED",
            ActionKind::Failed => "FAILED",
        }
    }
}

/// One thing the organizer did (or declined to do) to one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEvent {
    pub timestamp: DateTime<Local>,
    pub kind: ActionKind,
    pub subject: PathBuf,
    /// What the entry was, or why it was skipped or failed.
    pub detail: String,
    /// Root-relative destination (e.g. `closet/images/`), if any.
    pub destination: Option<String>,
}

impl ActionEvent {
    pub fn new(kind: ActionKind, subject: &Path, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            subject: subject.to_path_buf(),
            detail: detail.into(),
            destination: None,
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    fn subject_name(&self) -> String {
        self.subject
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.subject.display().to_string())
    }

    /// Renders the event message without its timestamp.
    ///
    /// ```
    /// use dirjanitor::action_log::{ActionEvent, ActionKind};
    /// use std::path::Path;
    ///
    /// let event = ActionEvent::new(ActionKind::Moved, Path::new("/r/a.txt"), ".txt file")
    ///     .with_destination("closet/text_files/");
    /// assert_eq!(event.message(), "MOVED .txt file: a.txt -> closet/text_files/");
    /// ```
    pub fn message(&self) -> String {
        let name = self.subject_name();
        match (&self.kind, &self.destination) {
            (ActionKind::Moved, Some(dest)) => {
                format!("{} {}: {} -> {}", self.kind.label(), self.detail, name, dest)
            }
            (ActionKind::Deleted, _) => format!("{} {}: {}", self.kind.label(), self.detail, name),
            _ => format!("{} {}: {}", self.kind.label(), name, self.detail),
        }
    }

    /// Renders the full log line, including the trailing newline.
    pub fn line(&self) -> String {
        format!(
            "{}: {}\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.message()
        )
    }
}

/// Append-only action log.
///
/// Events are always kept in memory; the file sink is optional so dry runs
/// and tests can record without writing.
pub struct ActionLog {
    file: Option<File>,
    path: Option<PathBuf>,
    events: Vec<ActionEvent>,
}

impl ActionLog {
    /// Opens (or creates) `path` for appending.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Some(file),
            path: Some(path.to_path_buf()),
            events: Vec::new(),
        })
    }

    /// A log that only keeps events in memory.
    pub fn in_memory() -> Self {
        Self {
            file: None,
            path: None,
            events: Vec::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records an event, writing its line if the log is file-backed.
    ///
    /// A failed write is reported through the console logger and otherwise
    /// ignored so logging can never abort a run.
    pub fn record(&mut self, event: ActionEvent) {
        match event.kind {
            ActionKind::Failed => warn!("{}", event.message()),
            ActionKind::Skipped => debug!("{}", event.message()),
            _ => info!("{}", event.message()),
        }
        self.write_line(&event.line());
        self.events.push(event);
    }

    /// Writes a free-form timestamped note (run banners, config notices).
    pub fn note(&mut self, message: &str) {
        info!("{}", message);
        let line = format!("{}: {}\n", Local::now().format(TIMESTAMP_FORMAT), message);
        self.write_line(&line);
    }

    fn write_line(&mut self, line: &str) {
        if let Some(file) = self.file.as_mut()
            && let Err(e) = file.write_all(line.as_bytes())
        {
            warn!("Could not write to action log: {}", e);
        }
    }

    pub fn events(&self) -> &[ActionEvent] {
        &self.events
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}
