//! Advisory lock preventing two runs from organizing the same folder at once.
//!
//! The lock is a file created with `create_new` inside the run-state folder.
//! It is removed when the [`RunLock`] is dropped, on both success and error
//! paths. A process killed outright leaves the file behind; deleting it by
//! hand clears the lock.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Hidden folder holding run state (lock, restore manifest).
pub const STATE_DIR: &str = ".janitor";

const LOCK_FILE: &str = "run.lock";

/// Returns the run-state folder for `root`.
pub fn state_dir(root: &Path) -> PathBuf {
    root.join(STATE_DIR)
}

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Takes the lock for `root`.
    ///
    /// Fails with `io::ErrorKind::AlreadyExists` if another run holds it.
    pub fn acquire(root: &Path) -> io::Result<Self> {
        let dir = state_dir(root);
        fs::create_dir_all(&dir)?;

        let path = dir.join(LOCK_FILE);
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Could not release lock {}: {}", self.path.display(), e);
        }
    }
}
