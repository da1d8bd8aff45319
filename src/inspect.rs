//! Per-file inspection: size classes and content fingerprints.
//!
//! Both functions here are leaves of the organizer. They read metadata or
//! content but never move or create anything, so they can be tested in
//! isolation against a temporary directory.

use crate::config::SizeThresholds;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Bytes per megabyte used for every size comparison.
pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// Chunk size used when streaming a file through the digest.
const CHUNK_SIZE: usize = 4096;

/// Size bucket derived from a file's length and the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Empty,
    Normal,
    Large,
    Huge,
}

impl SizeClass {
    /// Classifies a size in megabytes.
    ///
    /// The checks run in a fixed order and the first match wins:
    /// exactly zero is `Empty`, then strictly above `huge_mb` is `Huge`,
    /// then strictly above `large_mb` is `Large`, otherwise `Normal`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirjanitor::config::SizeThresholds;
    /// use dirjanitor::inspect::SizeClass;
    ///
    /// let thresholds = SizeThresholds { large_mb: 2.0, huge_mb: 10.0 };
    /// assert_eq!(SizeClass::classify(0.0, &thresholds), SizeClass::Empty);
    /// assert_eq!(SizeClass::classify(2.0, &thresholds), SizeClass::Normal);
    /// assert_eq!(SizeClass::classify(2.5, &thresholds), SizeClass::Large);
    /// assert_eq!(SizeClass::classify(10.5, &thresholds), SizeClass::Huge);
    /// ```
    pub fn classify(size_mb: f64, thresholds: &SizeThresholds) -> Self {
        if size_mb == 0.0 {
            SizeClass::Empty
        } else if size_mb > thresholds.huge_mb {
            SizeClass::Huge
        } else if size_mb > thresholds.large_mb {
            SizeClass::Large
        } else {
            SizeClass::Normal
        }
    }
}

/// Returns the size of `path` in megabytes, without rounding.
pub fn size_mb(path: &Path) -> io::Result<f64> {
    let metadata = std::fs::metadata(path)?;
    Ok(bytes_to_mb(metadata.len()))
}

/// Converts a byte count to megabytes.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// A 128-bit content digest used for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// The file could not be read while computing its fingerprint.
///
/// This is recoverable: the organizer skips the file and keeps scanning.
#[derive(Debug)]
pub struct FingerprintError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for FingerprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to fingerprint {}: {}",
            self.path.display(),
            self.source
        )
    }
}

impl std::error::Error for FingerprintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Computes the MD5 fingerprint of a file, streaming it in fixed-size chunks.
///
/// Memory use is bounded by the chunk size regardless of the file's length.
pub fn fingerprint(path: &Path) -> Result<Fingerprint, FingerprintError> {
    let wrap = |source: io::Error| FingerprintError {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(wrap)?;
    let mut context = md5::Context::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => context.consume(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(wrap(e)),
        }
    }

    Ok(Fingerprint(context.compute().0))
}

/// Everything the organizer needs to know about one top-level file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Lowercased extension without the leading dot.
    pub extension: Option<String>,
    pub modified: SystemTime,
    pub fingerprint: Fingerprint,
}

impl FileRecord {
    /// Reads metadata and fingerprints the file.
    ///
    /// A metadata failure is reported as a [`FingerprintError`] too: either
    /// way the file could not be inspected and is skipped.
    pub fn read(path: &Path) -> Result<Self, FingerprintError> {
        let metadata = std::fs::metadata(path).map_err(|source| FingerprintError {
            path: path.to_path_buf(),
            source,
        })?;
        let fingerprint = fingerprint(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase()),
            modified: metadata.modified().unwrap_or_else(|_| SystemTime::now()),
            fingerprint,
        })
    }

    pub fn size_mb(&self) -> f64 {
        bytes_to_mb(self.size_bytes)
    }
}
