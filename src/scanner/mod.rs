//! Scanner module for directory traversal and file fingerprinting.
//!
//! This module provides functionality for:
//! - Sequential directory walking over one or more roots using walkdir
//! - Streaming exact fingerprints with xxHash64
//! - Near-duplicate fingerprints with a simhash accumulator
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: Streaming digest engine
//! - [`simhash`]: Bit-weighted simhash accumulator
//!
//! # Example
//!
//! ```no_run
//! use dupescan::scanner::{Hasher, Walker, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let walker = Walker::new(vec![PathBuf::from(".")], WalkerConfig::default());
//! let hasher = Hasher::new();
//! for entry in walker.walk() {
//!     let entry = entry.expect("walk failed");
//!     match hasher.digest(&entry.path) {
//!         Ok(digest) => println!("{:016x} {}", digest.exact, entry.path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod simhash;
pub mod walker;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use hasher::{fingerprint_to_hex, Digest, Hasher, DEFAULT_BUFFER_SIZE};
pub use simhash::{
    feature_hash, Simhash, SimhashAccumulator, SimhashWidth, WindowedSimhash, FEATURE_WINDOW,
};
pub use walker::Walker;

/// Metadata for a discovered regular file, before hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path to the file as produced by the walk
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time, `None` when the platform could not report it
    pub modified: Option<SystemTime>,
}

impl FileEntry {
    /// Create a new FileEntry.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified: Some(modified),
        }
    }

    /// Entry whose modification time is unknown.
    ///
    /// Oldest-first ordering places such files after every dated member.
    #[must_use]
    pub fn without_mtime(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            modified: None,
        }
    }
}

/// A fully hashed file.
///
/// Only constructible from a [`FileEntry`] and a successful [`Digest`], so
/// a record never carries a fingerprint from a partial read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time, if known
    pub modified: Option<SystemTime>,
    /// xxHash64 of the full content
    pub fingerprint: u64,
    /// Similarity fingerprint, when similarity mode is active
    pub similarity: Option<Simhash>,
    /// Records sharing this record's grouping key so far, itself included.
    /// Zero until the grouping engine observes the record.
    pub occurrence: u64,
}

impl FileRecord {
    /// Combine a walked entry with its digest.
    #[must_use]
    pub fn new(entry: FileEntry, digest: Digest) -> Self {
        Self {
            path: entry.path,
            size: entry.size,
            modified: entry.modified,
            fingerprint: digest.exact,
            similarity: digest.similarity,
            occurrence: 0,
        }
    }

    /// Exact fingerprint as 16 hex digits.
    #[must_use]
    pub fn fingerprint_hex(&self) -> String {
        fingerprint_to_hex(self.fingerprint)
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (gitignore-style), relative to each root.
    pub ignore_patterns: Vec<String>,
}

impl WalkerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(
        skip_hidden: bool,
        min_size: Option<u64>,
        max_size: Option<u64>,
        ignore_patterns: Vec<String>,
    ) -> Self {
        Self {
            skip_hidden,
            min_size,
            max_size,
            ignore_patterns,
        }
    }
}

/// Errors that abort a directory walk.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when listing a directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified root was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while listing a directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error raised for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Errors that can occur while hashing one file.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path of the file that failed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Io { path: p, .. } => p,
        }
    }
}
