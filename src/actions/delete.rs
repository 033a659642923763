//! Removal of redundant duplicates.
//!
//! # Overview
//!
//! Deletion works in two steps:
//! 1. [`plan_deletions`] picks every non-canonical member of every duplicate
//!    class. The canonical member (first in the class) is never selected, and
//!    each class is checked to keep at least one copy. A member that resolves
//!    to the same file as the canonical one is never selected either.
//! 2. [`execute_plan`] re-checks each target's size and modification time
//!    against the scan, then moves it to the system trash or removes it
//!    permanently. A file that changed since the scan is left alone.
//!
//! Failures are collected per file; one failure never stops the batch.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::actions::delete::{execute_plan, plan_deletions, DeleteMode};
//! use dupescan::duplicates::DuplicateFinder;
//! use std::path::PathBuf;
//!
//! let report = DuplicateFinder::with_defaults()
//!     .find_duplicates(&[PathBuf::from(".")])
//!     .unwrap();
//! let plan = plan_deletions(&report.classes).unwrap();
//! let result = execute_plan(&plan, DeleteMode::Trash);
//! println!("{}", result.summary());
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytesize::ByteSize;
use serde::Serialize;
use thiserror::Error;

use crate::duplicates::EquivalenceClass;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Size or modification time differs from the scan.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// File that could not be trashed
        path: PathBuf,
        /// Message from the trash backend
        message: String,
    },

    /// A selection would remove every member of a class.
    #[error("cannot delete all copies - at least one file must be preserved")]
    AllCopiesWouldBeDeleted,

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// How files are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Move to the system trash (recoverable).
    #[default]
    Trash,
    /// Remove from disk.
    Permanent,
}

impl DeleteMode {
    /// Mode for the `permanent_delete` setting.
    #[must_use]
    pub fn from_permanent(permanent: bool) -> Self {
        if permanent {
            Self::Permanent
        } else {
            Self::Trash
        }
    }
}

/// One file scheduled for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteTarget {
    /// File to remove
    pub path: PathBuf,
    /// Size recorded by the scan
    pub size: u64,
    /// Modification time recorded by the scan, if known
    #[serde(skip)]
    pub modified: Option<SystemTime>,
    /// Canonical member kept for this file's class
    pub keep: PathBuf,
}

/// Every removal derived from a scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeletePlan {
    /// Targets in report order
    pub targets: Vec<DeleteTarget>,
}

impl DeletePlan {
    /// Number of files to remove.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// True when nothing would be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Bytes that removal would free.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.targets.iter().map(|t| t.size).sum()
    }
}

/// Result of a successful deletion.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the deleted file in bytes.
    pub size: u64,
    /// How it was removed.
    pub mode: DeleteMode,
}

/// Results of a batch deletion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchDeleteResult {
    /// Successfully deleted files.
    pub successes: Vec<DeleteResult>,
    /// Failed deletions with their error messages.
    pub failures: Vec<(PathBuf, String)>,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl BatchDeleteResult {
    /// Number of successful deletions.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed deletions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if all deletions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let freed = ByteSize::b(self.bytes_freed);
        if self.all_succeeded() {
            format!("Deleted {} file(s), freed {}", self.success_count(), freed)
        } else {
            format!(
                "Deleted {} file(s), {} failed, freed {}",
                self.success_count(),
                self.failure_count(),
                freed
            )
        }
    }
}

/// Select every non-canonical member of every duplicate class.
///
/// # Errors
///
/// Returns [`DeleteError::AllCopiesWouldBeDeleted`] if a class would lose
/// all of its members.
pub fn plan_deletions(classes: &[EquivalenceClass]) -> Result<DeletePlan, DeleteError> {
    let mut plan = DeletePlan::default();

    for class in classes.iter().filter(|c| c.is_duplicate()) {
        let Some(canonical) = class.canonical() else {
            continue;
        };
        let selected: Vec<&Path> = class.redundant().iter().map(|r| r.path.as_path()).collect();
        let members: Vec<&Path> = class.members.iter().map(|r| r.path.as_path()).collect();
        validate_preserves_copy(&selected, &members)?;

        for r in class.redundant() {
            if is_same_file(&r.path, &canonical.path) {
                log::warn!(
                    "Not deleting {}: same file as {}",
                    r.path.display(),
                    canonical.path.display()
                );
                continue;
            }
            plan.targets.push(DeleteTarget {
                path: r.path.clone(),
                size: r.size,
                modified: r.modified,
                keep: canonical.path.clone(),
            });
        }
    }

    log::debug!(
        "Planned {} deletion(s), {} reclaimable",
        plan.len(),
        ByteSize::b(plan.total_bytes())
    );
    Ok(plan)
}

/// Whether two paths name the same file once `..` and symlinks are resolved.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Check that a selection leaves at least one member of a class.
///
/// # Errors
///
/// Returns [`DeleteError::AllCopiesWouldBeDeleted`] otherwise.
pub fn validate_preserves_copy(selected: &[&Path], members: &[&Path]) -> Result<(), DeleteError> {
    let selected: HashSet<&Path> = selected.iter().copied().collect();
    if members.iter().any(|p| !selected.contains(p)) {
        Ok(())
    } else {
        log::error!(
            "Refusing to delete all {} copies of a class",
            members.len()
        );
        Err(DeleteError::AllCopiesWouldBeDeleted)
    }
}

/// Confirm that a target still has the size and mtime seen by the scan.
///
/// # Errors
///
/// Returns [`DeleteError::Modified`] on any difference, or the I/O error
/// from reading its metadata.
pub fn verify_unchanged(target: &DeleteTarget) -> Result<(), DeleteError> {
    let metadata = fs::metadata(&target.path).map_err(|e| DeleteError::from_io(&target.path, e))?;
    let mtime_changed = match (metadata.modified(), target.modified) {
        (Ok(current), Some(recorded)) => current != recorded,
        _ => false,
    };

    if metadata.len() != target.size || mtime_changed {
        log::warn!(
            "File modified since scan: {} (size {} -> {})",
            target.path.display(),
            target.size,
            metadata.len()
        );
        return Err(DeleteError::Modified(target.path.clone()));
    }
    Ok(())
}

/// Remove one file with the given mode.
///
/// # Errors
///
/// Returns [`DeleteError`] if the file is missing or cannot be removed.
pub fn remove_file(path: &Path, size: u64, mode: DeleteMode) -> Result<DeleteResult, DeleteError> {
    match mode {
        DeleteMode::Trash => trash::delete(path).map_err(|e| DeleteError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        DeleteMode::Permanent => {
            fs::remove_file(path).map_err(|e| DeleteError::from_io(path, e))?;
        }
    }

    log::info!(
        "{} {} ({})",
        if mode == DeleteMode::Trash {
            "Moved to trash:"
        } else {
            "Permanently deleted:"
        },
        path.display(),
        ByteSize::b(size)
    );
    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        mode,
    })
}

/// Verify and remove every target, collecting per-file outcomes.
#[must_use]
pub fn execute_plan(plan: &DeletePlan, mode: DeleteMode) -> BatchDeleteResult {
    let mut result = BatchDeleteResult::default();

    for target in &plan.targets {
        let outcome =
            verify_unchanged(target).and_then(|()| remove_file(&target.path, target.size, mode));
        match outcome {
            Ok(deleted) => {
                result.bytes_freed += deleted.size;
                result.successes.push(deleted);
            }
            Err(e) => {
                log::warn!("Failed to delete {}: {}", target.path.display(), e);
                result.failures.push((target.path.clone(), e.to_string()));
            }
        }
    }

    log::info!("{}", result.summary());
    result
}
