//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing one or more
//! root directories and collecting metadata for every regular file. The walk
//! is sequential; parallelism belongs to the hashing stage downstream.
//!
//! # Features
//!
//! - Multiple roots, walked in the order given; a root that repeats another or
//!   lies inside another (after resolving `..` and symlinks) is dropped, so no
//!   file is emitted twice
//! - Symlinks, devices, sockets and FIFOs are skipped silently
//! - Gitignore-style pattern matching via the `ignore` crate
//! - Size filtering (min/max) and hidden file filtering
//! - Graceful shutdown via atomic flag
//!
//! Any directory that cannot be listed is yielded as a [`ScanError`]; the
//! caller decides whether that ends the scan (the finder treats it as fatal).
//!
//! # Example
//!
//! ```no_run
//! use dupescan::scanner::{Walker, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let walker = Walker::new(vec![PathBuf::from("/home/user/Downloads")], WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Walk failed: {}", e),
//!     }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::{DirEntry, WalkDir};

use super::{FileEntry, ScanError, WalkerConfig};

/// Boxed per-root entry stream; `Send` so the finder can bridge it into rayon.
type EntryIter<'a> = Box<dyn Iterator<Item = Result<FileEntry, ScanError>> + Send + 'a>;

/// Directory walker for sequential file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root paths to walk
    roots: Vec<PathBuf>,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker over the given roots.
    ///
    /// Overlapping roots are collapsed with [`dedup_roots`].
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, config: WalkerConfig) -> Self {
        Self {
            roots: dedup_roots(roots),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Roots this walker visits, after overlap removal.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build the ignore matcher for one root from the configured patterns.
    fn build_gitignore(&self, root: &Path) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Check if a file passes size filters.
    fn passes_size_filter(&self, size: u64) -> bool {
        if let Some(min) = self.config.min_size {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.config.max_size {
            if size > max {
                return false;
            }
        }
        true
    }

    /// Walk every root in order, yielding file entries.
    ///
    /// Entries within a directory are yielded in file name order, so two
    /// walks over an unchanged tree produce the same sequence.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + Send + '_ {
        self.roots.iter().flat_map(move |root| self.walk_root(root))
    }

    fn walk_root<'a>(&'a self, root: &'a Path) -> EntryIter<'a> {
        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                let err = ScanError::NotADirectory(root.to_path_buf());
                return Box::new(std::iter::once(Err(err)));
            }
            Err(e) => return Box::new(std::iter::once(Err(ScanError::from_io(root, e)))),
        }

        log::debug!("Walking root {}", root.display());
        let gitignore = self.build_gitignore(root);
        let skip_hidden = self.config.skip_hidden;

        let entries = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                if skip_hidden && is_hidden(entry) {
                    return false;
                }
                match &gitignore {
                    Some(gi) => {
                        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                        let ignored = gi
                            .matched(relative, entry.file_type().is_dir())
                            .is_ignore();
                        if ignored {
                            log::trace!("Ignoring: {}", entry.path().display());
                        }
                        !ignored
                    }
                    None => true,
                }
            });

        Box::new(
            entries
                .take_while(move |_| {
                    let stop = self.is_shutdown_requested();
                    if stop {
                        log::debug!("Walker: Shutdown requested, stopping iteration");
                    }
                    !stop
                })
                .filter_map(move |entry| match entry {
                    Ok(entry) => self.process_entry(&entry),
                    Err(e) => Some(Err(convert_walk_error(root, e))),
                }),
        )
    }

    /// Turn a walk entry into a [`FileEntry`], or `None` when it is skipped.
    fn process_entry(&self, entry: &DirEntry) -> Option<Result<FileEntry, ScanError>> {
        let file_type = entry.file_type();
        if !file_type.is_file() {
            if !file_type.is_dir() {
                log::trace!("Skipping non-regular file: {}", entry.path().display());
            }
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                let path = entry.path();
                let message = e.to_string();
                let io = e.into_io_error();
                return match io {
                    Some(io) if io.kind() == std::io::ErrorKind::NotFound => {
                        log::debug!("File vanished during walk: {}", path.display());
                        None
                    }
                    Some(io) => Some(Err(ScanError::from_io(path, io))),
                    None => {
                        log::debug!("Skipping {}: {}", path.display(), message);
                        None
                    }
                };
            }
        };

        let size = metadata.len();
        if !self.passes_size_filter(size) {
            log::trace!(
                "Skipping file due to size filter ({}): {}",
                size,
                entry.path().display()
            );
            return None;
        }

        let path = entry.path().to_path_buf();
        match metadata.modified() {
            Ok(modified) => Some(Ok(FileEntry::new(path, size, modified))),
            Err(e) => {
                log::debug!("No modification time for {}: {}", path.display(), e);
                Some(Ok(FileEntry::without_mtime(path, size)))
            }
        }
    }
}

/// Drop every root that repeats another root or lies inside one.
///
/// Roots are compared by canonical path, so `d/sub/../sub` matches `d/sub`.
/// Among equal roots the first listed wins; a nested root always yields to
/// its ancestor. Kept roots keep their original spelling. A root that cannot
/// be resolved or is not a directory is kept as given, so walking it still
/// reports the error.
#[must_use]
pub fn dedup_roots(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    let resolved: Vec<Option<PathBuf>> = roots
        .iter()
        .map(|root| fs::canonicalize(root).ok().filter(|c| c.is_dir()))
        .collect();

    let covered_by = |i: usize, canonical: &Path| {
        resolved.iter().enumerate().find_map(|(j, other)| {
            let other = other.as_deref()?;
            let covers = j != i && canonical.starts_with(other) && (other != canonical || j < i);
            covers.then_some(j)
        })
    };

    roots
        .iter()
        .enumerate()
        .filter(|&(i, root)| match resolved[i].as_deref().and_then(|c| covered_by(i, c)) {
            Some(j) => {
                log::info!(
                    "Skipping root {}: already covered by {}",
                    root.display(),
                    roots[j].display()
                );
                false
            }
            None => true,
        })
        .map(|(_, root)| root.clone())
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn convert_walk_error(root: &Path, error: walkdir::Error) -> ScanError {
    let path = error
        .path()
        .map_or_else(|| root.to_path_buf(), Path::to_path_buf);
    log::warn!("Walker error for {}: {}", path.display(), error);
    match error.into_io_error() {
        Some(io) => ScanError::from_io(&path, io),
        None => ScanError::Io {
            path,
            source: std::io::Error::other("filesystem loop detected"),
        },
    }
}
