//! Scan pipeline orchestrator.
//!
//! # Overview
//!
//! [`DuplicateFinder`] wires the stages of a scan together:
//! 1. **Walk** - a single-threaded [`Walker`] emits file entries, numbered in
//!    emission order
//! 2. **Hash** - entries are bridged onto a rayon pool of
//!    `concurrency_limit` threads, each computing a [`Digest`](crate::scanner::Digest)
//! 3. **Aggregate** - completed records travel over one bounded channel to a
//!    single consumer that restores emission order and feeds the
//!    [`Grouper`] (grouping mode) or collects records for pairwise scoring
//!    (compare mode)
//!
//! The consumer also feeds the optional progress queue; it is the only
//! producer on that queue.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_concurrency_limit(4));
//! let report = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
//!
//! println!(
//!     "{} files scanned - found {} duplicates",
//!     report.summary.files_scanned, report.summary.duplicates
//! );
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use crossbeam_channel::{Receiver, Sender};
use rayon::prelude::*;

use super::groups::{total_duplicates, EquivalenceClass, GroupBy, Grouper, GroupingStats};
use crate::progress::ProgressSender;
use crate::scanner::{
    FileEntry, FileRecord, HashError, Hasher, ScanError, SimhashWidth, Walker, WalkerConfig,
    DEFAULT_BUFFER_SIZE,
};
use crate::similarity::{compare_pairs, CompareError, PairComparison, Threshold};

/// Capacity of the record channel between the hashing pool and the consumer.
pub const RECORD_CHANNEL_CAPACITY: usize = 100;

/// Configuration for the duplicate finder.
#[derive(Debug, Clone)]
pub struct FinderConfig {
    /// Number of hashing threads, which also bounds open file handles.
    /// Default is 4 to prevent disk thrashing.
    pub concurrency_limit: usize,
    /// Skip files that fail to hash instead of aborting the scan.
    pub keep_going: bool,
    /// Order each class by modification time, oldest first.
    pub oldest_first: bool,
    /// Grouping key used in grouping mode.
    pub group_by: GroupBy,
    /// Also compute similarity fingerprints of this width.
    pub similarity: Option<SimhashWidth>,
    /// Read buffer size for hashing.
    pub buffer_size: usize,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress queue.
    pub progress: Option<ProgressSender>,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 4,
            keep_going: false,
            oldest_first: false,
            group_by: GroupBy::default(),
            similarity: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of hashing threads (at least one).
    #[must_use]
    pub fn with_concurrency_limit(mut self, threads: usize) -> Self {
        self.concurrency_limit = threads.max(1);
        self
    }

    /// Skip unreadable files instead of aborting.
    #[must_use]
    pub fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    /// Select the canonical member by earliest modification time.
    #[must_use]
    pub fn with_oldest_first(mut self, enabled: bool) -> Self {
        self.oldest_first = enabled;
        self
    }

    /// Set the grouping key.
    #[must_use]
    pub fn with_group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = group_by;
        self
    }

    /// Compute similarity fingerprints of the given width.
    #[must_use]
    pub fn with_similarity(mut self, width: SimhashWidth) -> Self {
        self.similarity = Some(width);
        self
    }

    /// Set the read buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Send a progress notification for every completed record.
    #[must_use]
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Files hashed successfully
    pub files_scanned: usize,
    /// Total size of hashed files in bytes
    pub total_size: u64,
    /// Classes with two or more members (grouping mode)
    pub duplicate_classes: usize,
    /// Σ (len − 1) over duplicate classes, or similar pairs in compare mode
    pub duplicates: usize,
    /// Bytes held by redundant members (grouping mode)
    pub wasted_space: u64,
    /// Files excluded after a hashing error (only with `keep_going`)
    pub skipped_files: usize,
    /// Wall-clock duration of the scan
    pub duration: Duration,
}

impl ScanSummary {
    /// Wasted space as a human-readable string.
    #[must_use]
    pub fn wasted_display(&self) -> String {
        ByteSize::b(self.wasted_space).to_string()
    }
}

/// Result of a grouping-mode scan.
#[derive(Debug)]
pub struct ScanReport {
    /// Every class, unique ones included, in first-seen order
    pub classes: Vec<EquivalenceClass>,
    /// Aggregate counts
    pub summary: ScanSummary,
    /// Files that failed to hash and were skipped
    pub skipped: Vec<HashError>,
}

impl ScanReport {
    /// Only the classes with two or more members.
    pub fn duplicate_classes(&self) -> impl Iterator<Item = &EquivalenceClass> {
        self.classes.iter().filter(|c| c.is_duplicate())
    }
}

/// Result of a compare-mode scan.
#[derive(Debug)]
pub struct CompareReport {
    /// Records in emission order; pair indices point here
    pub records: Vec<FileRecord>,
    /// Every unordered pair of records
    pub pairs: Vec<PairComparison>,
    /// Threshold the pairs were classified with
    pub threshold: Threshold,
    /// Aggregate counts
    pub summary: ScanSummary,
    /// Files that failed to hash and were skipped
    pub skipped: Vec<HashError>,
}

/// Errors that can occur during a scan.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// No root paths were given.
    #[error("No paths to scan")]
    NoRoots,

    /// The walk failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A file could not be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// Pairwise scoring failed.
    #[error(transparent)]
    Compare(#[from] CompareError),

    /// The hashing pool could not be started.
    #[error("Failed to start hashing pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The aggregation stage terminated abnormally.
    #[error("Aggregation stage panicked")]
    AggregatorPanicked,
}

/// Outcome of hashing one entry, tagged with its emission sequence number.
enum Slot {
    Record(FileRecord),
    Skipped(HashError),
}

#[derive(Debug, Default)]
struct PipelineStats {
    files_scanned: usize,
    total_size: u64,
    skipped: Vec<HashError>,
}

/// Scan pipeline for both grouping and compare mode.
#[derive(Debug, Clone)]
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    /// Create a new finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut hasher = Hasher::new().with_buffer_size(config.buffer_size);
        if let Some(width) = config.similarity {
            hasher = hasher.with_similarity(width);
        }
        Self { config, hasher }
    }

    /// Create a new finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Scan `roots` and group every file into equivalence classes.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if a root cannot be walked, a file cannot be
    /// hashed (unless `keep_going` is set), or the scan is interrupted. No
    /// partial report is produced on error.
    pub fn find_duplicates(&self, roots: &[PathBuf]) -> Result<ScanReport, FinderError> {
        let start = Instant::now();
        let mut grouper =
            Grouper::new(self.config.group_by).with_oldest_first(self.config.oldest_first);

        log::info!(
            "Scanning {} root(s), grouping by {}",
            roots.len(),
            self.config.group_by
        );
        let stats = self.run_pipeline(roots, &mut |record| {
            grouper.insert(record);
        })?;

        let classes = grouper.finish();
        let grouping = GroupingStats::from_classes(&classes);
        let summary = ScanSummary {
            files_scanned: stats.files_scanned,
            total_size: stats.total_size,
            duplicate_classes: grouping.duplicate_classes,
            duplicates: total_duplicates(&classes),
            wasted_space: grouping.wasted_space,
            skipped_files: stats.skipped.len(),
            duration: start.elapsed(),
        };

        log::info!(
            "Scan complete: {} files, {} duplicate classes, {} duplicates, {} reclaimable",
            summary.files_scanned,
            summary.duplicate_classes,
            summary.duplicates,
            summary.wasted_display()
        );

        Ok(ScanReport {
            classes,
            summary,
            skipped: stats.skipped,
        })
    }

    /// Scan `roots` and score every unordered pair of files.
    ///
    /// Similarity fingerprints are computed at the configured width, or 64
    /// bits when none was set.
    ///
    /// # Errors
    ///
    /// Same as [`find_duplicates`](Self::find_duplicates), plus
    /// [`FinderError::Compare`] when scoring fails.
    pub fn compare(
        &self,
        roots: &[PathBuf],
        threshold: Threshold,
    ) -> Result<CompareReport, FinderError> {
        let start = Instant::now();
        let finder = if self.hasher.similarity_width().is_some() {
            self.clone()
        } else {
            Self::new(self.config.clone().with_similarity(SimhashWidth::default()))
        };

        log::info!(
            "Comparing files under {} root(s) at threshold {}",
            roots.len(),
            threshold
        );
        let mut records = Vec::new();
        let stats = finder.run_pipeline(roots, &mut |record| records.push(record))?;

        let pairs = compare_pairs(&records, threshold)?;
        let similar = pairs.iter().filter(|p| p.is_similar()).count();
        let summary = ScanSummary {
            files_scanned: stats.files_scanned,
            total_size: stats.total_size,
            duplicates: similar,
            skipped_files: stats.skipped.len(),
            duration: start.elapsed(),
            ..ScanSummary::default()
        };

        log::info!(
            "Compare complete: {} files, {} pairs, {} similar",
            summary.files_scanned,
            pairs.len(),
            similar
        );

        Ok(CompareReport {
            records,
            pairs,
            threshold,
            summary,
            skipped: stats.skipped,
        })
    }

    /// Walk, hash and deliver every record to `sink` in emission order.
    fn run_pipeline<F>(&self, roots: &[PathBuf], sink: &mut F) -> Result<PipelineStats, FinderError>
    where
        F: FnMut(FileRecord) + Send,
    {
        if roots.is_empty() {
            return Err(FinderError::NoRoots);
        }
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let mut walker = Walker::new(roots.to_vec(), self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        if walker.roots().len() < roots.len() {
            log::info!(
                "Walking {} of {} root(s) after removing overlaps",
                walker.roots().len(),
                roots.len()
            );
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency_limit.max(1))
            .thread_name(|i| format!("dupescan-hash-{i}"))
            .build()?;

        let (tx, rx) = crossbeam_channel::bounded::<(usize, Slot)>(RECORD_CHANNEL_CAPACITY);
        let progress = self.config.progress.clone();

        let (hashed, stats) = std::thread::scope(|scope| {
            let aggregator = scope.spawn(move || aggregate(&rx, progress.as_ref(), sink));

            let hashed = pool.install(|| {
                walker
                    .walk()
                    .enumerate()
                    .par_bridge()
                    .try_for_each_with(tx, |tx, (seq, entry)| self.hash_entry(tx, seq, entry))
            });

            (hashed, aggregator.join())
        });

        let stats = stats.map_err(|_| FinderError::AggregatorPanicked)?;
        hashed?;
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }
        Ok(stats)
    }

    fn hash_entry(
        &self,
        tx: &mut Sender<(usize, Slot)>,
        seq: usize,
        entry: Result<FileEntry, ScanError>,
    ) -> Result<(), FinderError> {
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }
        let entry = entry?;

        let slot = match self.hasher.digest(&entry.path) {
            Ok(digest) => Slot::Record(FileRecord::new(entry, digest)),
            Err(e) if self.config.keep_going => {
                log::warn!("Skipping {}: {}", e.path().display(), e);
                Slot::Skipped(e)
            }
            Err(e) => return Err(e.into()),
        };

        // The consumer only hangs up after every sender is dropped.
        tx.send((seq, slot))
            .map_err(|_| FinderError::AggregatorPanicked)
    }
}

/// Single consumer: release slots strictly in sequence order.
fn aggregate<F>(
    rx: &Receiver<(usize, Slot)>,
    progress: Option<&ProgressSender>,
    sink: &mut F,
) -> PipelineStats
where
    F: FnMut(FileRecord),
{
    let mut pending: BTreeMap<usize, Slot> = BTreeMap::new();
    let mut next = 0usize;
    let mut stats = PipelineStats::default();

    for (seq, slot) in rx {
        pending.insert(seq, slot);
        while let Some(slot) = pending.remove(&next) {
            next += 1;
            match slot {
                Slot::Record(record) => {
                    stats.files_scanned += 1;
                    stats.total_size += record.size;
                    if let Some(progress) = progress {
                        progress.notify(record.size);
                    }
                    sink(record);
                }
                Slot::Skipped(error) => stats.skipped.push(error),
            }
        }
    }

    if !pending.is_empty() {
        log::debug!("Discarding {} out-of-order records after abort", pending.len());
    }
    stats
}
