//! Line-oriented terminal report.
//!
//! Grouping mode prints one line per file:
//!
//! ```text
//! [ KO ] 26c7827d889f6da3        5 B * /data/A.txt
//! [ KO ] 26c7827d889f6da3        5 B   /data/B.txt
//! [ OK ] 3d8e2f5c2c1d7b90        5 B   /data/C.txt
//! 3 files scanned - found 1 duplicates
//! ```
//!
//! `[ KO ]` marks a duplicate and `*` the canonical member of its class.
//! Unique files (`[ OK ]`) are listed only with `show_all`. Compare mode
//! prints one line per pair, `[ ~~ ]` for similar and `[ -- ]` for
//! dissimilar.

use std::io::{self, Write};
use std::path::Path;

use bytesize::ByteSize;
use yansi::Paint;

use crate::actions::{BatchDeleteResult, DeletePlan};
use crate::duplicates::{CompareReport, ScanReport, ScanSummary, Status};
use crate::scanner::FileRecord;
use crate::similarity::{Classification, PairComparison};

/// Tag of a unique file.
pub const UNIQUE_TAG: &str = "[ OK ]";
/// Tag of a duplicate file.
pub const DUPLICATE_TAG: &str = "[ KO ]";
/// Tag of a pair at or above the threshold.
pub const SIMILAR_TAG: &str = "[ ~~ ]";
/// Tag of a pair below the threshold.
pub const DISSIMILAR_TAG: &str = "[ -- ]";

/// Trailing summary of a grouping scan.
#[must_use]
pub fn summary_line(summary: &ScanSummary) -> String {
    format!(
        "{} files scanned - found {} duplicates",
        summary.files_scanned, summary.duplicates
    )
}

/// Trailing summary of a compare scan.
#[must_use]
pub fn compare_summary_line(summary: &ScanSummary) -> String {
    format!(
        "{} files scanned - found {} similar pairs",
        summary.files_scanned, summary.duplicates
    )
}

/// Text renderer.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput {
    color: bool,
    show_all: bool,
}

impl TextOutput {
    /// Create a renderer. `show_all` also lists unique files and
    /// dissimilar pairs.
    #[must_use]
    pub fn new(color: bool, show_all: bool) -> Self {
        Self { color, show_all }
    }

    fn tag(&self, text: &'static str, status: Status) -> String {
        if !self.color {
            return text.to_string();
        }
        match status {
            Status::Unique => text.green().bold().to_string(),
            Status::Duplicate => text.red().bold().to_string(),
        }
    }

    fn pair_tag(&self, classification: Classification) -> String {
        let text = match classification {
            Classification::Similar => SIMILAR_TAG,
            Classification::Dissimilar => DISSIMILAR_TAG,
        };
        if !self.color {
            return text.to_string();
        }
        match classification {
            Classification::Similar => text.yellow().bold().to_string(),
            Classification::Dissimilar => text.dim().to_string(),
        }
    }

    /// One report line for a record.
    #[must_use]
    pub fn record_line(&self, record: &FileRecord, status: Status, canonical: bool) -> String {
        let tag = match status {
            Status::Unique => self.tag(UNIQUE_TAG, status),
            Status::Duplicate => self.tag(DUPLICATE_TAG, status),
        };
        format!(
            "{} {} {:>10} {} {}",
            tag,
            record.fingerprint_hex(),
            ByteSize::b(record.size).to_string(),
            if canonical { '*' } else { ' ' },
            record.path.display()
        )
    }

    /// One report line for a scored pair.
    #[must_use]
    pub fn pair_line(&self, pair: &PairComparison, left: &FileRecord, right: &FileRecord) -> String {
        let hex = |r: &FileRecord| r.similarity.map(|s| s.to_hex()).unwrap_or_default();
        format!(
            "{} {:>6.2}% {} {} {} <-> {}",
            self.pair_tag(pair.classification),
            pair.percent(),
            hex(left),
            hex(right),
            left.path.display(),
            right.path.display()
        )
    }

    /// Write a grouping report.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_scan<W: Write>(&self, out: &mut W, report: &ScanReport) -> io::Result<()> {
        for class in &report.classes {
            let status = class.status();
            if status == Status::Unique && !self.show_all {
                continue;
            }
            for (i, record) in class.members.iter().enumerate() {
                let canonical = status == Status::Duplicate && i == 0;
                writeln!(out, "{}", self.record_line(record, status, canonical))?;
            }
        }
        self.write_skipped(out, report.skipped.iter().map(|e| (e.path(), e.to_string())))?;
        writeln!(out, "{}", summary_line(&report.summary))
    }

    /// Write a compare report.
    ///
    /// Dissimilar pairs are hidden when the threshold filters and
    /// `show_all` is off.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_compare<W: Write>(&self, out: &mut W, report: &CompareReport) -> io::Result<()> {
        let show_everything = self.show_all || !report.threshold.is_filtering();
        for pair in &report.pairs {
            if !pair.is_similar() && !show_everything {
                continue;
            }
            let (left, right) = (&report.records[pair.left], &report.records[pair.right]);
            writeln!(out, "{}", self.pair_line(pair, left, right))?;
        }
        self.write_skipped(out, report.skipped.iter().map(|e| (e.path(), e.to_string())))?;
        writeln!(out, "{}", compare_summary_line(&report.summary))
    }

    fn write_skipped<'a, W: Write>(
        &self,
        out: &mut W,
        skipped: impl Iterator<Item = (&'a Path, String)>,
    ) -> io::Result<()> {
        for (path, reason) in skipped {
            let line = format!("skipped {}: {}", path.display(), reason);
            if self.color {
                writeln!(out, "{}", line.dim())?;
            } else {
                writeln!(out, "{line}")?;
            }
        }
        Ok(())
    }

    /// List what `--delete` would remove without `--yes`.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_dry_run<W: Write>(&self, out: &mut W, plan: &DeletePlan) -> io::Result<()> {
        for target in &plan.targets {
            writeln!(
                out,
                "would delete {} (keeping {})",
                target.path.display(),
                target.keep.display()
            )?;
        }
        writeln!(
            out,
            "Dry run: {} file(s), {} would be freed. Re-run with --yes to delete.",
            plan.len(),
            ByteSize::b(plan.total_bytes())
        )
    }

    /// Report the outcome of a deletion batch.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_deletions<W: Write>(&self, out: &mut W, result: &BatchDeleteResult) -> io::Result<()> {
        for (path, error) in &result.failures {
            writeln!(out, "failed to delete {}: {}", path.display(), error)?;
        }
        writeln!(out, "{}", result.summary())
    }
}
