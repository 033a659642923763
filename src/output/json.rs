//! JSON output formatter for scan and compare results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2026-10-18T09:12:44Z",
//!   "classes": [
//!     {
//!       "key": "26c7827d889f6da3",
//!       "status": "duplicate",
//!       "files": [
//!         {
//!           "path": "/data/A.txt",
//!           "size": 5,
//!           "modified": "2026-10-01T08:00:00Z",
//!           "fingerprint": "26c7827d889f6da3",
//!           "occurrence": 1,
//!           "canonical": true
//!         }
//!       ]
//!     }
//!   ],
//!   "summary": {
//!     "files_scanned": 3,
//!     "duplicates": 1,
//!     "exit_code": 0,
//!     "exit_code_name": "DS000"
//!   }
//! }
//! ```
//!
//! Compare reports carry `pairs` instead of `classes`. Each pair names both
//! files with their sizes and simhash fingerprints, the percentage and the
//! classification.

use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::duplicates::{CompareReport, EquivalenceClass, ScanReport, ScanSummary, Status};
use crate::error::ExitCode;
use crate::scanner::{FileRecord, HashError};
use crate::similarity::{Classification, PairComparison};

/// One file in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Path as given by the walk
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, null when unknown
    pub modified: Option<DateTime<Utc>>,
    /// xxHash64 content fingerprint, 16 hex digits
    pub fingerprint: String,
    /// Similarity fingerprint, present in compare mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<String>,
    /// 1-based position inside the equivalence class
    pub occurrence: u64,
    /// Whether this is the copy kept on deletion
    pub canonical: bool,
}

impl JsonFile {
    fn from_record(record: &FileRecord, canonical: bool) -> Self {
        Self {
            path: path_string(&record.path),
            size: record.size,
            modified: record.modified.map(to_utc),
            fingerprint: record.fingerprint_hex(),
            similarity: record.similarity.map(|s| s.to_hex()),
            occurrence: record.occurrence,
            canonical,
        }
    }
}

/// One equivalence class in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonClass {
    /// Grouping key, a fingerprint or a file name
    pub key: String,
    /// Unique or duplicate
    pub status: Status,
    /// Members in canonical order
    pub files: Vec<JsonFile>,
}

impl JsonClass {
    /// Convert an equivalence class.
    #[must_use]
    pub fn from_class(class: &EquivalenceClass) -> Self {
        let duplicate = class.is_duplicate();
        Self {
            key: class.key.to_string(),
            status: class.status(),
            files: class
                .members
                .iter()
                .enumerate()
                .map(|(i, r)| JsonFile::from_record(r, duplicate && i == 0))
                .collect(),
        }
    }
}

/// One scored pair in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonPair {
    /// First file
    pub left: String,
    /// Second file
    pub right: String,
    /// Size of the first file in bytes
    pub left_size: u64,
    /// Size of the second file in bytes
    pub right_size: u64,
    /// Similarity fingerprint of the first file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_fingerprint: Option<String>,
    /// Similarity fingerprint of the second file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_fingerprint: Option<String>,
    /// Similarity percentage
    pub percent: f64,
    /// Similar or dissimilar against the threshold
    pub classification: Classification,
}

impl JsonPair {
    fn from_pair(pair: &PairComparison, records: &[FileRecord]) -> Self {
        let (left, right) = (&records[pair.left], &records[pair.right]);
        Self {
            left: path_string(&left.path),
            right: path_string(&right.path),
            left_size: left.size,
            right_size: right.size,
            left_fingerprint: left.similarity.map(|s| s.to_hex()),
            right_fingerprint: right.similarity.map(|s| s.to_hex()),
            percent: pair.percent(),
            classification: pair.classification,
        }
    }
}

/// A file skipped under `keep_going`.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSkipped {
    /// Path that could not be read
    pub path: String,
    /// Why it was skipped
    pub reason: String,
}

impl From<&HashError> for JsonSkipped {
    fn from(error: &HashError) -> Self {
        Self {
            path: path_string(error.path()),
            reason: error.to_string(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Number of files fingerprinted
    pub files_scanned: usize,
    /// Total bytes of all fingerprinted files
    pub total_size: u64,
    /// Classes with more than one member
    pub duplicate_classes: usize,
    /// Duplicate files, or similar pairs in compare mode
    pub duplicates: usize,
    /// Bytes held by non-canonical duplicates
    pub wasted_space: u64,
    /// Files skipped because they could not be read
    pub skipped_files: usize,
    /// Wall-clock scan time in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DS000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a [`ScanSummary`] and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            files_scanned: summary.files_scanned,
            total_size: summary.total_size,
            duplicate_classes: summary.duplicate_classes,
            duplicates: summary.duplicates,
            wasted_space: summary.wasted_space,
            skipped_files: summary.skipped_files,
            scan_duration_ms: summary.duration.as_millis() as u64,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    /// Equivalence classes, grouping mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<JsonClass>>,
    /// Scored pairs, compare mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairs: Option<Vec<JsonPair>>,
    /// Threshold used to classify pairs, compare mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Unreadable files skipped during the scan
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<JsonSkipped>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the document for a grouping scan.
    ///
    /// Unique classes are included only when `show_all` is set.
    #[must_use]
    pub fn from_scan(report: &ScanReport, show_all: bool, exit_code: ExitCode) -> Self {
        Self {
            generated_at: Utc::now(),
            classes: Some(
                report
                    .classes
                    .iter()
                    .filter(|c| show_all || c.is_duplicate())
                    .map(JsonClass::from_class)
                    .collect(),
            ),
            pairs: None,
            threshold: None,
            skipped: report.skipped.iter().map(JsonSkipped::from).collect(),
            summary: JsonSummary::from_scan_summary(&report.summary, exit_code),
        }
    }

    /// Build the document for a compare scan.
    ///
    /// Dissimilar pairs are dropped when the threshold filters, unless
    /// `show_all` is set.
    #[must_use]
    pub fn from_compare(report: &CompareReport, show_all: bool, exit_code: ExitCode) -> Self {
        let keep_all = show_all || !report.threshold.is_filtering();
        Self {
            generated_at: Utc::now(),
            classes: None,
            pairs: Some(
                report
                    .pairs
                    .iter()
                    .filter(|p| keep_all || p.is_similar())
                    .map(|p| JsonPair::from_pair(p, &report.records))
                    .collect(),
            ),
            threshold: Some(report.threshold.percent()),
            skipped: report.skipped.iter().map(JsonSkipped::from).collect(),
            summary: JsonSummary::from_scan_summary(&report.summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
