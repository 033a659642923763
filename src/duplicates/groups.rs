//! Grouping engine: equivalence classes over hashed file records.
//!
//! # Overview
//!
//! Records stream into a [`Grouper`], which buckets them by a grouping key
//! selected once from [`GroupBy`]: the exact fingerprint, or the file name.
//! Two records with equal keys are in the same class no matter what else
//! differs. A class with a single member is unique; every member of a class
//! with two or more is a duplicate.
//!
//! # Example
//!
//! ```
//! use dupescan::duplicates::{total_duplicates, GroupBy, Grouper};
//! use dupescan::scanner::{Digest, FileEntry, FileRecord};
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let record = |path: &str, exact: u64| {
//!     let entry = FileEntry::new(PathBuf::from(path), 5, SystemTime::UNIX_EPOCH);
//!     FileRecord::new(entry, Digest { exact, similarity: None })
//! };
//!
//! let mut grouper = Grouper::new(GroupBy::Hash);
//! grouper.insert(record("/A.txt", 1));
//! grouper.insert(record("/B.txt", 1));
//! grouper.insert(record("/C.txt", 2));
//!
//! let classes = grouper.finish();
//! assert_eq!(classes.len(), 2);
//! assert_eq!(total_duplicates(&classes), 1);
//! ```

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::scanner::{fingerprint_to_hex, FileRecord};

/// Grouping modes accepted by [`GroupBy::from_str`].
pub const GROUP_BY_NAMES: &[&str] = &["hash", "name"];

/// Which projection of a record defines its equivalence class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// Group by exact content fingerprint.
    #[default]
    Hash,
    /// Group by file name (basename only).
    Name,
}

/// Error returned for an unknown grouping mode.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported grouping value '{value}'{}", suggestion_suffix(.suggestion))]
pub struct UnknownGroupBy {
    /// The rejected value
    pub value: String,
    /// Closest supported value, if any is reasonably close
    pub suggestion: Option<&'static str>,
}

fn suggestion_suffix(suggestion: &Option<&'static str>) -> String {
    suggestion
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

impl FromStr for GroupBy {
    type Err = UnknownGroupBy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "hash" => Ok(Self::Hash),
            "name" => Ok(Self::Name),
            other => {
                let suggestion = GROUP_BY_NAMES
                    .iter()
                    .copied()
                    .map(|name| (name, strsim::jaro_winkler(other, name)))
                    .filter(|(_, score)| *score > 0.7)
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(name, _)| name);
                Err(UnknownGroupBy {
                    value: s.to_string(),
                    suggestion,
                })
            }
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash => write!(f, "hash"),
            Self::Name => write!(f, "name"),
        }
    }
}

/// Pure projection from a record to its grouping key.
pub type KeyFn = fn(&FileRecord) -> GroupKey;

impl GroupBy {
    /// Resolve the mode into its key projection.
    #[must_use]
    pub fn key_fn(self) -> KeyFn {
        match self {
            Self::Hash => key_by_fingerprint,
            Self::Name => key_by_name,
        }
    }
}

/// Grouping key of an equivalence class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Exact content fingerprint
    Fingerprint(u64),
    /// File name, NFC-normalized when it is valid UTF-8
    Name(OsString),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fingerprint(fp) => f.write_str(&fingerprint_to_hex(*fp)),
            Self::Name(name) => write!(f, "{}", name.to_string_lossy()),
        }
    }
}

fn key_by_fingerprint(record: &FileRecord) -> GroupKey {
    GroupKey::Fingerprint(record.fingerprint)
}

fn key_by_name(record: &FileRecord) -> GroupKey {
    let name = record
        .path
        .file_name()
        .map_or_else(|| record.path.as_os_str().to_os_string(), |n| n.to_os_string());
    match name.to_str() {
        Some(utf8) => GroupKey::Name(OsString::from(utf8.nfc().collect::<String>())),
        None => GroupKey::Name(name),
    }
}

/// Classification of a record within its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Sole member of its class
    Unique,
    /// One of two or more members
    Duplicate,
}

/// A finished equivalence class.
///
/// Members are in scanner emission order, or by modification time (oldest
/// first) when the grouper was asked to order them. The first member is the
/// canonical one.
#[derive(Debug, Clone)]
pub struct EquivalenceClass {
    /// Key shared by every member
    pub key: GroupKey,
    /// Members, canonical first
    pub members: Vec<FileRecord>,
}

impl EquivalenceClass {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this class has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True when the class holds two or more members.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.members.len() > 1
    }

    /// Status shared by every member of this class.
    #[must_use]
    pub fn status(&self) -> Status {
        if self.is_duplicate() {
            Status::Duplicate
        } else {
            Status::Unique
        }
    }

    /// Number of redundant copies (members minus the canonical one).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// The member kept as the original.
    #[must_use]
    pub fn canonical(&self) -> Option<&FileRecord> {
        self.members.first()
    }

    /// Every member except the canonical one.
    #[must_use]
    pub fn redundant(&self) -> &[FileRecord] {
        self.members.get(1..).unwrap_or(&[])
    }

    /// Total size of all members in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.members.iter().map(|r| r.size).sum()
    }

    /// Bytes held by the redundant members.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.redundant().iter().map(|r| r.size).sum()
    }
}

/// Total duplicates across classes: Σ (len − 1) over classes with 2+ members.
#[must_use]
pub fn total_duplicates(classes: &[EquivalenceClass]) -> usize {
    classes.iter().map(EquivalenceClass::duplicate_count).sum()
}

/// Aggregate figures over a set of classes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupingStats {
    /// Number of records grouped
    pub total_files: usize,
    /// Total size of all records in bytes
    pub total_size: u64,
    /// Number of equivalence classes
    pub classes: usize,
    /// Number of classes with 2+ members
    pub duplicate_classes: usize,
    /// Σ (len − 1) over duplicate classes
    pub duplicate_files: usize,
    /// Bytes held by redundant members
    pub wasted_space: u64,
}

impl GroupingStats {
    /// Compute statistics for `classes`.
    #[must_use]
    pub fn from_classes(classes: &[EquivalenceClass]) -> Self {
        let mut stats = Self {
            classes: classes.len(),
            ..Self::default()
        };
        for class in classes {
            stats.total_files += class.len();
            stats.total_size += class.total_size();
            if class.is_duplicate() {
                stats.duplicate_classes += 1;
                stats.duplicate_files += class.duplicate_count();
                stats.wasted_space += class.wasted_space();
            }
        }
        stats
    }
}

#[derive(Debug)]
struct Slot {
    first_seen: usize,
    members: Vec<FileRecord>,
}

/// Streaming aggregation of records into equivalence classes.
///
/// A `Grouper` is built fresh for each scan and owned by the single
/// aggregation stage; it is never shared.
#[derive(Debug)]
pub struct Grouper {
    group_by: GroupBy,
    key_of: KeyFn,
    oldest_first: bool,
    slots: HashMap<GroupKey, Slot>,
    total_records: usize,
}

impl Grouper {
    /// Create an empty grouper for the given mode.
    #[must_use]
    pub fn new(group_by: GroupBy) -> Self {
        Self {
            group_by,
            key_of: group_by.key_fn(),
            oldest_first: false,
            slots: HashMap::new(),
            total_records: 0,
        }
    }

    /// Order each class by modification time, oldest first, when finishing.
    #[must_use]
    pub fn with_oldest_first(mut self, enabled: bool) -> Self {
        self.oldest_first = enabled;
        self
    }

    /// Grouping mode in use.
    #[must_use]
    pub fn group_by(&self) -> GroupBy {
        self.group_by
    }

    /// Number of records inserted so far.
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.total_records
    }

    /// Add a record and return its occurrence count.
    ///
    /// The count is the number of records observed with the same key,
    /// this one included, and is written into the record.
    pub fn insert(&mut self, mut record: FileRecord) -> u64 {
        let key = (self.key_of)(&record);
        let first_seen = self.total_records;
        let slot = self.slots.entry(key).or_insert_with(|| Slot {
            first_seen,
            members: Vec::new(),
        });

        let occurrence = slot.members.len() as u64 + 1;
        record.occurrence = occurrence;
        if occurrence > 1 {
            log::trace!(
                "Duplicate #{} for {}: {}",
                occurrence,
                record.fingerprint_hex(),
                record.path.display()
            );
        }
        slot.members.push(record);
        self.total_records += 1;
        occurrence
    }

    /// Close the grouper and return its classes.
    ///
    /// Classes are ordered by the position of their first record in the
    /// input stream.
    #[must_use]
    pub fn finish(self) -> Vec<EquivalenceClass> {
        let oldest_first = self.oldest_first;
        let mut slots: Vec<(GroupKey, Slot)> = self.slots.into_iter().collect();
        slots.sort_by_key(|(_, slot)| slot.first_seen);

        slots
            .into_iter()
            .map(|(key, mut slot)| {
                if oldest_first {
                    // Undated files never become canonical over a dated one.
                    slot.members.sort_by_key(|r| (r.modified.is_none(), r.modified));
                }
                EquivalenceClass {
                    key,
                    members: slot.members,
                }
            })
            .collect()
    }
}
