//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Grouping hashed records into equivalence classes
//! - Orchestrating the walk, hash and aggregate pipeline

pub mod finder;
pub mod groups;

pub use finder::{
    CompareReport, DuplicateFinder, FinderConfig, FinderError, ScanReport, ScanSummary,
};
pub use groups::{
    total_duplicates, EquivalenceClass, GroupBy, GroupKey, Grouper, GroupingStats, KeyFn, Status,
    UnknownGroupBy,
};
