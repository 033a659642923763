//! Command-line interface definitions.
//!
//! ```bash
//! # Report exact duplicates under two trees
//! dupescan scan ~/photos /mnt/backup/photos
//!
//! # Group by file name and keep the oldest copy as canonical
//! dupescan scan ~/docs --group-by name --oldest-first
//!
//! # Trash every redundant copy (dry run without --yes)
//! dupescan scan ~/Downloads --delete --yes
//!
//! # Score every pair of files, hiding pairs under 90% similarity
//! dupescan compare ~/drafts -t 90
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Find duplicate and near-duplicate files.
///
/// Files are fingerprinted with xxHash64 and grouped into equivalence classes
/// by content or by name; `compare` scores every pair with a simhash.
#[derive(Debug, Parser)]
#[command(name = "dupescan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors and the report
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Read settings from this TOML file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the merged settings (file, environment and flags) to this TOML file
    #[arg(long, global = true, value_name = "PATH")]
    pub save_config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Group files into equivalence classes and report duplicates
    Scan(ScanArgs),
    /// Score the similarity of every pair of files
    Compare(CompareArgs),
}

/// Options shared by both subcommands.
#[derive(Debug, Args, Clone, Default)]
pub struct CommonArgs {
    /// Directories to scan, walked in the order given
    #[arg(value_name = "PATH")]
    pub roots: Vec<PathBuf>,

    /// Skip unreadable files instead of aborting the scan
    #[arg(long)]
    pub keep_going: bool,

    /// Number of files hashed concurrently
    #[arg(short = 'j', long = "concurrency", value_name = "N")]
    pub concurrency: Option<usize>,

    /// Skip hidden files and directories
    #[arg(long)]
    pub skip_hidden: bool,

    /// Ignore paths matching a gitignore-style pattern (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Minimum file size to consider (e.g., 1KB, 1MiB)
    #[arg(long, value_parser = parse_size, value_name = "SIZE")]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 100MB, 1GiB)
    #[arg(long, value_parser = parse_size, value_name = "SIZE")]
    pub max_size: Option<u64>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Do not show the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args, Clone, Default)]
pub struct ScanArgs {
    /// Shared options
    #[command(flatten)]
    pub common: CommonArgs,

    /// Grouping key: hash (content) or name (basename)
    #[arg(short = 'b', long, value_name = "MODE")]
    pub group_by: Option<String>,

    /// List unique files as well as duplicates
    #[arg(short, long)]
    pub all: bool,

    /// Keep the oldest file of each class as the canonical copy
    #[arg(long)]
    pub oldest_first: bool,

    /// Remove every non-canonical duplicate
    #[arg(long)]
    pub delete: bool,

    /// Delete permanently instead of moving to the trash
    #[arg(long, requires = "delete")]
    pub permanent: bool,

    /// Actually delete; without this `--delete` is a dry run
    #[arg(short, long, requires = "delete")]
    pub yes: bool,
}

/// Arguments for the compare subcommand.
#[derive(Debug, Args, Clone, Default)]
pub struct CompareArgs {
    /// Shared options
    #[command(flatten)]
    pub common: CommonArgs,

    /// Minimum similarity percentage for a pair to count as similar (0 reports everything)
    #[arg(short, long, value_name = "PERCENT")]
    pub threshold: Option<f64>,

    /// Similarity fingerprint width in bits (32 or 64)
    #[arg(long, value_name = "BITS")]
    pub width: Option<u32>,

    /// Also list pairs below the threshold
    #[arg(short, long)]
    pub all: bool,
}

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, line-oriented text
    #[default]
    Text,
    /// A single JSON document
    Json,
}

/// Unit suffixes accepted by [`parse_size`], upper-cased.
const SIZE_UNITS: &[(&str, u64)] = &[
    ("", 1),
    ("B", 1),
    ("K", 1_000),
    ("KB", 1_000),
    ("KIB", 1 << 10),
    ("M", 1_000_000),
    ("MB", 1_000_000),
    ("MIB", 1 << 20),
    ("G", 1_000_000_000),
    ("GB", 1_000_000_000),
    ("GIB", 1 << 30),
    ("T", 1_000_000_000_000),
    ("TB", 1_000_000_000_000),
    ("TIB", 1 << 40),
];

/// Parse a human-readable size such as `1.5MB`, `4KiB` or `100`.
///
/// Decimal suffixes (`KB`, `MB`, ...) are powers of 1000, binary ones
/// (`KiB`, `MiB`, ...) powers of 1024. Suffixes are case-insensitive.
///
/// # Errors
///
/// Returns a message for empty input, a malformed number or an unknown unit.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let unit = unit.trim().to_uppercase();

    let value: f64 = number
        .parse()
        .map_err(|_| format!("Invalid number: '{number}'"))?;
    let multiplier = SIZE_UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|&(_, m)| m)
        .ok_or_else(|| format!("Unknown size suffix: '{unit}'"))?;

    Ok((value * multiplier as f64) as u64)
}
