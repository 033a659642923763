//! Layered application configuration.
//!
//! Settings are merged with `figment`, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: `--config PATH`, or `config.toml` in the platform config
//!    directory when present
//! 3. `DUPESCAN_*` environment variables (e.g. `DUPESCAN_CONCURRENCY_LIMIT=8`)
//! 4. Command-line flags
//!
//! The merged [`Config`] is loosely typed. [`Config::resolve`] validates it
//! into [`ScanSettings`] before anything is scanned.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::{CommonArgs, CompareArgs, ScanArgs};
use crate::duplicates::{FinderConfig, GroupBy, UnknownGroupBy};
use crate::scanner::{SimhashWidth, WalkerConfig};
use crate::similarity::{CompareError, Threshold};

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "DUPESCAN_";

/// Errors detected before scanning starts.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Unknown grouping mode.
    #[error(transparent)]
    UnsupportedGrouping(#[from] UnknownGroupBy),

    /// Threshold is not a percentage.
    #[error("invalid threshold: {0}")]
    InvalidThreshold(#[source] CompareError),

    /// Fingerprint width other than 32 or 64.
    #[error("{0}")]
    UnsupportedWidth(String),

    /// Zero hashing threads requested.
    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,

    /// Deleting members of a class that only shares a file name.
    #[error("deleting duplicates requires grouping by hash")]
    DeleteByName,

    /// No root paths from any layer.
    #[error("no paths to scan")]
    NoRoots,

    /// `min_size` above `max_size`.
    #[error("min_size ({min}) is greater than max_size ({max})")]
    InvalidSizeRange {
        /// Lower bound
        min: u64,
        /// Upper bound
        max: u64,
    },

    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    /// A layer could not be parsed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// The config file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The config could not be rendered as TOML.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration as merged from every layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories to scan
    pub roots: Vec<PathBuf>,
    /// Grouping mode name: `hash` or `name`
    pub group_by: String,
    /// Similarity threshold in percent; 0 disables filtering
    pub threshold: f64,
    /// Remove non-canonical duplicates
    pub delete_duplicates: bool,
    /// Delete permanently instead of using the trash
    pub permanent_delete: bool,
    /// Report unique files / dissimilar pairs too
    pub show_all: bool,
    /// Number of hashing threads
    pub concurrency_limit: usize,
    /// Canonical member is the oldest one
    pub oldest_first: bool,
    /// Skip unreadable files instead of aborting
    pub keep_going: bool,
    /// Similarity fingerprint width in bits
    pub similarity_width: u32,
    /// Skip hidden files and directories
    pub skip_hidden: bool,
    /// Gitignore-style patterns to skip
    pub ignore_patterns: Vec<String>,
    /// Minimum file size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    /// Maximum file size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    /// Show the progress spinner
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            group_by: GroupBy::default().to_string(),
            threshold: 0.0,
            delete_duplicates: false,
            permanent_delete: false,
            show_all: false,
            concurrency_limit: 4,
            oldest_first: false,
            keep_going: false,
            similarity_width: SimhashWidth::default().bits(),
            skip_hidden: false,
            ignore_patterns: Vec::new(),
            min_size: None,
            max_size: None,
            progress: true,
        }
    }
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Directories to scan
    pub roots: Vec<PathBuf>,
    /// Grouping key
    pub group_by: GroupBy,
    /// Similarity threshold
    pub threshold: Threshold,
    /// Remove non-canonical duplicates
    pub delete_duplicates: bool,
    /// Delete permanently instead of using the trash
    pub permanent_delete: bool,
    /// Report unique files / dissimilar pairs too
    pub show_all: bool,
    /// Number of hashing threads, at least 1
    pub concurrency_limit: usize,
    /// Canonical member is the oldest one
    pub oldest_first: bool,
    /// Skip unreadable files instead of aborting
    pub keep_going: bool,
    /// Similarity fingerprint width
    pub similarity_width: SimhashWidth,
    /// Walk filters
    pub walker: WalkerConfig,
    /// Show the progress spinner
    pub progress: bool,
}

impl ScanSettings {
    /// Finder configuration for these settings, without shutdown flag or
    /// progress queue.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_concurrency_limit(self.concurrency_limit)
            .with_keep_going(self.keep_going)
            .with_oldest_first(self.oldest_first)
            .with_group_by(self.group_by)
            .with_walker_config(self.walker.clone())
    }
}

impl Config {
    /// Default TOML location in the platform config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dupescan").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Build the figment for the default, file and environment layers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] when `config_file` is given but
    /// does not exist. A missing default file is skipped.
    pub fn figment(config_file: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match config_file {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                if let Some(path) = Self::default_path() {
                    log::debug!("Looking for config at {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load defaults, the TOML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a layer is missing or malformed.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::figment(config_file)?
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Write this configuration as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_common(&mut self, args: &CommonArgs) {
        if !args.roots.is_empty() {
            self.roots.clone_from(&args.roots);
        }
        if let Some(n) = args.concurrency {
            self.concurrency_limit = n;
        }
        if !args.ignore_patterns.is_empty() {
            self.ignore_patterns.extend(args.ignore_patterns.iter().cloned());
        }
        if args.min_size.is_some() {
            self.min_size = args.min_size;
        }
        if args.max_size.is_some() {
            self.max_size = args.max_size;
        }
        self.keep_going |= args.keep_going;
        self.skip_hidden |= args.skip_hidden;
        if args.no_progress {
            self.progress = false;
        }
    }

    /// Overlay `scan` flags.
    #[must_use]
    pub fn with_scan_args(mut self, args: &ScanArgs) -> Self {
        self.apply_common(&args.common);
        if let Some(ref mode) = args.group_by {
            self.group_by.clone_from(mode);
        }
        self.show_all |= args.all;
        self.oldest_first |= args.oldest_first;
        self.delete_duplicates |= args.delete;
        self.permanent_delete |= args.permanent;
        self
    }

    /// Overlay `compare` flags.
    #[must_use]
    pub fn with_compare_args(mut self, args: &CompareArgs) -> Self {
        self.apply_common(&args.common);
        if let Some(t) = args.threshold {
            self.threshold = t;
        }
        if let Some(w) = args.width {
            self.similarity_width = w;
        }
        self.show_all |= args.all;
        self
    }

    /// Validate into typed settings.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value as a [`ConfigError`].
    pub fn resolve(&self) -> Result<ScanSettings, ConfigError> {
        let group_by: GroupBy = self.group_by.parse()?;
        let threshold = Threshold::new(self.threshold).map_err(ConfigError::InvalidThreshold)?;
        let similarity_width =
            SimhashWidth::try_from(self.similarity_width).map_err(ConfigError::UnsupportedWidth)?;

        if self.concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.delete_duplicates && group_by == GroupBy::Name {
            return Err(ConfigError::DeleteByName);
        }
        if self.roots.is_empty() {
            return Err(ConfigError::NoRoots);
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                return Err(ConfigError::InvalidSizeRange { min, max });
            }
        }

        Ok(ScanSettings {
            roots: self.roots.clone(),
            group_by,
            threshold,
            delete_duplicates: self.delete_duplicates,
            permanent_delete: self.permanent_delete,
            show_all: self.show_all,
            concurrency_limit: self.concurrency_limit,
            oldest_first: self.oldest_first,
            keep_going: self.keep_going,
            similarity_width,
            walker: WalkerConfig::new(
                self.skip_hidden,
                self.min_size,
                self.max_size,
                self.ignore_patterns.clone(),
            ),
            progress: self.progress,
        })
    }
}
