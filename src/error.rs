//! Structured error handling and exit codes.

use serde::Serialize;

use crate::config::ConfigError;
use crate::duplicates::FinderError;

/// Exit codes for the dupescan application.
///
/// - 0: Success (completed normally, with or without duplicates)
/// - 1: General error (unreadable root, file read failure, ...)
/// - 2: Configuration error (rejected before any scanning)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: Scan completed.
    Success = 0,
    /// General error: The scan failed.
    GeneralError = 1,
    /// Configuration error: Invalid settings, nothing was scanned.
    ConfigError = 2,
    /// Interrupted: Scan was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DS000",
            Self::GeneralError => "DS001",
            Self::ConfigError => "DS002",
            Self::Interrupted => "DS130",
        }
    }

    /// Pick the exit code for an application error.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        if err.downcast_ref::<ConfigError>().is_some() {
            return Self::ConfigError;
        }
        match err.downcast_ref::<FinderError>() {
            Some(FinderError::Interrupted) => Self::Interrupted,
            Some(FinderError::NoRoots) => Self::ConfigError,
            _ => Self::GeneralError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
