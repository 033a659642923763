//! Report formatters.
//!
//! - [`text`] for the terminal, one tagged line per file or pair
//! - [`json`] for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use dupescan::duplicates::DuplicateFinder;
//! use dupescan::output::TextOutput;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let report = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
//!
//! let stdout = std::io::stdout();
//! TextOutput::new(true, false)
//!     .write_scan(&mut stdout.lock(), &report)
//!     .unwrap();
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::{compare_summary_line, summary_line, TextOutput};
