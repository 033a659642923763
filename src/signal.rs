//! Ctrl+C handling.
//!
//! A [`ShutdownHandler`] wraps one shared `AtomicBool`. The walker stops
//! yielding entries and the hashing pool stops taking work once it is set;
//! the finder then reports [`FinderError::Interrupted`](crate::duplicates::FinderError::Interrupted)
//! and the process exits with code 130.
//!
//! ```rust,no_run
//! use dupescan::duplicates::FinderConfig;
//! use dupescan::signal::install_handler;
//!
//! let handler = install_handler().expect("signal handler");
//! let config = FinderConfig::default().with_shutdown_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True once Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the flag.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The flag itself, for the walker and finder.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// The Ctrl+C hook could not be registered.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Register the Ctrl+C hook once per process and return its handler.
///
/// Later calls return the same handler with the flag cleared, so the
/// application can be driven repeatedly from tests.
///
/// # Errors
///
/// Returns [`SignalError`] when `ctrlc` refuses the hook for a reason other
/// than one being registered already.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = GLOBAL_HANDLER.get_or_init(ShutdownHandler::new).clone();
    let flag = handler.get_flag();
    let hooked = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Finishing in-flight files...");
        let _ = stderr.flush();
        log::info!("Shutdown signal received");
    });

    match hooked {
        Ok(()) => Ok(handler),
        Err(ctrlc::Error::MultipleHandlers) => {
            log::debug!("Ctrl+C hook already registered, using the existing flag");
            Ok(handler)
        }
        Err(e) => Err(e.into()),
    }
}
