//! Best-effort progress reporting.
//!
//! # Overview
//!
//! The pipeline never waits on progress. The aggregation stage holds a
//! [`ProgressSender`] and calls [`ProgressSender::notify`] once per completed
//! record; the notification is dropped when the queue is full. A
//! [`ProgressReporter`] thread owns the receiving side: it counts whatever
//! arrives and hands a [`ProgressSnapshot`] to a [`ProgressCallback`] on every
//! tick. Dropping every sender ends the reporter after a final callback.
//!
//! # Example
//!
//! ```
//! use dupescan::progress::{spawn_reporter, SilentProgress, DEFAULT_QUEUE_CAPACITY};
//! use std::time::Duration;
//!
//! let (sender, reporter) = spawn_reporter(
//!     Box::new(SilentProgress),
//!     Duration::from_millis(10),
//!     DEFAULT_QUEUE_CAPACITY,
//! );
//! sender.notify(42);
//! drop(sender);
//!
//! let snapshot = reporter.finish();
//! assert_eq!(snapshot.files, 1);
//! assert_eq!(snapshot.bytes, 42);
//! ```

use std::thread::JoinHandle;
use std::time::Duration;

use bytesize::ByteSize;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use indicatif::{ProgressBar, ProgressStyle};

/// Interval between progress redraws.
pub const DEFAULT_TICK: Duration = Duration::from_millis(750);

/// Capacity of the notification queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// One completed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Size of the record in bytes
    pub bytes: u64,
}

/// Counts received by the reporter so far.
///
/// Dropped notifications are not counted, so these are lower bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Files observed
    pub files: u64,
    /// Bytes observed
    pub bytes: u64,
}

impl ProgressSnapshot {
    fn record(&mut self, event: ProgressEvent) {
        self.files += 1;
        self.bytes += event.bytes;
    }

    /// Status line, e.g. `"12 files scanned (3.4 MB)"`.
    #[must_use]
    pub fn message(&self) -> String {
        format!("{} files scanned ({})", self.files, ByteSize::b(self.bytes))
    }
}

/// Receives periodic progress snapshots on the reporter thread.
pub trait ProgressCallback: Send {
    /// Called on every tick.
    fn on_tick(&mut self, snapshot: &ProgressSnapshot);

    /// Called once after the last sender is dropped.
    fn on_finish(&mut self, _snapshot: &ProgressSnapshot) {}
}

/// Producer handle. Never blocks.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Sender<ProgressEvent>,
}

impl ProgressSender {
    /// Report one completed record of `bytes` bytes.
    ///
    /// Returns `false` when the notification was dropped.
    pub fn notify(&self, bytes: u64) -> bool {
        match self.tx.try_send(ProgressEvent { bytes }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("Progress queue full, dropping notification");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle to the reporter thread.
#[derive(Debug)]
pub struct ProgressReporter {
    handle: JoinHandle<ProgressSnapshot>,
}

impl ProgressReporter {
    /// Wait for the reporter to drain and return the final counts.
    ///
    /// Every [`ProgressSender`] must be dropped first, otherwise this blocks.
    #[must_use]
    pub fn finish(self) -> ProgressSnapshot {
        self.handle.join().unwrap_or_else(|_| {
            log::warn!("Progress reporter panicked");
            ProgressSnapshot::default()
        })
    }
}

/// Create a bounded progress queue and start its reporter thread.
#[must_use]
pub fn spawn_reporter(
    mut callback: Box<dyn ProgressCallback>,
    tick: Duration,
    capacity: usize,
) -> (ProgressSender, ProgressReporter) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    let handle = std::thread::spawn(move || run_reporter(&rx, callback.as_mut(), tick));
    (ProgressSender { tx }, ProgressReporter { handle })
}

fn run_reporter(
    rx: &Receiver<ProgressEvent>,
    callback: &mut dyn ProgressCallback,
    tick: Duration,
) -> ProgressSnapshot {
    let ticker = crossbeam_channel::tick(tick);
    let mut snapshot = ProgressSnapshot::default();

    loop {
        crossbeam_channel::select! {
            recv(ticker) -> _ => {
                if drain(rx, &mut snapshot) {
                    break;
                }
                callback.on_tick(&snapshot);
            }
            recv(rx) -> event => match event {
                Ok(event) => snapshot.record(event),
                Err(_) => break,
            },
        }
    }

    callback.on_finish(&snapshot);
    snapshot
}

/// Pull everything pending. Returns true once every sender is gone.
fn drain(rx: &Receiver<ProgressEvent>, snapshot: &mut ProgressSnapshot) -> bool {
    loop {
        match rx.try_recv() {
            Ok(event) => snapshot.record(event),
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => return true,
        }
    }
}

/// Spinner on stderr showing files and bytes scanned.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Create a spinner; hidden entirely when `quiet` is set.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
            );
            bar.set_message("Scanning");
            bar
        };
        Self { bar }
    }
}

impl ProgressCallback for Progress {
    fn on_tick(&mut self, snapshot: &ProgressSnapshot) {
        self.bar.set_message(snapshot.message());
        self.bar.tick();
    }

    fn on_finish(&mut self, snapshot: &ProgressSnapshot) {
        self.bar.finish_and_clear();
        log::debug!("Progress finished: {}", snapshot.message());
    }
}

/// Callback that discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_tick(&mut self, _snapshot: &ProgressSnapshot) {}
}
