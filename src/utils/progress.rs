//! Transfer Progress
//!
//! Byte-level progress events for uploads and downloads. A reporter is
//! shared by every transfer a client runs, so events carry their own label
//! and running totals instead of relying on reporter state.

use crate::types::StorageError;
use tracing::{debug, info, warn};

/// A single progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress<'a> {
    /// Local path or remote key being transferred
    pub label: &'a str,
    /// Bytes moved so far, including this chunk
    pub transferred: u64,
    /// Size of the chunk that produced this event
    pub chunk: u64,
    /// Expected size when known up front
    pub total: Option<u64>,
}

impl TransferProgress<'_> {
    /// Completed fraction in percent, when the total is known.
    pub fn percent(&self) -> Option<u64> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some((self.transferred.min(total) * 100) / total),
            None => None,
        }
    }

    /// Percent before this chunk was applied.
    fn previous_percent(&self) -> Option<u64> {
        let previous = TransferProgress {
            transferred: self.transferred.saturating_sub(self.chunk),
            ..*self
        };
        previous.percent()
    }
}

/// Receives progress events from transfers.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, label: &str, total: Option<u64>);

    fn advance(&self, progress: TransferProgress<'_>);

    fn finish(&self, label: &str, transferred: u64);

    /// Called instead of `finish` when a started transfer fails.
    fn fail(&self, _label: &str, _error: &StorageError) {}
}

/// Logs progress through `tracing`: one debug event per 10% step and one
/// info event per finished transfer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn start(&self, label: &str, total: Option<u64>) {
        debug!(label = %label, total = ?total, "Transfer started");
    }

    fn advance(&self, progress: TransferProgress<'_>) {
        if let (Some(now), Some(before)) = (progress.percent(), progress.previous_percent()) {
            if now / 10 != before / 10 {
                debug!(
                    label = %progress.label,
                    transferred = progress.transferred,
                    percent = now,
                    "Transfer progress"
                );
            }
        }
    }

    fn finish(&self, label: &str, transferred: u64) {
        info!(label = %label, bytes = transferred, "Transfer finished");
    }

    fn fail(&self, label: &str, error: &StorageError) {
        warn!(label = %label, error = %error, "Transfer failed");
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _label: &str, _total: Option<u64>) {}

    fn advance(&self, _progress: TransferProgress<'_>) {}

    fn finish(&self, _label: &str, _transferred: u64) {}
}

/// Format a byte count with binary units, e.g. `1.5 MiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
