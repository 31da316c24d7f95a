#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the NWP archive mirror.
//!
//! Provides two renderers behind the [`ProgressCallback`] trait:
//! [`IndicatifProgress`] draws a byte progress bar on a terminal, and
//! [`LogProgress`] writes periodic log lines for unattended runs. Also
//! provides [`init_logger`], which sets up `indicatif-log-bridge` so that
//! `log::info!` and friends are suspended while progress bars redraw, and
//! tees every record into a monthly log file.

pub mod logger;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use nwp_sync_archive::progress::ProgressCallback;

pub use indicatif::MultiProgress;
pub use logger::{LoggerGuard, init_logger};

/// Bytes between two [`LogProgress`] lines (100 MiB).
pub const LOG_PROGRESS_INTERVAL: u64 = 100 * 1024 * 1024;

/// Bytes per gigabyte, for log output.
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// An `indicatif` [`ProgressBar`] per transfer, implementing
/// [`ProgressCallback`].
pub struct IndicatifProgress {
    multi: MultiProgress,
    bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifProgress {
    /// Creates a reporter that adds one byte bar per transfer to `multi`.
    ///
    /// Transfers with an announced size get a bar with throughput and ETA;
    /// the others get a spinner with the running byte count.
    #[must_use]
    pub fn bytes_bar(multi: &MultiProgress) -> Arc<dyn ProgressCallback> {
        Arc::new(Self {
            multi: multi.clone(),
            bar: Mutex::new(None),
        })
    }

    fn current(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|bar| bar.clone())
    }

    /// Removes the bar of the current transfer, leaving later calls without
    /// a bar to act on until the next `start`.
    fn take(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|mut bar| bar.take())
    }
}

impl ProgressCallback for IndicatifProgress {
    fn start(&self, label: &str, total: Option<u64>) {
        let bar = if let Some(total) = total {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template(
                    "  {msg} {wide_bar:.cyan/dim} {bytes}/{total_bytes} {bytes_per_sec} [{eta}]",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
            );
            bar
        } else {
            let bar = ProgressBar::new_spinner();
            bar.enable_steady_tick(Duration::from_millis(100));
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg} {bytes} {bytes_per_sec}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar
        };
        let bar = self.multi.add(bar);
        bar.set_message(label.to_string());

        let previous = self
            .bar
            .lock()
            .ok()
            .and_then(|mut slot| slot.replace(bar));
        if let Some(previous) = previous {
            previous.finish_and_clear();
        }
    }

    fn inc(&self, delta: u64) {
        if let Some(bar) = self.current() {
            bar.inc(delta);
        }
    }

    fn finish(&self, msg: String) {
        if let Some(bar) = self.take() {
            bar.finish_with_message(msg);
        }
    }

    fn finish_and_clear(&self) {
        if let Some(bar) = self.take() {
            bar.finish_and_clear();
        }
    }
}

/// Progress of the transfer a [`LogProgress`] is currently reporting.
#[derive(Debug, Default)]
struct TransferState {
    label: String,
    total: Option<u64>,
    written: u64,
    next_report: u64,
}

impl TransferState {
    fn new(label: &str, total: Option<u64>, interval: u64) -> Self {
        Self {
            label: label.to_owned(),
            total,
            written: 0,
            next_report: interval,
        }
    }

    /// Records `delta` more bytes and returns a line to log when a report
    /// threshold was crossed.
    fn advance(&mut self, delta: u64, interval: u64) -> Option<String> {
        self.written += delta;
        if self.written < self.next_report {
            return None;
        }
        while self.next_report <= self.written {
            self.next_report += interval.max(1);
        }
        Some(self.describe())
    }

    #[allow(clippy::cast_precision_loss)] // display-only GB/percent values
    fn describe(&self) -> String {
        let written = self.written as f64 / GIB;
        match self.total {
            Some(total) if total > 0 => format!(
                "Downloading {}: {written:.2} GB / {:.2} GB ({:.1}%)",
                self.label,
                total as f64 / GIB,
                self.written as f64 * 100.0 / total as f64
            ),
            _ => format!("Downloading {}: {written:.2} GB", self.label),
        }
    }
}

/// Reports transfer progress as `info` log lines every
/// [`LOG_PROGRESS_INTERVAL`] bytes, for runs without a terminal.
pub struct LogProgress {
    interval: u64,
    state: Mutex<TransferState>,
}

impl LogProgress {
    /// Creates a reporter that logs once per `interval` bytes.
    #[must_use]
    pub fn bytes_log(interval: u64) -> Arc<dyn ProgressCallback> {
        Arc::new(Self {
            interval,
            state: Mutex::new(TransferState::default()),
        })
    }
}

impl ProgressCallback for LogProgress {
    fn start(&self, label: &str, total: Option<u64>) {
        if let Ok(mut state) = self.state.lock() {
            *state = TransferState::new(label, total, self.interval);
        }
    }

    fn inc(&self, delta: u64) {
        let line = self
            .state
            .lock()
            .ok()
            .and_then(|mut state| state.advance(delta, self.interval));
        if let Some(line) = line {
            log::info!("{line}");
        }
    }

    fn finish(&self, _msg: String) {}

    fn finish_and_clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = TransferState::default();
        }
    }
}
