#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Local side of the NWP archive mirror.
//!
//! * [`inspect`] compares the remote catalog against the local tree and
//!   reports which files are missing.
//! * [`transfer`] streams one remote file into the tree without ever
//!   leaving a truncated file at its final path.
//! * [`progress`] is the reporting hook transfers call into.
//!
//! # Timeouts
//!
//! Archive files are gigabyte-sized. The HTTP client built by
//! [`build_client`] bounds connection establishment with a short timeout and
//! bounds stalls (time between received bytes) with a long one. No total
//! timeout is applied, so slow but progressing downloads are never cut off.

pub mod inspect;
pub mod progress;
pub mod transfer;

use std::path::PathBuf;
use std::time::Duration;

pub use inspect::missing_files;
pub use transfer::FileTransfer;

/// Default timeout for establishing a connection to the origin.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for a stalled read while a response is streaming.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60 * 10);

/// Default size of the write buffer used while streaming a file (1 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Errors that can occur while inspecting or writing the local archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The HTTP request failed (connect, timeout, dropped body).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The origin answered with a non-success status.
    #[error("Download of {url} failed with status {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status returned by the origin.
        status: reqwest::StatusCode,
    },

    /// A local filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl ArchiveError {
    /// Wraps an I/O error with the path it occurred on.
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Options controlling file transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Timeout for a single stalled read while streaming a body.
    pub read_timeout: Duration,
    /// Capacity of the write buffer between the network and the file.
    pub buffer_size: usize,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl TransferOptions {
    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the stalled-read timeout.
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the write buffer capacity.
    #[must_use]
    pub const fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

/// Builds the HTTP client shared by listing and transfer requests.
///
/// # Errors
///
/// Returns [`ArchiveError::Http`] if the TLS backend cannot be initialized.
pub fn build_client(options: &TransferOptions) -> Result<reqwest::Client, ArchiveError> {
    let client = reqwest::Client::builder()
        .connect_timeout(options.connect_timeout)
        .read_timeout(options.read_timeout)
        .user_agent(concat!("nwp_sync/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_split_connect_and_stall() {
        let options = TransferOptions::default();

        assert_eq!(options.connect_timeout, Duration::from_secs(15));
        assert_eq!(options.read_timeout, Duration::from_secs(600));
        assert_eq!(options.buffer_size, 1024 * 1024);
    }

    #[test]
    fn client_builds_from_custom_options() {
        let options = TransferOptions::default()
            .with_connect_timeout(Duration::from_millis(50))
            .with_read_timeout(Duration::from_millis(200));

        assert!(build_client(&options).is_ok());
    }
}
