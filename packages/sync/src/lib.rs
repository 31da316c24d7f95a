#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! One-shot synchronization pass of the NWP archive mirror.
//!
//! A pass lists the remote catalog, diffs it against the local tree, and
//! downloads what is missing:
//!
//! ```text
//! Idle -> CatalogFetched -> DiffComputed -> Downloading -> Done
//! ```
//!
//! An empty catalog or an empty diff ends the pass early with an empty
//! result. Downloads run one at a time, newest file first, and the first
//! failure aborts the pass. Files completed earlier in the pass stay on disk
//! and are skipped by the next pass, so re-running is always safe.
//!
//! Callers own logger setup and error reporting; this crate only emits
//! `log` records and progress callbacks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use nwp_sync_archive::progress::ProgressCallback;
use nwp_sync_archive::{ArchiveError, FileTransfer, TransferOptions, missing_files};
use nwp_sync_archive_models::{ArchiveLayout, Origin, RemoteFileName};
use nwp_sync_listing::{CatalogFetcher, ListingError, ListingOptions};

pub use nwp_sync_archive::progress;

/// Default root of the local archive.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Errors that abort a synchronization pass.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The remote catalog could not be listed.
    #[error("Failed to fetch remote listing: {0}")]
    Listing(#[from] ListingError),

    /// The local tree could not be inspected or written.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A download failed; earlier downloads of the pass are kept.
    #[error("Failed to download {name}: {source}")]
    Transfer {
        /// File whose download failed.
        name: RemoteFileName,
        /// Underlying error.
        source: ArchiveError,
    },
}

/// Configuration of a synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote endpoint of the archive.
    pub origin: Origin,
    /// Local layout rooted at the data directory.
    pub layout: ArchiveLayout,
    /// Listing request options.
    pub listing: ListingOptions,
    /// Transfer options.
    pub transfer: TransferOptions,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            origin: Origin::default(),
            layout: ArchiveLayout::new(DEFAULT_DATA_DIR),
            listing: ListingOptions::default(),
            transfer: TransferOptions::default(),
        }
    }
}

impl SyncConfig {
    /// Sets the remote origin.
    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the local data root.
    #[must_use]
    pub fn with_data_root(mut self, root: impl Into<std::path::PathBuf>) -> Self {
        self.layout = ArchiveLayout::new(root);
        self
    }

    /// Sets the listing options.
    #[must_use]
    pub fn with_listing(mut self, listing: ListingOptions) -> Self {
        self.listing = listing;
        self
    }

    /// Sets the transfer options.
    #[must_use]
    pub const fn with_transfer(mut self, transfer: TransferOptions) -> Self {
        self.transfer = transfer;
        self
    }
}

/// Outcome of one pass: the files downloaded, in download order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    /// Files fully written during this pass.
    pub downloaded: Vec<RemoteFileName>,
}

impl SyncResult {
    /// Whether nothing was downloaded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.downloaded.is_empty()
    }

    /// Number of files downloaded.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.downloaded.len()
    }

    /// Downloaded names as string slices.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.downloaded.iter().map(RemoteFileName::as_str).collect()
    }

    /// One-line run summary for the log.
    ///
    /// `run_start=<UTC, minute precision> downloaded_count=<n>
    /// files=<comma-joined names or "none">`
    #[must_use]
    pub fn summary_line(&self, run_start: DateTime<Utc>) -> String {
        let files = if self.is_empty() {
            "none".to_owned()
        } else {
            self.names().join(",")
        };
        format!(
            "run_start={} downloaded_count={} files={files}",
            run_start.format("%Y-%m-%dT%H:%M%:z"),
            self.len()
        )
    }
}

/// Runs synchronization passes against one origin and data root.
#[derive(Debug, Clone)]
pub struct Syncer {
    fetcher: CatalogFetcher,
    transfer: FileTransfer,
}

impl Syncer {
    /// Creates a syncer with an HTTP client built from the transfer
    /// options.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Archive`] if the HTTP client cannot be built.
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        let client = nwp_sync_archive::build_client(&config.transfer)?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a syncer that issues every request through `client`.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: SyncConfig) -> Self {
        let fetcher = CatalogFetcher::new(client.clone(), config.origin.clone(), config.listing);
        let transfer = FileTransfer::new(client, config.origin, config.layout, config.transfer);
        Self { fetcher, transfer }
    }

    /// The local layout this syncer writes into.
    #[must_use]
    pub const fn layout(&self) -> &ArchiveLayout {
        self.transfer.layout()
    }

    /// Performs one synchronization pass.
    ///
    /// # Errors
    ///
    /// * [`SyncError::Listing`] if any listing page fails.
    /// * [`SyncError::Archive`] if the data root cannot be created or
    ///   inspected.
    /// * [`SyncError::Transfer`] for the first download that fails. Files
    ///   downloaded before it remain in place.
    pub async fn sync_once(
        &self,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<SyncResult, SyncError> {
        log::debug!("Starting synchronization...");

        let root = self.layout().data_root();
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|source| ArchiveError::Io {
                path: root.to_path_buf(),
                source,
            })?;

        let catalog = self.fetcher.fetch().await?;
        if catalog.is_empty() {
            log::warn!("No files found in remote listing.");
            return Ok(SyncResult::default());
        }

        let missing = missing_files(self.layout(), &catalog)?;
        if missing.is_empty() {
            log::info!(
                "Local cache already has all {} file(s). Nothing to download.",
                catalog.len()
            );
            return Ok(SyncResult::default());
        }

        log::info!("Starting download of {} file(s)...", missing.len());
        let mut result = SyncResult::default();
        for (idx, name) in missing.iter().enumerate() {
            log::debug!(
                "Downloading file {}/{}: {name}",
                idx + 1,
                missing.len()
            );
            self.transfer
                .download(name, progress)
                .await
                .map_err(|source| SyncError::Transfer {
                    name: name.clone(),
                    source,
                })?;
            result.downloaded.push(name.clone());
        }

        log::info!("Successfully downloaded {} file(s)", result.len());
        Ok(result)
    }
}
