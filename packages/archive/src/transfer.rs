//! Streaming download of one archive file.
//!
//! The body is streamed to a temporary `<name>.<attempt>.part` file next to
//! the destination and only renamed onto the final path once every byte has
//! been written and synced. Each attempt creates its own temporary file, so
//! overlapping runs never write into each other's data. On any failure the
//! temporary file is removed before the error is returned, so a reader never
//! observes a truncated file at the final path and the next pass simply
//! downloads the file again.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nwp_sync_archive_models::{ArchiveLayout, Origin, RemoteFileName};
use tokio::io::{AsyncWriteExt as _, BufWriter};

use crate::progress::ProgressCallback;
use crate::{ArchiveError, TransferOptions};

/// Bytes per gigabyte, for log output.
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Sequence number distinguishing attempts within this process.
static NEXT_ATTEMPT: AtomicU64 = AtomicU64::new(0);

/// Downloads archive files from the origin into the local layout.
#[derive(Debug, Clone)]
pub struct FileTransfer {
    client: reqwest::Client,
    origin: Origin,
    layout: ArchiveLayout,
    options: TransferOptions,
}

impl FileTransfer {
    /// Creates a transfer that fetches from `origin` into `layout`.
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        origin: Origin,
        layout: ArchiveLayout,
        options: TransferOptions,
    ) -> Self {
        Self {
            client,
            origin,
            layout,
            options,
        }
    }

    /// The local layout files are written into.
    #[must_use]
    pub const fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// Downloads `name` to its layout path and returns the number of bytes
    /// written.
    ///
    /// Creates the month directory if needed. Temporary files left behind by
    /// other attempts are neither reused nor touched.
    ///
    /// `progress` is started once the origin has answered with success, and
    /// is then either finished or cleared.
    ///
    /// # Errors
    ///
    /// * [`ArchiveError::Http`] on connection, timeout or body errors.
    /// * [`ArchiveError::Status`] if the origin does not answer with success.
    /// * [`ArchiveError::Io`] if the directory or file cannot be written.
    ///
    /// In every error case this attempt leaves no file at the destination or
    /// at its temporary path.
    pub async fn download(
        &self,
        name: &RemoteFileName,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<u64, ArchiveError> {
        let dir = self.layout.month_dir(name);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(ArchiveError::io(&dir))?;

        log::debug!("Starting download: {name}");

        let response = match self.request(name).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Error downloading file {name}: {e}");
                return Err(e);
            }
        };

        progress.start(name.as_str(), response.content_length());

        match self.store(name, response, progress).await {
            Ok(bytes) => {
                #[allow(clippy::cast_precision_loss)] // display-only GB value
                let gb = bytes as f64 / GIB;
                log::info!("Completed download: {name} ({gb:.2} GB)");
                progress.finish(format!("{name} ({gb:.2} GB)"));
                Ok(bytes)
            }
            Err(e) => {
                log::error!("Error downloading file {name}: {e}");
                progress.finish_and_clear();
                Err(e)
            }
        }
    }

    /// Sends the GET for `name` and checks the status.
    async fn request(&self, name: &RemoteFileName) -> Result<reqwest::Response, ArchiveError> {
        let url = self.origin.file_url(name);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArchiveError::Status { url, status });
        }

        Ok(response)
    }

    /// Streams `response` into a fresh temporary file and renames it onto
    /// the destination of `name`.
    async fn store(
        &self,
        name: &RemoteFileName,
        response: reqwest::Response,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<u64, ArchiveError> {
        let (partial, file) = self.create_partial(name).await?;
        let destination = self.layout.path_for(name);

        let result = match self.write_body(response, file, &partial, progress).await {
            Ok(bytes) => tokio::fs::rename(&partial, &destination)
                .await
                .map(|()| bytes)
                .map_err(ArchiveError::io(&destination)),
            Err(e) => Err(e),
        };

        if result.is_err() {
            remove_partial(&partial).await;
        }
        result
    }

    /// Creates a temporary file no other attempt can be writing to.
    async fn create_partial(
        &self,
        name: &RemoteFileName,
    ) -> Result<(PathBuf, tokio::fs::File), ArchiveError> {
        loop {
            let attempt = format!(
                "{}-{}",
                std::process::id(),
                NEXT_ATTEMPT.fetch_add(1, Ordering::Relaxed)
            );
            let partial = self.layout.partial_path_for(name, &attempt);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&partial)
                .await
            {
                Ok(file) => return Ok((partial, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    log::debug!(
                        "Temporary file {} already exists, picking another name",
                        partial.display()
                    );
                }
                Err(source) => {
                    return Err(ArchiveError::Io {
                        path: partial,
                        source,
                    });
                }
            }
        }
    }

    /// Copies the body of `response` into `file`, then flushes and syncs it.
    async fn write_body(
        &self,
        mut response: reqwest::Response,
        file: tokio::fs::File,
        partial: &Path,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<u64, ArchiveError> {
        let mut writer = BufWriter::with_capacity(self.options.buffer_size, file);
        let mut written: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            writer
                .write_all(&chunk)
                .await
                .map_err(ArchiveError::io(partial))?;
            let len = chunk.len() as u64;
            written += len;
            progress.inc(len);
        }

        writer.flush().await.map_err(ArchiveError::io(partial))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(ArchiveError::io(partial))?;

        Ok(written)
    }
}

/// Best-effort removal of a partially downloaded file.
async fn remove_partial(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => log::warn!(
            "Removed partially downloaded file: {}",
            partial.display()
        ),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!(
            "Failed to remove partially downloaded file {}: {e}",
            partial.display()
        ),
    }
}
