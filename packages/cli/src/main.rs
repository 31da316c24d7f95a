#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the NWP archive mirror.
//!
//! Runs exactly one synchronization pass and exits; scheduling is left to
//! cron or a systemd timer. Exits non-zero if the pass is aborted.
//!
//! Uses `indicatif-log-bridge` (via [`nwp_sync_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use nwp_sync::progress::{ProgressCallback, null_progress};
use nwp_sync::{SyncConfig, Syncer};
use nwp_sync_archive_models::{DEFAULT_BUCKET_URL, DEFAULT_RESOURCE_PREFIX, Origin};
use nwp_sync_cli_utils::{IndicatifProgress, LOG_PROGRESS_INTERVAL, LogProgress, MultiProgress};
use nwp_sync_listing::ListingOptions;

/// Default directory for the monthly log files.
const DEFAULT_LOG_DIR: &str = "/logs";

#[derive(Parser)]
#[command(
    name = "nwp_sync",
    about = "Mirror the GeoSphere NWP forecast archive into a local directory"
)]
struct Cli {
    /// Enable debug logging on the console
    #[arg(long)]
    debug: bool,
    /// Show download progress updates
    #[arg(long)]
    progress: bool,
    /// Root of the local archive (files land in `<DIR>/<YYYY>_<MM>/`)
    #[arg(long, env = "NWP_SYNC_DATA_DIR", default_value = nwp_sync::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Directory for the monthly `<YYYY>_<MM>.log` files
    #[arg(long, env = "NWP_SYNC_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,
    /// Base URL of the remote bucket
    #[arg(long, env = "NWP_SYNC_BUCKET_URL", default_value = DEFAULT_BUCKET_URL)]
    bucket_url: String,
    /// Key prefix of the archive files inside the bucket
    #[arg(long, env = "NWP_SYNC_PREFIX", default_value = DEFAULT_RESOURCE_PREFIX)]
    prefix: String,
    /// Abort if the listing needs more than this many pages
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,
}

impl Cli {
    fn sync_config(&self) -> SyncConfig {
        SyncConfig::default()
            .with_origin(
                Origin::default()
                    .with_bucket_url(&self.bucket_url)
                    .with_resource_prefix(&self.prefix),
            )
            .with_data_root(&self.data_dir)
            .with_listing(ListingOptions::default().with_max_pages(self.max_pages))
    }

    /// Picks the progress renderer: none unless requested, a bar on a
    /// terminal, periodic log lines otherwise.
    fn progress(&self, multi: &MultiProgress) -> Arc<dyn ProgressCallback> {
        if !self.progress {
            null_progress()
        } else if console::Term::stderr().is_term() {
            IndicatifProgress::bytes_bar(multi)
        } else {
            LogProgress::bytes_log(LOG_PROGRESS_INTERVAL)
        }
    }
}

fn banner() {
    log::info!("{}", "=".repeat(60));
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let run_start = Utc::now();
    let (multi, logger) = nwp_sync_cli_utils::init_logger(&cli.log_dir, run_start, cli.debug)?;

    banner();
    log::info!("Synchronization started at {}", run_start.to_rfc3339());
    banner();
    log::debug!(
        "Data directory: {}, log file: {}",
        cli.data_dir.display(),
        logger.path().display()
    );

    let progress = cli.progress(&multi);
    let result = match Syncer::new(cli.sync_config()) {
        Ok(syncer) => syncer.sync_once(&progress).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(result) => {
            log::info!("{}", result.summary_line(run_start));
            banner();
            log::info!("Synchronization completed successfully");
            banner();
            logger.finish();
            Ok(())
        }
        Err(e) => {
            log::error!("Synchronization aborted due to an error: {e}");
            logger.finish();
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Value of an env-backed option when no flag is given.
    fn env_or(var: &str, default: &str) -> String {
        std::env::var(var).unwrap_or_else(|_| default.to_owned())
    }

    #[test]
    fn defaults_without_flags() {
        let cli = Cli::try_parse_from(["nwp_sync"]).unwrap();
        let config = cli.sync_config();

        assert!(!cli.debug);
        assert!(!cli.progress);
        assert_eq!(config.listing.max_pages, None);
        assert_eq!(
            config.layout.data_root(),
            std::path::Path::new(&env_or("NWP_SYNC_DATA_DIR", nwp_sync::DEFAULT_DATA_DIR))
        );
        assert_eq!(
            cli.log_dir,
            PathBuf::from(env_or("NWP_SYNC_LOG_DIR", DEFAULT_LOG_DIR))
        );
        assert_eq!(
            config.origin,
            Origin::default()
                .with_bucket_url(&env_or("NWP_SYNC_BUCKET_URL", DEFAULT_BUCKET_URL))
                .with_resource_prefix(&env_or("NWP_SYNC_PREFIX", DEFAULT_RESOURCE_PREFIX))
        );
    }

    #[test]
    fn zero_page_limit_is_rejected() {
        let err = Cli::try_parse_from(["nwp_sync", "--max-pages", "0"])
            .err()
            .unwrap();

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(Cli::try_parse_from(["nwp_sync", "--max-pages", "1"]).is_ok());
    }

    #[test]
    fn flags_override_configuration() {
        let cli = Cli::try_parse_from([
            "nwp_sync",
            "--debug",
            "--data-dir",
            "/srv/nwp",
            "--bucket-url",
            "https://mirror.example.org/bucket/",
            "--prefix",
            "archive",
            "--max-pages",
            "5",
        ])
        .unwrap();
        let config = cli.sync_config();

        assert!(cli.debug);
        assert_eq!(config.layout.data_root(), std::path::Path::new("/srv/nwp"));
        assert_eq!(config.listing.max_pages, Some(5));
        assert_eq!(
            config.origin.file_url(
                &nwp_sync_archive_models::RemoteFileName::new("nwp_2024010100.nc").unwrap()
            ),
            "https://mirror.example.org/bucket/archive/nwp_2024010100.nc"
        );
    }
}
