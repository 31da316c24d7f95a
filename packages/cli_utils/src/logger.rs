//! Global logger setup.
//!
//! Console output goes through `pretty_env_logger` and is suspended while
//! progress bars redraw. Every record at debug level or above is also
//! appended to a monthly log file named after the run start.

use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike as _, Local, Utc};
use indicatif::MultiProgress;
use log::{LevelFilter, Log, Metadata, Record};

/// Level recorded in the log file regardless of console verbosity.
pub const FILE_LEVEL: LevelFilter = LevelFilter::Debug;

type SharedFile = Arc<Mutex<LineWriter<File>>>;

/// Keeps the log file flushed for the lifetime of the process.
///
/// Dropping the guard flushes both sinks, as does [`LoggerGuard::finish`].
#[must_use = "dropping the guard early stops flushing the log file"]
pub struct LoggerGuard {
    file: SharedFile,
    path: PathBuf,
}

impl LoggerGuard {
    /// Path of the log file this run appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes all pending log output.
    pub fn finish(&self) {
        log::logger().flush();
        if let Ok(mut file) = self.file.lock() {
            file.flush().ok();
        }
    }
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Returns the monthly log file for a run started at `run_start`.
#[must_use]
pub fn log_file_path(log_dir: &Path, run_start: DateTime<Utc>) -> PathBuf {
    log_dir.join(format!(
        "{:04}_{:02}.log",
        run_start.year(),
        run_start.month()
    ))
}

/// Formats one log file line, including the trailing newline.
#[must_use]
pub fn format_file_record(record: &Record<'_>, now: DateTime<Local>) -> String {
    format!(
        "{} {} {} - {}\n",
        now.format("%Y-%m-%d %H:%M:%S,%3f"),
        record.level(),
        record.target(),
        record.args()
    )
}

/// Forwards records to a console logger and appends them to a file.
struct TeeLogger<L> {
    console: L,
    file: SharedFile,
}

impl<L: Log> Log for TeeLogger<L> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= FILE_LEVEL || self.console.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if self.console.enabled(record.metadata()) {
            self.console.log(record);
        }
        if record.level() <= FILE_LEVEL {
            let line = format_file_record(record, Local::now());
            if let Ok(mut file) = self.file.lock() {
                file.write_all(line.as_bytes()).ok();
            }
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Ok(mut file) = self.file.lock() {
            file.flush().ok();
        }
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// The console shows info and above, or debug and above when `debug` is
/// set; `RUST_LOG` overrides either. The file at
/// [`log_file_path`]`(log_dir, run_start)` always receives debug and above.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to,
/// and the guard that flushes the log file.
///
/// # Errors
///
/// Returns an I/O error if `log_dir` cannot be created or the log file
/// cannot be opened for appending.
pub fn init_logger(
    log_dir: &Path,
    run_start: DateTime<Utc>,
    debug: bool,
) -> std::io::Result<(MultiProgress, LoggerGuard)> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_file_path(log_dir, run_start);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let file: SharedFile = Arc::new(Mutex::new(LineWriter::new(file)));

    let multi = MultiProgress::new();

    let console_level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let console = pretty_env_logger::formatted_builder()
        .filter_level(console_level)
        .parse_env("RUST_LOG")
        .build();
    let level = console.filter().max(FILE_LEVEL);

    let tee = TeeLogger {
        console,
        file: Arc::clone(&file),
    };

    indicatif_log_bridge::LogWrapper::new(multi.clone(), tee)
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    Ok((multi, LoggerGuard { file, path }))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use log::Level;

    use super::*;

    /// Console stand-in that accepts nothing.
    struct Silent;

    impl Log for Silent {
        fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
            false
        }
        fn log(&self, _record: &Record<'_>) {}
        fn flush(&self) {}
    }

    fn open(path: &Path) -> SharedFile {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        Arc::new(Mutex::new(LineWriter::new(file)))
    }

    #[test]
    fn log_file_is_named_after_run_month() {
        let start = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 0).unwrap();

        assert_eq!(
            log_file_path(Path::new("/logs"), start),
            PathBuf::from("/logs/2024_03.log")
        );
    }

    #[test]
    fn file_record_format() {
        let now = Local
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .unwrap()
            .checked_add_signed(chrono::TimeDelta::milliseconds(67))
            .unwrap();
        let line = format_file_record(
            &Record::builder()
                .level(Level::Info)
                .target("nwp_sync_archive::inspect")
                .args(format_args!("Checked 3 files"))
                .build(),
            now,
        );

        assert_eq!(
            line,
            "2024-01-02 03:04:05,067 INFO nwp_sync_archive::inspect - Checked 3 files\n"
        );
    }

    #[test]
    fn file_receives_debug_but_not_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024_01.log");
        let tee = TeeLogger {
            console: Silent,
            file: open(&path),
        };

        tee.log(
            &Record::builder()
                .level(Level::Debug)
                .target("nwp_sync")
                .args(format_args!("Downloading file 1/2"))
                .build(),
        );
        tee.log(
            &Record::builder()
                .level(Level::Trace)
                .target("nwp_sync")
                .args(format_args!("noise"))
                .build(),
        );
        tee.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.ends_with(" DEBUG nwp_sync - Downloading file 1/2\n"));
    }

    #[test]
    fn file_is_appended_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024_01.log");
        std::fs::write(&path, "earlier run\n").unwrap();

        let tee = TeeLogger {
            console: Silent,
            file: open(&path),
        };
        tee.log(
            &Record::builder()
                .level(Level::Warn)
                .target("nwp_sync")
                .args(format_args!("No files found in remote listing."))
                .build(),
        );
        tee.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("earlier run\n"));
        assert!(contents.contains(" WARN nwp_sync - No files found in remote listing.\n"));
    }
}
