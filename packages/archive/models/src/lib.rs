#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Value types shared by the NWP archive mirror.
//!
//! The remote archive publishes files named
//! `<prefix>_<YYYYMMDDHH>.<extension>` (e.g. `nwp_2024010100.nc`). The
//! year and month are read positionally from the name and decide where the
//! file lives locally: `<data_root>/<YYYY>_<MM>/<file name>`.

use std::path::{Path, PathBuf};

/// Default public bucket endpoint of the archive.
pub const DEFAULT_BUCKET_URL: &str = "https://public.hub.geosphere.at/datahub";

/// Default key prefix under which the archive files are listed.
pub const DEFAULT_RESOURCE_PREFIX: &str = "resources/nwp-v1-1h-2500m/filelisting/";

/// Default extension of the archive files.
pub const DEFAULT_EXTENSION: &str = ".nc";

/// Extension of in-flight download files. They never match
/// [`ArchiveLayout::path_for`], so an unfinished download is never counted
/// as present.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Byte range of the 4-digit year within a file name.
const YEAR_RANGE: std::ops::Range<usize> = 4..8;

/// Byte range of the 2-digit month within a file name.
const MONTH_RANGE: std::ops::Range<usize> = 8..10;

/// Errors raised when a file name does not follow the archive naming
/// convention.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileNameError {
    /// The name is too short to carry a year and month.
    #[error("File name '{name}' is too short to contain a year and month")]
    TooShort {
        /// The offending name.
        name: String,
    },

    /// The year/month slice is not made of ASCII digits.
    #[error("File name '{name}' does not carry a numeric year and month at bytes 4-9")]
    NotNumeric {
        /// The offending name.
        name: String,
    },

    /// The name contains a path separator.
    #[error("File name '{name}' contains a path separator")]
    PathSeparator {
        /// The offending name.
        name: String,
    },
}

/// Base name of one archive file, as listed by the remote origin.
///
/// Ordering is lexicographic on the name, which, given the fixed-width
/// timestamp, is also chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemoteFileName(String);

impl RemoteFileName {
    /// Validates `name` against the naming convention.
    ///
    /// Only the positional year/month slice is checked. The remaining
    /// timestamp digits are not validated.
    ///
    /// # Errors
    ///
    /// Returns [`FileNameError`] if the name is too short, has a
    /// non-numeric year/month slice, or contains a path separator.
    pub fn new(name: impl Into<String>) -> Result<Self, FileNameError> {
        let name = name.into();

        if name.contains('/') || name.contains('\\') {
            return Err(FileNameError::PathSeparator { name });
        }

        let Some(date) = name.as_bytes().get(YEAR_RANGE.start..MONTH_RANGE.end) else {
            return Err(FileNameError::TooShort { name });
        };

        if !date.iter().all(u8::is_ascii_digit) {
            return Err(FileNameError::NotNumeric { name });
        }

        Ok(Self(name))
    }

    /// The 4-digit year encoded in the name.
    #[must_use]
    pub fn year(&self) -> &str {
        &self.0[YEAR_RANGE]
    }

    /// The 2-digit month encoded in the name.
    #[must_use]
    pub fn month(&self) -> &str {
        &self.0[MONTH_RANGE]
    }

    /// Name of the monthly directory the file belongs to (`YYYY_MM`).
    #[must_use]
    pub fn month_dir(&self) -> String {
        format!("{}_{}", self.year(), self.month())
    }

    /// The file name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper, returning the owned name.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RemoteFileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RemoteFileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for RemoteFileName {
    type Error = FileNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for RemoteFileName {
    type Error = FileNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Where the archive lives remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Base URL of the bucket, without a trailing slash.
    pub bucket_url: String,
    /// Key prefix of the archive files, with a trailing slash.
    pub resource_prefix: String,
    /// Extension every archive file carries (including the dot).
    pub extension: String,
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            bucket_url: DEFAULT_BUCKET_URL.to_owned(),
            resource_prefix: DEFAULT_RESOURCE_PREFIX.to_owned(),
            extension: DEFAULT_EXTENSION.to_owned(),
        }
    }
}

impl Origin {
    /// Sets the bucket base URL. A trailing slash is removed.
    #[must_use]
    pub fn with_bucket_url(mut self, url: &str) -> Self {
        url.trim_end_matches('/').clone_into(&mut self.bucket_url);
        self
    }

    /// Sets the resource prefix. A trailing slash is added if missing.
    #[must_use]
    pub fn with_resource_prefix(mut self, prefix: &str) -> Self {
        self.resource_prefix = if prefix.is_empty() || prefix.ends_with('/') {
            prefix.to_owned()
        } else {
            format!("{prefix}/")
        };
        self
    }

    /// Sets the file extension.
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        extension.clone_into(&mut self.extension);
        self
    }

    /// URL of the bucket listing endpoint (query parameters excluded).
    #[must_use]
    pub fn listing_url(&self) -> String {
        format!("{}/", self.bucket_url)
    }

    /// Full object key of an archive file.
    #[must_use]
    pub fn object_key(&self, name: &RemoteFileName) -> String {
        format!("{}{name}", self.resource_prefix)
    }

    /// Download URL of an archive file.
    #[must_use]
    pub fn file_url(&self, name: &RemoteFileName) -> String {
        format!("{}/{}", self.bucket_url, self.object_key(name))
    }
}

/// Maps archive file names to their local paths.
///
/// No index is kept: the filesystem is checked directly on every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    data_root: PathBuf,
}

impl ArchiveLayout {
    /// Creates a layout rooted at `data_root`.
    #[must_use]
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    /// The root directory of the local archive.
    #[must_use]
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Monthly directory holding `name`.
    #[must_use]
    pub fn month_dir(&self, name: &RemoteFileName) -> PathBuf {
        self.data_root.join(name.month_dir())
    }

    /// Final local path of `name`.
    #[must_use]
    pub fn path_for(&self, name: &RemoteFileName) -> PathBuf {
        self.month_dir(name).join(name.as_str())
    }

    /// Temporary path one download attempt of `name` is streamed to before
    /// it is renamed onto [`Self::path_for`].
    ///
    /// `attempt` must be unique among attempts that may overlap, so two runs
    /// never write into the same temporary file.
    #[must_use]
    pub fn partial_path_for(&self, name: &RemoteFileName, attempt: &str) -> PathBuf {
        self.month_dir(name)
            .join(format!("{name}.{attempt}{PARTIAL_SUFFIX}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_year_and_month() {
        let name = RemoteFileName::new("nwp_2024010100.nc").unwrap();
        assert_eq!(name.year(), "2024");
        assert_eq!(name.month(), "01");
        assert_eq!(name.month_dir(), "2024_01");
    }

    #[test]
    fn rejects_short_name() {
        assert_eq!(
            RemoteFileName::new("nwp_2024"),
            Err(FileNameError::TooShort {
                name: "nwp_2024".to_owned()
            })
        );
    }

    #[test]
    fn rejects_non_numeric_date() {
        assert!(matches!(
            RemoteFileName::new("nwp_latest.nc"),
            Err(FileNameError::NotNumeric { .. })
        ));
    }

    #[test]
    fn rejects_path_separator() {
        assert!(matches!(
            RemoteFileName::new("nwp_2024010100/x.nc"),
            Err(FileNameError::PathSeparator { .. })
        ));
    }

    #[test]
    fn orders_newest_last() {
        let older = RemoteFileName::new("nwp_2023120100.nc").unwrap();
        let newer = RemoteFileName::new("nwp_2024010100.nc").unwrap();
        assert!(older < newer);
    }

    #[test]
    fn places_file_in_month_directory() {
        let layout = ArchiveLayout::new("/data");
        let name = RemoteFileName::new("nwp_2023120100.nc").unwrap();

        assert_eq!(
            layout.path_for(&name),
            PathBuf::from("/data/2023_12/nwp_2023120100.nc")
        );
        assert_eq!(
            layout.partial_path_for(&name, "4242-0"),
            PathBuf::from("/data/2023_12/nwp_2023120100.nc.4242-0.part")
        );
    }

    #[test]
    fn builds_download_url() {
        let origin = Origin::default().with_bucket_url("http://localhost:9000/");
        let name = RemoteFileName::new("nwp_2024010100.nc").unwrap();

        assert_eq!(
            origin.file_url(&name),
            "http://localhost:9000/resources/nwp-v1-1h-2500m/filelisting/nwp_2024010100.nc"
        );
        assert_eq!(origin.listing_url(), "http://localhost:9000/");
    }

    #[test]
    fn normalizes_prefix_slash() {
        let origin = Origin::default().with_resource_prefix("resources/other");
        assert_eq!(origin.resource_prefix, "resources/other/");
    }
}
