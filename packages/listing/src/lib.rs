#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote catalog of the NWP archive.
//!
//! The archive is published as an S3-compatible bucket. Its catalog is read
//! with `ListObjectsV2` requests, one page at a time:
//!
//! * [`parse`] decodes a single XML listing page into file names and an
//!   optional continuation token.
//! * [`catalog`] drives the pagination until the origin stops truncating and
//!   returns the complete catalog, newest file first.
//!
//! Every failure (network, HTTP status, malformed XML) is fatal for the
//! whole catalog. There is no partial result and no retry.

pub mod catalog;
pub mod parse;

use std::time::Duration;

pub use catalog::CatalogFetcher;
pub use parse::{ListingPage, parse_listing};

/// Default number of keys requested per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Default total timeout of one listing request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur while listing the remote archive.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    /// The HTTP request failed (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The origin answered with a non-success status.
    #[error("Listing request to {url} failed with status {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status returned by the origin.
        status: reqwest::StatusCode,
    },

    /// The response body is not well-formed XML.
    #[error("Malformed listing XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The document is XML but not an S3 bucket listing.
    #[error("Unexpected listing root element '{name}'")]
    UnexpectedRoot {
        /// Local name of the root element found instead.
        name: String,
    },

    /// The page is marked truncated but carries no continuation token.
    #[error("Listing page {page} is truncated but has no continuation token")]
    MissingContinuationToken {
        /// One-based page number.
        page: u32,
    },

    /// The origin kept truncating past the configured page cap.
    #[error("Listing exceeded the limit of {max_pages} pages")]
    PageLimitExceeded {
        /// Configured page cap.
        max_pages: u32,
    },
}

/// Options controlling the listing requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingOptions {
    /// Number of keys requested per page (`max-keys`).
    pub page_size: u32,
    /// Delimiter sent with every request.
    pub delimiter: String,
    /// Total timeout of each listing request.
    pub request_timeout: Duration,
    /// Maximum number of pages to follow. `None` follows the origin until it
    /// stops truncating.
    pub max_pages: Option<u32>,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            delimiter: "/".to_owned(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_pages: None,
        }
    }
}

impl ListingOptions {
    /// Sets the number of keys per page.
    #[must_use]
    pub const fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Caps the number of pages that will be followed.
    #[must_use]
    pub const fn with_max_pages(mut self, max: Option<u32>) -> Self {
        self.max_pages = max;
        self
    }
}
