//! Pagination over the bucket listing.

use nwp_sync_archive_models::{Origin, RemoteFileName};

use crate::{ListingError, ListingOptions, ListingPage, parse_listing};

/// Enumerates the complete remote catalog.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    client: reqwest::Client,
    origin: Origin,
    options: ListingOptions,
}

impl CatalogFetcher {
    /// Creates a fetcher that lists `origin` with `client`.
    #[must_use]
    pub const fn new(client: reqwest::Client, origin: Origin, options: ListingOptions) -> Self {
        Self {
            client,
            origin,
            options,
        }
    }

    /// The origin being listed.
    #[must_use]
    pub const fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Lists every archive file of the origin.
    ///
    /// Starts without a continuation token and follows the tokens returned
    /// by each page until a page is no longer truncated. The result is
    /// sorted strictly descending (newest first) with duplicates removed.
    ///
    /// # Errors
    ///
    /// Returns the first [`ListingError`] raised by any page. Pages already
    /// fetched are discarded.
    pub async fn fetch(&self) -> Result<Vec<RemoteFileName>, ListingError> {
        log::debug!("Fetching remote file listing...");

        let mut files: Vec<RemoteFileName> = Vec::new();
        let mut continuation: Option<String> = None;
        let mut page: u32 = 1;

        loop {
            if let Some(max) = self.options.max_pages
                && page > max
            {
                return Err(ListingError::PageLimitExceeded { max_pages: max });
            }

            log::debug!("Fetching listing page {page}...");
            let batch = self.fetch_page(continuation.as_deref(), page).await?;
            let count = batch.files.len();
            files.extend(batch.files);
            log::debug!(
                "Found {count} files on page {page} (total so far: {})",
                files.len()
            );

            match batch.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }

            page += 1;
        }

        files.sort_unstable_by(|a, b| b.cmp(a));
        let before = files.len();
        files.dedup();
        if files.len() != before {
            log::warn!(
                "Remote listing contained {} duplicate file name(s)",
                before - files.len()
            );
        }

        log::info!(
            "Finished fetching remote listing: {} total files",
            files.len()
        );
        Ok(files)
    }

    /// Requests and decodes one listing page.
    async fn fetch_page(
        &self,
        continuation: Option<&str>,
        page: u32,
    ) -> Result<ListingPage, ListingError> {
        let page_size = self.options.page_size.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("list-type", "2"),
            ("max-keys", page_size.as_str()),
            ("delimiter", self.options.delimiter.as_str()),
            ("prefix", self.origin.resource_prefix.as_str()),
        ];
        if let Some(token) = continuation {
            query.push(("continuation-token", token));
        }

        let response = self
            .client
            .get(self.origin.listing_url())
            .query(&query)
            .timeout(self.options.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListingError::Status {
                url: response.url().to_string(),
                status,
            });
        }

        let body = response.text().await?;
        parse_listing(&body, &self.origin, page)
    }
}
