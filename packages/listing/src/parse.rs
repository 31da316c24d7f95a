//! Decoding of a single `ListObjectsV2` response page.

use nwp_sync_archive_models::{Origin, RemoteFileName};
use roxmltree::{Document, Node};

use crate::ListingError;

/// XML namespace of S3 listing documents.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Root element of a `ListObjectsV2` response.
const ROOT_ELEMENT: &str = "ListBucketResult";

/// One decoded listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Archive files listed on this page, in document order.
    pub files: Vec<RemoteFileName>,
    /// Cursor for the next page. Only present when the page is truncated.
    pub continuation: Option<String>,
}

/// Decodes one listing page.
///
/// Keeps the `Contents` entries whose key lives under the origin's resource
/// prefix and ends with its extension, stripped to the base name. Entries
/// without a key are skipped, as are names that do not follow the archive
/// naming convention (with a warning).
///
/// `page` is the one-based page number, used in error reports.
///
/// # Errors
///
/// * [`ListingError::Xml`] if the body is not well-formed XML.
/// * [`ListingError::UnexpectedRoot`] if the document is not an S3 listing.
/// * [`ListingError::MissingContinuationToken`] if the page claims to be
///   truncated without naming the next cursor.
pub fn parse_listing(xml: &str, origin: &Origin, page: u32) -> Result<ListingPage, ListingError> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();

    if !root.has_tag_name((S3_NAMESPACE, ROOT_ELEMENT)) {
        return Err(ListingError::UnexpectedRoot {
            name: root.tag_name().name().to_owned(),
        });
    }

    let mut files = Vec::new();

    for entry in s3_children(root, "Contents") {
        let Some(key) = s3_child_text(entry, "Key") else {
            log::debug!("Skipping listing entry without a key");
            continue;
        };

        if !key.starts_with(&origin.resource_prefix) || !key.ends_with(&origin.extension) {
            continue;
        }

        let base = key.rsplit('/').next().unwrap_or(key);
        match RemoteFileName::new(base) {
            Ok(name) => files.push(name),
            Err(e) => log::warn!("Skipping listing entry {key}: {e}"),
        }
    }

    let truncated = s3_child_text(root, "IsTruncated")
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"));

    let continuation = if truncated {
        let token = s3_child_text(root, "NextContinuationToken")
            .ok_or(ListingError::MissingContinuationToken { page })?;
        Some(token.to_owned())
    } else {
        None
    };

    Ok(ListingPage {
        files,
        continuation,
    })
}

/// Direct children of `node` named `name` in the S3 namespace.
fn s3_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |child| child.has_tag_name((S3_NAMESPACE, name)))
}

/// Non-empty text of the first S3 child element named `name`.
fn s3_child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|child| child.has_tag_name((S3_NAMESPACE, name)))
        .and_then(|child| child.text())
        .filter(|text| !text.is_empty())
}
