//! Page fetching and readable-content extraction.
//!
//! [`HttpExtractor`] downloads a page, pulls metadata from `<meta>` tags and
//! schema.org JSON-LD, finds the main content container, and converts it to
//! Markdown via `webclip-markdown`.

mod content;
mod fetch;
mod metadata;

use async_trait::async_trait;
use url::Url;

use webclip_shared::{ExtractedPage, Result};

pub use fetch::{HttpExtractor, extract_page};

/// Produces an [`ExtractedPage`] for a URL.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Fetch `url` and extract its content and metadata.
    async fn fetch_and_extract_page(&self, url: &Url) -> Result<ExtractedPage>;
}
