//! Main-content detection for arbitrary web pages.

use scraper::Html;

use crate::metadata::selector;

/// Candidate containers for the readable content, most specific first.
const CONTENT_SELECTORS: &[&str] = &["article", "main", r#"[role="main"]"#, ".content", "body"];

/// Page chrome removed from the selected container.
const CHROME_SELECTOR: &str =
    "nav, header, footer, aside, script, style, form, noscript, .sidebar, .nav";

/// Return the inner HTML of the page's main content container with chrome
/// stripped, or an empty string if the document has no usable container.
pub(crate) fn extract_content_html(doc: &Html) -> String {
    CONTENT_SELECTORS
        .iter()
        .find_map(|css| {
            let sel = selector(css);
            doc.select(&sel)
                .find(|el| el.text().any(|t| !t.trim().is_empty()))
                .map(|el| strip_chrome(&el.inner_html()))
        })
        .unwrap_or_default()
}

/// Remove navigation, headers, footers and similar elements from a fragment.
fn strip_chrome(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let chrome = selector(CHROME_SELECTOR);

    let mut result = fragment.root_element().inner_html();
    for el in fragment.select(&chrome) {
        result = result.replacen(&el.html(), "", 1);
    }
    result.trim().to_string()
}
