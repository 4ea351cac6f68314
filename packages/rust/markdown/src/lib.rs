//! HTML-to-Markdown conversion for clipped page content.
//!
//! Converts extracted content HTML to Markdown using the `htmd` crate, then
//! applies cleanup passes that normalize whitespace, strip leftover layout
//! tags, and resolve relative links against the page URL.

mod cleanup;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use webclip_shared::{Result, WebClipError};

/// Tags dropped entirely during conversion.
const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "iframe", "noscript", "svg", "form"];

/// Convert a content HTML fragment to clean Markdown.
///
/// 1. Renders `<table>` elements as Markdown tables
/// 2. Converts HTML -> Markdown via `htmd`
/// 3. Runs the cleanup passes (relative URLs resolved against `base_url`)
#[instrument(skip(html), fields(html_len = html.len(), base = base_url.map(Url::as_str)))]
pub fn html_to_markdown(html: &str, base_url: Option<&Url>) -> Result<String> {
    let (html, tables) = extract_tables(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();

    let mut raw = converter
        .convert(&html)
        .map_err(|e| WebClipError::Conversion(format!("htmd conversion failed: {e}")))?;
    for (i, table) in tables.iter().enumerate() {
        raw = raw.replacen(&table_marker(i), table, 1);
    }

    let markdown = cleanup::run(&raw, base_url);
    debug!(raw_len = raw.len(), final_len = markdown.len(), "markdown conversion complete");

    Ok(markdown)
}

/// Count words in Markdown, ignoring fenced code blocks and bare heading markers.
pub fn count_words(md: &str) -> usize {
    static FENCED_CODE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

    FENCED_CODE_RE
        .replace_all(md, " ")
        .split_whitespace()
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .count()
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Swap every outermost `<table>` for a marker paragraph and return the
/// rendered Markdown tables in marker order.
///
/// `htmd` 0.1 flattens tables into loose text, so they are rendered here and
/// spliced back in after conversion. The fragment is re-serialized first so
/// each table's HTML is an exact substring of the text being rewritten.
fn extract_tables(html: &str) -> (String, Vec<String>) {
    static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));

    let fragment = Html::parse_fragment(html);
    if fragment.select(&TABLE).next().is_none() {
        return (html.to_string(), Vec::new());
    }

    let mut out = fragment.root_element().inner_html();
    let mut tables = Vec::new();
    // Nested tables are flattened into their parent's cells.
    for table in fragment
        .select(&TABLE)
        .filter(|t| !t.ancestors().filter_map(ElementRef::wrap).any(|a| a.value().name() == "table"))
    {
        let marker = format!("<p>{}</p>", table_marker(tables.len()));
        out = out.replacen(&table.html(), &marker, 1);
        tables.push(table_to_markdown(&table));
    }
    (out, tables)
}

fn table_marker(index: usize) -> String {
    format!("WEBCLIPTABLE{index}X")
}

fn table_to_markdown(table: &ElementRef) -> String {
    static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
    static CELL: LazyLock<Selector> = LazyLock::new(|| selector("th, td"));

    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();

    for tr in table.select(&ROW) {
        let cells: Vec<String> = tr.select(&CELL).map(|c| cell_text(&c)).collect();
        if cells.is_empty() {
            continue;
        }
        let is_header_row = tr.select(&CELL).all(|c| c.value().name() == "th");
        if header.is_none() && rows.is_empty() && is_header_row {
            header = Some(cells);
        } else {
            rows.push(cells);
        }
    }

    // Without <th> cells the first row doubles as the header.
    let header = match header {
        Some(h) => h,
        None if !rows.is_empty() => rows.remove(0),
        None => return String::new(),
    };

    let width = rows.iter().map(Vec::len).chain([header.len()]).max().unwrap_or(0);
    let line = |cells: &[String]| {
        let mut padded = cells.to_vec();
        padded.resize(width, String::new());
        format!("| {} |\n", padded.join(" | "))
    };

    let mut md = String::from("\n\n");
    md.push_str(&line(&header));
    md.push_str(&format!("|{}\n", " --- |".repeat(width)));
    for row in &rows {
        md.push_str(&line(row));
    }
    md.push('\n');
    md
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}
