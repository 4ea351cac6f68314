//! Page metadata: `<meta>` tags, `<title>`, and schema.org JSON-LD.

use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

/// Metadata gathered from a parsed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PageMetadata {
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub published: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
}

/// Collect metadata from `doc`, preferring explicit tags over JSON-LD over
/// document structure. Image and favicon URLs are resolved against `url`.
pub(crate) fn extract_metadata(
    doc: &Html,
    url: &Url,
    schema: Option<&Map<String, Value>>,
) -> PageMetadata {
    let title = first_meta(doc, &[r#"meta[property="og:title"]"#, r#"meta[name="twitter:title"]"#])
        .or_else(|| first_text(doc, "title"))
        .or_else(|| schema.and_then(|s| schema_str(s, "headline")))
        .or_else(|| first_text(doc, "h1"))
        .unwrap_or_default();

    let author = first_meta(doc, &[r#"meta[name="author"]"#, r#"meta[property="article:author"]"#])
        .or_else(|| schema.and_then(schema_author));

    let description = first_meta(
        doc,
        &[r#"meta[name="description"]"#, r#"meta[property="og:description"]"#],
    );

    let published = first_meta(doc, &[r#"meta[property="article:published_time"]"#])
        .or_else(|| schema.and_then(|s| schema_str(s, "datePublished")))
        .or_else(|| first_attr(doc, "time[datetime]", "datetime"));

    let image = first_meta(doc, &[r#"meta[property="og:image"]"#, r#"meta[name="twitter:image"]"#])
        .and_then(|src| resolve(url, &src));

    let favicon = first_attr(doc, r#"link[rel~="icon"]"#, "href")
        .and_then(|href| resolve(url, &href))
        .or_else(|| resolve(url, "/favicon.ico"));

    PageMetadata {
        title,
        author,
        description,
        published,
        image,
        favicon,
    }
}

/// First schema.org object embedded as JSON-LD.
///
/// Top-level arrays and `@graph` containers are searched for their first
/// object. Blocks that fail to parse are skipped.
pub(crate) fn extract_schema_org(doc: &Html) -> Option<Map<String, Value>> {
    let sel = selector(r#"script[type="application/ld+json"]"#);

    doc.select(&sel).find_map(|script| {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => first_object(value),
            Err(e) => {
                debug!(error = %e, "skipping unparseable JSON-LD block");
                None
            }
        }
    })
}

fn first_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(mut obj) => match obj.remove("@graph") {
            Some(Value::Array(items)) => items.into_iter().find_map(first_object),
            Some(other) => {
                obj.insert("@graph".into(), other);
                Some(obj)
            }
            None => Some(obj),
        },
        Value::Array(items) => items.into_iter().find_map(first_object),
        _ => None,
    }
}

fn schema_str(schema: &Map<String, Value>, key: &str) -> Option<String> {
    schema.get(key).and_then(Value::as_str).and_then(non_blank)
}

/// `author` may be a string, a `Person` object, or a list of either.
fn schema_author(schema: &Map<String, Value>) -> Option<String> {
    fn name_of(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => non_blank(s),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str).and_then(non_blank),
            _ => None,
        }
    }

    match schema.get("author")? {
        Value::Array(items) => {
            let names: Vec<String> = items.iter().filter_map(name_of).collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        other => name_of(other),
    }
}

fn first_meta(doc: &Html, selectors: &[&str]) -> Option<String> {
    selectors
        .iter()
        .find_map(|css| first_attr(doc, css, "content"))
}

fn first_attr(doc: &Html, css: &str, attr: &str) -> Option<String> {
    let sel = selector(css);
    doc.select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .find_map(non_blank)
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    let sel = selector(css);
    doc.select(&sel).find_map(|el| {
        let text = el.text().collect::<Vec<_>>().join(" ");
        non_blank(&text.split_whitespace().collect::<Vec<_>>().join(" "))
    })
}

fn resolve(base: &Url, target: &str) -> Option<String> {
    base.join(target.trim()).ok().map(String::from)
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://www.example.com/posts/hello").unwrap()
    }

    #[test]
    fn open_graph_tags_win() {
        let doc = Html::parse_document(
            r#"<html><head>
                <title>Fallback Title</title>
                <meta property="og:title" content=" OG Title ">
                <meta name="author" content="Jane Doe">
                <meta property="og:description" content="From OG">
                <meta property="article:published_time" content="2024-03-01T09:00:00Z">
                <meta property="og:image" content="/img/cover.png">
                <link rel="shortcut icon" href="/static/icon.png">
            </head><body><h1>Heading</h1></body></html>"#,
        );

        let meta = extract_metadata(&doc, &page_url(), None);

        assert_eq!(meta.title, "OG Title");
        assert_eq!(meta.author.as_deref(), Some("Jane Doe"));
        assert_eq!(meta.description.as_deref(), Some("From OG"));
        assert_eq!(meta.published.as_deref(), Some("2024-03-01T09:00:00Z"));
        assert_eq!(meta.image.as_deref(), Some("https://www.example.com/img/cover.png"));
        assert_eq!(meta.favicon.as_deref(), Some("https://www.example.com/static/icon.png"));
    }

    #[test]
    fn falls_back_to_document_structure() {
        let doc = Html::parse_document(
            r#"<html><body><h1>  Only   Heading </h1>
               <time datetime="2023-12-24">Dec 24</time></body></html>"#,
        );

        let meta = extract_metadata(&doc, &page_url(), None);

        assert_eq!(meta.title, "Only Heading");
        assert_eq!(meta.author, None);
        assert_eq!(meta.description, None);
        assert_eq!(meta.published.as_deref(), Some("2023-12-24"));
        assert_eq!(meta.image, None);
        assert_eq!(meta.favicon.as_deref(), Some("https://www.example.com/favicon.ico"));
    }

    #[test]
    fn json_ld_fills_author_and_published() {
        let doc = Html::parse_document(
            r#"<html><head>
                <script type="application/ld+json">{ not json</script>
                <script type="application/ld+json">
                  {"@context": "https://schema.org", "@graph": [
                    "noise",
                    {"@type": "NewsArticle", "headline": "Graph Headline",
                     "datePublished": "2024-05-05",
                     "author": [{"@type": "Person", "name": "A. One"}, "B. Two"]}
                  ]}
                </script>
            </head><body></body></html>"#,
        );

        let schema = extract_schema_org(&doc).expect("schema object");
        assert_eq!(schema["@type"], "NewsArticle");

        let meta = extract_metadata(&doc, &page_url(), Some(&schema));
        assert_eq!(meta.title, "Graph Headline");
        assert_eq!(meta.author.as_deref(), Some("A. One, B. Two"));
        assert_eq!(meta.published.as_deref(), Some("2024-05-05"));
    }

    #[test]
    fn json_ld_top_level_array() {
        let doc = Html::parse_document(
            r#"<script type="application/ld+json">[1, {"@type": "Recipe", "name": "Soup"}]</script>"#,
        );
        let schema = extract_schema_org(&doc).unwrap();
        assert_eq!(schema["name"], "Soup");
    }

    #[test]
    fn no_json_ld_is_none() {
        let doc = Html::parse_document("<html><body><p>plain</p></body></html>");
        assert!(extract_schema_org(&doc).is_none());
    }
}
