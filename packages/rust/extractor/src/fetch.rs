//! HTTP fetching with private-network protection.

use std::error::Error as _;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

use webclip_shared::{ExtractedPage, FetchConfig, Result, WebClipError};

use crate::PageExtractor;
use crate::content::extract_content_html;
use crate::metadata::{extract_metadata, extract_schema_org};

/// A redirect hop pointed at a private or local host.
#[derive(Debug, thiserror::Error)]
#[error("redirect to private or local address {target} blocked")]
struct BlockedRedirect {
    target: String,
}

/// Fetches pages over HTTP(S) and extracts their readable content.
///
/// The underlying `reqwest::Client` is pooled, so one extractor should be
/// shared across requests.
pub struct HttpExtractor {
    client: Client,
    allow_private_hosts: bool,
}

impl HttpExtractor {
    /// Build an extractor from fetch settings.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let allow_private_hosts = config.allow_private_hosts;
        let max_redirects = config.max_redirects;

        // Every redirect hop goes through the same host check as the first request.
        let redirect = Policy::custom(move |attempt| {
            // `previous` includes the original request URL.
            if attempt.previous().len() > max_redirects {
                attempt.error("too many redirects")
            } else if !allow_private_hosts && is_private_target(attempt.url()) {
                let target = attempt.url().to_string();
                attempt.error(BlockedRedirect { target })
            } else {
                attempt.follow()
            }
        });

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(redirect)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WebClipError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_private_hosts,
        })
    }

    /// Reject URLs this extractor will not fetch.
    pub fn check_url(&self, url: &Url) -> Result<()> {
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(WebClipError::invalid_url(
                    url.as_str(),
                    format!("unsupported scheme '{other}'"),
                ));
            }
        }

        if !self.allow_private_hosts && is_private_target(url) {
            warn!(%url, "blocked request to private host");
            return Err(WebClipError::invalid_url(
                url.as_str(),
                "private or local addresses are not allowed",
            ));
        }

        Ok(())
    }

    async fn fetch_html(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| match blocked_redirect(&e) {
                Some(blocked) => {
                    warn!(%url, target = %blocked.target, "blocked redirect to private host");
                    WebClipError::invalid_url(blocked.target.as_str(), blocked.to_string())
                }
                None => WebClipError::Fetch(format!("failed to fetch URL: {e}")),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebClipError::Fetch(format!("failed to fetch URL: {status}")));
        }

        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default();
            if !is_markup(content_type) {
                return Err(WebClipError::parse(format!(
                    "cannot extract a page from content type '{content_type}'"
                )));
            }
        }

        response
            .text()
            .await
            .map_err(|e| WebClipError::Fetch(format!("failed to read response body: {e}")))
    }
}

#[async_trait]
impl PageExtractor for HttpExtractor {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch_and_extract_page(&self, url: &Url) -> Result<ExtractedPage> {
        self.check_url(url)?;

        let body = self.fetch_html(url).await?;
        debug!(bytes = body.len(), "page fetched");

        let page = extract_page(&body, url)?;
        info!(
            title = %page.title,
            word_count = page.word_count,
            has_schema = page.schema_org_data.is_some(),
            "page extracted"
        );
        Ok(page)
    }
}

/// Extract metadata and Markdown content from a fetched HTML document.
pub fn extract_page(html: &str, url: &Url) -> Result<ExtractedPage> {
    let (content_html, meta, schema_org_data) = {
        let doc = Html::parse_document(html);
        let schema = extract_schema_org(&doc);
        let meta = extract_metadata(&doc, url, schema.as_ref());
        (extract_content_html(&doc), meta, schema)
    };

    let content = webclip_markdown::html_to_markdown(&content_html, Some(url))?;
    let word_count = webclip_markdown::count_words(&content);

    Ok(ExtractedPage {
        title: meta.title,
        author: meta.author,
        description: meta.description,
        published: meta.published,
        domain: domain_of(url),
        url: url.to_string(),
        content,
        html: content_html,
        favicon: meta.favicon,
        image: meta.image,
        word_count,
        schema_org_data,
    })
}

/// Find a [`BlockedRedirect`] anywhere in a reqwest error's source chain.
fn blocked_redirect(err: &reqwest::Error) -> Option<&BlockedRedirect> {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(blocked) = e.downcast_ref::<BlockedRedirect>() {
            return Some(blocked);
        }
        source = e.source();
    }
    None
}

/// HTML, XHTML and other text bodies can be parsed; binary and JSON bodies cannot.
fn is_markup(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime.starts_with("text/") || mime.contains("html") || mime.ends_with("xml")
}

/// Hostname with a leading `www.` removed.
fn domain_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

// ---------------------------------------------------------------------------
// Private-network protection
// ---------------------------------------------------------------------------

/// Whether a URL points at a loopback, private or otherwise local host.
fn is_private_target(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            let host = host.trim_end_matches('.').to_ascii_lowercase();
            host == "localhost"
                || host.ends_with(".localhost")
                || host.ends_with(".local")
                || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (carrier-grade NAT)
                || (a == 100 && (b & 0xC0) == 64)
                // 192.0.0.0/24
                || (a == 192 && b == 0 && c == 0)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (first & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (first & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE: &str = r#"<!DOCTYPE html>
<html><head>
  <title>Fallback</title>
  <meta property="og:title" content="Clipping the Web">
  <meta name="description" content="How clipping works">
  <script type="application/ld+json">
    {"@type": "BlogPosting", "author": {"@type": "Person", "name": "Sam Lee"},
     "datePublished": "2024-02-10"}
  </script>
</head><body>
  <nav><a href="/">Home</a></nav>
  <article>
    <h1>Clipping the Web</h1>
    <p>Saving pages as <a href="/notes">notes</a> is handy.</p>
  </article>
  <footer>Footer text</footer>
</body></html>"#;

    fn local_config() -> FetchConfig {
        FetchConfig {
            allow_private_hosts: true,
            ..FetchConfig::default()
        }
    }

    #[test]
    fn extract_page_builds_full_record() {
        let url = Url::parse("https://www.blog.example/posts/clip").unwrap();
        let page = extract_page(ARTICLE, &url).unwrap();

        assert_eq!(page.title, "Clipping the Web");
        assert_eq!(page.author.as_deref(), Some("Sam Lee"));
        assert_eq!(page.description.as_deref(), Some("How clipping works"));
        assert_eq!(page.published.as_deref(), Some("2024-02-10"));
        assert_eq!(page.domain, "blog.example");
        assert_eq!(page.url, "https://www.blog.example/posts/clip");
        assert_eq!(page.favicon.as_deref(), Some("https://www.blog.example/favicon.ico"));
        assert!(page.content.contains("# Clipping the Web"));
        assert!(page.content.contains("[notes](https://www.blog.example/notes)"));
        assert!(!page.content.contains("Footer text"));
        assert!(page.html.contains("<h1>Clipping the Web</h1>"));
        assert_eq!(page.word_count, webclip_markdown::count_words(&page.content));
        assert_eq!(
            page.schema_org_data.as_ref().unwrap()["@type"],
            "BlogPosting"
        );
    }

    #[test]
    fn domain_strips_only_leading_www() {
        let url = Url::parse("https://www.example.com/").unwrap();
        assert_eq!(domain_of(&url), "example.com");
        let url = Url::parse("https://docs.www.example.com/").unwrap();
        assert_eq!(domain_of(&url), "docs.www.example.com");
    }

    #[test]
    fn private_targets_detected() {
        for blocked in [
            "http://127.0.0.1:8080/",
            "http://10.0.0.1/",
            "http://192.168.1.1/admin",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/",
            "http://[fd00::1]/",
            "http://localhost:3000/",
            "http://printer.local/",
            "http://metadata.google.internal/",
        ] {
            assert!(is_private_target(&Url::parse(blocked).unwrap()), "{blocked}");
        }
        assert!(!is_private_target(&Url::parse("https://example.com/page").unwrap()));
        assert!(!is_private_target(&Url::parse("http://93.184.216.34/").unwrap()));
    }

    #[test]
    fn check_url_rejects_scheme_and_private_hosts() {
        let extractor = HttpExtractor::new(&FetchConfig::default()).unwrap();

        let err = extractor
            .check_url(&Url::parse("file:///etc/passwd").unwrap())
            .unwrap_err();
        assert!(matches!(err, WebClipError::InvalidUrl { .. }));

        let err = extractor
            .check_url(&Url::parse("http://127.0.0.1/").unwrap())
            .unwrap_err();
        assert!(matches!(err, WebClipError::InvalidUrl { .. }));

        assert!(extractor.check_url(&Url::parse("https://example.com/").unwrap()).is_ok());
    }

    #[tokio::test]
    async fn private_hosts_rejected_before_fetching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
            .expect(0)
            .mount(&server)
            .await;

        let extractor = HttpExtractor::new(&FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/post", server.uri())).unwrap();
        let err = extractor.fetch_and_extract_page(&url).await.unwrap_err();
        assert!(matches!(err, WebClipError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn fetches_and_extracts_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post"))
            .and(header("user-agent", "WebClipTest/1.0"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(ARTICLE, "text/html; charset=utf-8"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = FetchConfig {
            user_agent: "WebClipTest/1.0".into(),
            ..local_config()
        };
        let extractor = HttpExtractor::new(&config).unwrap();
        let url = Url::parse(&format!("{}/post", server.uri())).unwrap();

        let page = extractor.fetch_and_extract_page(&url).await.unwrap();
        assert_eq!(page.title, "Clipping the Web");
        assert_eq!(page.domain, "127.0.0.1");
        assert!(page.word_count > 5);
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = HttpExtractor::new(&local_config()).unwrap();
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();

        let err = extractor.fetch_and_extract_page(&url).await.unwrap_err();
        match err {
            WebClipError::Fetch(msg) => assert!(msg.contains("404"), "{msg}"),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    /// Mount `/hop/0 -> /hop/1 -> ... -> /hop/{hops}`, the last hop serving the article.
    async fn mount_hops(server: &MockServer, hops: usize) {
        for i in 0..hops {
            Mock::given(method("GET"))
                .and(path(format!("/hop/{i}")))
                .respond_with(
                    ResponseTemplate::new(302)
                        .insert_header("location", format!("{}/hop/{}", server.uri(), i + 1)),
                )
                .mount(server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(format!("/hop/{hops}")))
            .respond_with(ResponseTemplate::new(200).set_body_raw(ARTICLE, "text/html"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn redirects_within_limit_are_followed() {
        let server = MockServer::start().await;
        mount_hops(&server, 3).await;

        let config = FetchConfig {
            max_redirects: 2,
            ..local_config()
        };
        let extractor = HttpExtractor::new(&config).unwrap();
        let url = Url::parse(&format!("{}/hop/1", server.uri())).unwrap();

        let page = extractor.fetch_and_extract_page(&url).await.unwrap();
        assert_eq!(page.title, "Clipping the Web");
    }

    #[tokio::test]
    async fn redirect_chain_over_limit_fails() {
        let server = MockServer::start().await;
        mount_hops(&server, 3).await;

        let config = FetchConfig {
            max_redirects: 2,
            ..local_config()
        };
        let extractor = HttpExtractor::new(&config).unwrap();
        let url = Url::parse(&format!("{}/hop/0", server.uri())).unwrap();

        let err = extractor.fetch_and_extract_page(&url).await.unwrap_err();
        assert!(matches!(err, WebClipError::Fetch(_)), "{err:?}");
    }

    #[tokio::test]
    async fn redirect_to_private_host_is_invalid_url() {
        let server = MockServer::start().await;
        let target = format!("http://localhost:{}/secret", server.address().port());
        Mock::given(method("GET"))
            .and(path("/leak"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", target.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/secret"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(ARTICLE, "text/html"))
            .expect(0)
            .mount(&server)
            .await;

        // The mock server itself is local, so the first hop skips `check_url`.
        let extractor = HttpExtractor::new(&FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/leak", server.uri())).unwrap();

        let err = extractor.fetch_html(&url).await.unwrap_err();
        match err {
            WebClipError::InvalidUrl { url, reason } => {
                assert_eq!(url, target);
                assert!(reason.contains("blocked"), "{reason}");
            }
            other => panic!("expected invalid URL, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_markup_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7".to_vec(), "application/pdf"))
            .mount(&server)
            .await;

        let extractor = HttpExtractor::new(&local_config()).unwrap();
        let url = Url::parse(&format!("{}/paper.pdf", server.uri())).unwrap();

        let err = extractor.fetch_and_extract_page(&url).await.unwrap_err();
        match err {
            WebClipError::Parse { message } => assert!(message.contains("application/pdf"), "{message}"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn markup_content_types() {
        for ok in ["text/html; charset=utf-8", "application/xhtml+xml", "text/plain", "TEXT/HTML", ""] {
            assert!(is_markup(ok), "{ok}");
        }
        for rejected in ["application/pdf", "image/png", "application/json"] {
            assert!(!is_markup(rejected), "{rejected}");
        }
    }
}
