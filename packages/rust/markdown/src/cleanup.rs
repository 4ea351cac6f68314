//! Post-conversion cleanup passes for clipped Markdown.
//!
//! Each pass is a `&str -> String` function; [`run`] applies them in order.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

/// Run every cleanup pass over freshly converted Markdown.
pub(crate) fn run(md: &str, base_url: Option<&Url>) -> String {
    let md = collapse_blank_lines(md);
    let md = fix_fence_languages(&md);
    let md = strip_stray_tags(&md);
    let md = absolutize_urls(&md, base_url);
    let md = trim_line_ends(&md);
    finish_with_newline(&md)
}

/// At most one blank line between blocks.
fn collapse_blank_lines(md: &str) -> String {
    static BLANK_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid regex"));

    BLANK_RUN_RE.replace_all(md, "\n\n").into_owned()
}

/// ```` ```language-rust ```` and friends become ```` ```rust ````.
fn fix_fence_languages(md: &str) -> String {
    static FENCE_LANG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^([ \t]*```)(?:language-|lang-|highlight-)([\w+#-]+)").expect("valid regex")
    });

    FENCE_LANG_RE.replace_all(md, "$1$2").into_owned()
}

/// Drop layout tags htmd passed through, leaving their text. Fenced code is untouched.
fn strip_stray_tags(md: &str) -> String {
    static LAYOUT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|picture|source|details|summary|main|font|center)(?:\s[^>]*)?/?>",
        )
        .expect("valid regex")
    });

    let mut in_fence = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence {
                line.to_string()
            } else {
                LAYOUT_TAG_RE.replace_all(line, "").into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve relative link and image targets against the page URL.
fn absolutize_urls(md: &str, base_url: Option<&Url>) -> String {
    static TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(!?\[[^\]]*\])\(([^)\s]+)((?:\s+"[^"]*")?)\)"#).expect("valid regex")
    });

    let Some(base) = base_url else {
        return md.to_string();
    };

    TARGET_RE
        .replace_all(md, |caps: &Captures| {
            let (label, target, title) = (&caps[1], &caps[2], &caps[3]);
            match resolve_target(base, target) {
                Some(resolved) => format!("{label}({resolved}{title})"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn resolve_target(base: &Url, target: &str) -> Option<String> {
    let is_absolute = Url::parse(target).is_ok();
    if is_absolute || target.starts_with('#') {
        return None;
    }
    base.join(target).ok().map(String::from)
}

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

/// Trim leading blank lines and end with exactly one newline.
fn finish_with_newline(md: &str) -> String {
    let body = md.trim_start_matches('\n').trim_end();
    if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    }
}
