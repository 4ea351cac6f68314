//! YAML frontmatter serialization for rendered template properties.
//!
//! Serialization is best-effort and never fails: values that cannot be
//! interpreted for their declared type are written as blank.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use webclip_shared::{PropertyType, RenderedProperty, RenderedValue};

/// Characters that force a key to be quoted (whitespace is checked separately).
const KEY_SPECIAL_CHARS: &[char] = &[
    ':', '{', '}', '[', ']', ',', '&', '*', '#', '?', '|', '<', '>', '=', '!', '%', '@', '-',
];

/// Bare words YAML would read as booleans or null.
const RESERVED_KEYS: &[&str] = &["true", "false", "null", "yes", "no", "on", "off"];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Serialize rendered properties into a `---` delimited YAML block.
///
/// Returns an empty string when there are no properties or when every
/// property serialized to a blank value. Properties are written in order;
/// duplicate names produce duplicate keys.
pub fn generate_frontmatter(properties: &[RenderedProperty]) -> String {
    if properties.is_empty() {
        return String::new();
    }

    let mut body = String::new();
    let mut has_content = false;

    for property in properties {
        body.push_str(&format_key(&property.name));
        body.push(':');

        match format_value(&property.value, &property.kind) {
            Formatted::Blank => body.push('\n'),
            Formatted::Scalar(value) => {
                has_content = true;
                let _ = writeln!(body, " {value}");
            }
            Formatted::List(items) => {
                has_content = true;
                body.push('\n');
                for item in items {
                    let _ = writeln!(body, "  - \"{}\"", escape_double_quotes(&item));
                }
            }
        }
    }

    if !has_content {
        debug!(count = properties.len(), "all properties blank, omitting frontmatter");
        return String::new();
    }

    format!("---\n{body}---\n")
}

/// Items parsed from a `multitext` value, tagged with the branch that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultitextItems {
    /// The value was a JSON array literal (`["a", "b"]`).
    Json(Vec<String>),
    /// The value was split on commas.
    Csv(Vec<String>),
}

impl MultitextItems {
    pub fn items(&self) -> &[String] {
        match self {
            Self::Json(items) | Self::Csv(items) => items,
        }
    }

    pub fn into_items(self) -> Vec<String> {
        match self {
            Self::Json(items) | Self::Csv(items) => items,
        }
    }
}

/// Parse a `multitext` value into list items.
///
/// Values bracketed as `["…"]` are read as a JSON array; if that fails they
/// fall back to a plain comma split. Anything else is split on commas that
/// are not inside a `[[wiki, link]]`. Empty items are dropped.
pub fn parse_multitext(raw: &str) -> MultitextItems {
    let trimmed = raw.trim();

    if trimmed.starts_with("[\"") && trimmed.ends_with("\"]") {
        match serde_json::from_str::<Vec<Value>>(raw) {
            Ok(values) => {
                let items = values
                    .into_iter()
                    .filter_map(json_item)
                    .filter(|item| !item.is_empty())
                    .collect();
                return MultitextItems::Json(items);
            }
            Err(e) => {
                debug!(error = %e, "multitext is not a valid JSON array, splitting on commas");
                return MultitextItems::Csv(clean_items(raw.split(',')));
            }
        }
    }

    MultitextItems::Csv(clean_items(split_outside_wikilinks(raw)))
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

fn format_key(name: &str) -> String {
    if !key_needs_quotes(name) {
        return name.to_string();
    }

    if name.contains('"') {
        format!("'{}'", name.replace('\'', "''"))
    } else {
        format!("\"{name}\"")
    }
}

fn key_needs_quotes(name: &str) -> bool {
    name.chars()
        .any(|c| c.is_whitespace() || KEY_SPECIAL_CHARS.contains(&c))
        || name.starts_with(|c: char| c.is_ascii_digit())
        || RESERVED_KEYS
            .iter()
            .any(|word| name.trim().eq_ignore_ascii_case(word))
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

enum Formatted {
    Blank,
    Scalar(String),
    List(Vec<String>),
}

fn format_value(value: &RenderedValue, kind: &PropertyType) -> Formatted {
    match kind {
        PropertyType::Multitext => {
            let items = parse_multitext(&value.as_text()).into_items();
            if items.is_empty() {
                Formatted::Blank
            } else {
                Formatted::List(items)
            }
        }
        PropertyType::Number => match format_number(&value.as_text()) {
            Some(n) => Formatted::Scalar(n),
            None => Formatted::Blank,
        },
        PropertyType::Checkbox => {
            let checked = match value {
                RenderedValue::Flag(b) => *b,
                RenderedValue::Text(s) => s == "true",
            };
            Formatted::Scalar(checked.to_string())
        }
        PropertyType::Date | PropertyType::Datetime => {
            let text = value.as_text();
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Formatted::Blank
            } else {
                Formatted::Scalar(trimmed.to_string())
            }
        }
        PropertyType::Text | PropertyType::Other(_) => {
            let text = value.as_text();
            if text.trim().is_empty() {
                Formatted::Blank
            } else {
                Formatted::Scalar(format!("\"{}\"", escape_double_quotes(&text)))
            }
        }
    }
}

/// Strip everything but digits, `.` and `-`, then read the leading float.
fn format_number(raw: &str) -> Option<String> {
    static FLOAT_PREFIX_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)").expect("valid regex"));

    let numeric: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if numeric.is_empty() {
        return None;
    }

    let prefix = FLOAT_PREFIX_RE.find(&numeric)?;
    let value: f64 = prefix.as_str().parse().ok()?;
    value.is_finite().then(|| format_float(value))
}

/// Shortest decimal form of a float, without a trailing `.0`.
///
/// Magnitudes of `1e21` and above, or below `1e-6`, use exponent notation
/// with an explicit sign (`1.5e+22`, `1e-7`).
pub(crate) fn format_float(value: f64) -> String {
    let magnitude = value.abs();
    if value == 0.0 {
        "0".to_string()
    } else if magnitude >= 1e21 || magnitude < 1e-6 {
        let exp = format!("{value:e}");
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        }
    } else {
        format!("{value}")
    }
}

fn escape_double_quotes(s: &str) -> String {
    s.replace('"', "\\\"")
}

fn json_item(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn clean_items<'a>(parts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Split on commas, except commas followed by `]]` before any `[`.
fn split_outside_wikilinks(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;

    for (i, c) in raw.char_indices() {
        if c == ',' && !inside_wikilink(&raw[i + 1..]) {
            parts.push(&raw[start..i]);
            start = i + 1;
        }
    }
    parts.push(&raw[start..]);

    parts
}

fn inside_wikilink(rest: &str) -> bool {
    rest.split('[').next().is_some_and(|before| before.contains("]]"))
}
