//! Core domain types: extracted pages and clipping templates.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ExtractedPage
// ---------------------------------------------------------------------------

/// Readable content and metadata extracted from a single web page.
///
/// Produced once per conversion by a page extractor and never mutated
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPage {
    /// Page title.
    pub title: String,
    /// Author name, if the page declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Short description or summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Publication date as found on the page (not normalized).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    /// Hostname without a leading `www.`.
    pub domain: String,
    /// The URL the page was fetched from.
    pub url: String,
    /// Markdown body text.
    pub content: String,
    /// Extracted content HTML the Markdown was produced from.
    pub html: String,
    /// Absolute favicon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    /// Absolute lead image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Approximate word count of `content`.
    pub word_count: usize,
    /// First schema.org JSON-LD object found on the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_org_data: Option<serde_json::Map<String, serde_json::Value>>,
}

// ---------------------------------------------------------------------------
// PropertyType
// ---------------------------------------------------------------------------

/// Value type of a template property, controlling how it is written to YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyType {
    #[default]
    Text,
    Multitext,
    Number,
    Checkbox,
    Date,
    Datetime,
    /// Any tag not listed above; formatted like [`PropertyType::Text`].
    Other(String),
}

impl PropertyType {
    /// The lowercase tag used in template JSON.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Multitext => "multitext",
            Self::Number => "number",
            Self::Checkbox => "checkbox",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for PropertyType {
    fn from(tag: &str) -> Self {
        match tag {
            "" | "text" => Self::Text,
            "multitext" => Self::Multitext,
            "number" => Self::Number,
            "checkbox" => Self::Checkbox,
            "date" => Self::Date,
            "datetime" => Self::Datetime,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for PropertyType {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<PropertyType> for String {
    fn from(kind: PropertyType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A single named property declared by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// YAML key written to the frontmatter.
    pub name: String,
    /// Template expression rendered against the variable context.
    pub value: String,
    /// Value type; `text` when omitted.
    #[serde(rename = "type", default)]
    pub kind: PropertyType,
}

/// Caller-supplied clipping template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Display name of the template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Properties in declaration order.
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
    /// Template expression for the note body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_content_format: Option<String>,
}

// ---------------------------------------------------------------------------
// RenderedProperty
// ---------------------------------------------------------------------------

/// Rendered value of a property.
///
/// Renderers always produce text; a flag can be supplied directly by callers
/// that already hold a boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RenderedValue {
    Flag(bool),
    Text(String),
}

impl RenderedValue {
    /// Text form of the value (`"true"`/`"false"` for flags).
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Text(s) => std::borrow::Cow::Borrowed(s),
            Self::Flag(b) => std::borrow::Cow::Owned(b.to_string()),
        }
    }
}

impl From<String> for RenderedValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for RenderedValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for RenderedValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

/// A property whose value expression has been rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedProperty {
    pub name: String,
    pub value: RenderedValue,
    #[serde(rename = "type", default)]
    pub kind: PropertyType,
}

impl RenderedProperty {
    /// Build a rendered property.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<RenderedValue>,
        kind: impl Into<PropertyType>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: kind.into(),
        }
    }
}
