//! Variable context construction from extracted page data.
//!
//! The context is a flat `key -> value` map handed to the template renderer.
//! Fixed keys mirror [`ExtractedPage`] fields; `date`/`time` capture the
//! moment of conversion; `schema:<key>` entries flatten one level of
//! schema.org JSON-LD.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use webclip_shared::ExtractedPage;

use crate::frontmatter::format_float;

/// Prefix for flattened schema.org keys.
pub const SCHEMA_PREFIX: &str = "schema:";

/// A single value available to template expressions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VariableValue {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => f.write_str(&number_to_string(n)),
        }
    }
}

impl From<String> for VariableValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for VariableValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<usize> for VariableValue {
    fn from(n: usize) -> Self {
        Self::Number(serde_json::Number::from(n as u64))
    }
}

/// Flat, read-only mapping of substitution values for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VariableContext {
    values: BTreeMap<String, VariableValue>,
}

impl VariableContext {
    /// Look up a variable by key.
    pub fn get(&self, key: &str) -> Option<&VariableValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate over all variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariableValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, key: impl Into<String>, value: impl Into<VariableValue>) {
        self.values.insert(key.into(), value.into());
    }

    fn insert_opt(&mut self, key: &str, value: Option<&String>) {
        if let Some(v) = value {
            self.insert(key, v.as_str());
        }
    }
}

impl FromIterator<(String, VariableValue)> for VariableContext {
    fn from_iter<I: IntoIterator<Item = (String, VariableValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Build the variable context for `page`, capturing the current instant.
pub fn build_variable_context(page: &ExtractedPage) -> VariableContext {
    build_variable_context_at(page, Utc::now())
}

/// Build the variable context for `page` with `date`/`time` taken from `now`.
pub fn build_variable_context_at(page: &ExtractedPage, now: DateTime<Utc>) -> VariableContext {
    let mut ctx = VariableContext::default();

    // Page metadata
    ctx.insert("title", page.title.as_str());
    ctx.insert("url", page.url.as_str());
    ctx.insert("domain", page.domain.as_str());
    ctx.insert_opt("author", page.author.as_ref());
    ctx.insert_opt("published", page.published.as_ref());
    ctx.insert_opt("description", page.description.as_ref());
    ctx.insert_opt("image", page.image.as_ref());
    ctx.insert_opt("favicon", page.favicon.as_ref());

    ctx.insert("content", page.content.as_str());

    ctx.insert("date", now.to_rfc3339_opts(SecondsFormat::Millis, true));
    ctx.insert(
        "time",
        now.with_timezone(&Local).format("%H:%M:%S").to_string(),
    );

    ctx.insert("wordCount", page.word_count);

    if let Some(schema) = &page.schema_org_data {
        for (key, value) in flatten_schema_org(schema) {
            ctx.insert(key, value);
        }
    }

    ctx
}

/// Flatten the top level of a schema.org object into `schema:<key>` entries.
///
/// Strings and numbers are kept as text; objects with a `name` field
/// contribute its string form (see [`name_to_string`]). `@`-prefixed keys
/// and every other shape are skipped.
fn flatten_schema_org(data: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
    data.iter()
        .filter(|(key, _)| !key.starts_with('@'))
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => number_to_string(n),
                Value::Object(obj) => name_to_string(obj.get("name")?),
                _ => return None,
            };
            Some((format!("{SCHEMA_PREFIX}{key}"), text))
        })
        .collect()
}

/// String form of any `name` value: `null` becomes `"null"`, arrays join
/// their items with `,` (null items as empty), objects become `"[object Object]"`.
fn name_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => name_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Shortest decimal form of a JSON number (`3.0` renders as `3`).
fn number_to_string(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(format_float).unwrap_or_else(|| n.to_string())
    }
}
