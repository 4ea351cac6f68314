//! Template rendering seam and the default MiniJinja-backed renderer.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use minijinja::{Environment, UndefinedBehavior, Value};
use regex::{Captures, Regex};

use webclip_shared::{Result, WebClipError};

use crate::variables::{SCHEMA_PREFIX, VariableContext};

/// Renders a template expression against a variable context.
///
/// Implementations may hold per-page state between calls, so callers render
/// a page's expressions one at a time, in order.
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// Render `expression` using `context`; `url` is the page being converted.
    async fn render(&self, expression: &str, context: &VariableContext, url: &str)
    -> Result<String>;
}

/// Renderer using MiniJinja syntax (`{{ title }}`, `{{ title | upper }}`, `{% if %}`).
///
/// Undefined variables render as empty strings. `schema:<key>` variables can
/// be written as `{{schema:author}}` or `{{ schema.author }}`.
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Lenient);
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    fn render_sync(&self, expression: &str, context: &VariableContext, url: &str) -> Result<String> {
        let source = rewrite_schema_refs(expression);
        let ctx = template_context(context, url);

        self.env
            .render_str(&source, ctx)
            .map_err(|e| WebClipError::render(e.to_string()))
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateRenderer for MiniJinjaRenderer {
    async fn render(
        &self,
        expression: &str,
        context: &VariableContext,
        url: &str,
    ) -> Result<String> {
        self.render_sync(expression, context, url)
    }
}

/// Build the engine context: plain keys at the top level, `schema:*` keys
/// grouped under a `schema` map.
fn template_context(context: &VariableContext, url: &str) -> BTreeMap<String, Value> {
    let mut top = BTreeMap::new();
    let mut schema = BTreeMap::new();

    for (key, value) in context.iter() {
        match key.strip_prefix(SCHEMA_PREFIX) {
            Some(name) => {
                schema.insert(name.to_string(), value.to_string());
            }
            None => {
                top.insert(key.to_string(), Value::from_serialize(value));
            }
        }
    }

    top.entry("url".to_string())
        .or_insert_with(|| Value::from(url));
    top.insert("schema".to_string(), Value::from_serialize(&schema));

    top
}

/// Rewrite `schema:key` inside `{{ }}` and `{% %}` tags into `schema["key"]`.
fn rewrite_schema_refs(expression: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}").expect("valid regex"));
    // String literals are matched first so references inside them are kept verbatim.
    static SCHEMA_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|\bschema:([A-Za-z_][A-Za-z0-9_]*)"#,
        )
        .expect("valid regex")
    });

    if !expression.contains(SCHEMA_PREFIX) {
        return expression.to_string();
    }

    TAG_RE
        .replace_all(expression, |tag: &Captures| {
            SCHEMA_REF_RE
                .replace_all(&tag[0], |m: &Captures| match m.get(1) {
                    Some(key) => format!(r#"schema["{}"]"#, key.as_str()),
                    None => m[0].to_string(),
                })
                .into_owned()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableValue;

    fn ctx(pairs: &[(&str, &str)]) -> VariableContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), VariableValue::from(*v)))
            .collect()
    }

    #[tokio::test]
    async fn renders_plain_variables() {
        let renderer = MiniJinjaRenderer::new();
        let context = ctx(&[("title", "Hello"), ("domain", "example.com")]);
        let out = renderer
            .render("{{title}} ({{ domain }})", &context, "https://example.com")
            .await
            .unwrap();
        assert_eq!(out, "Hello (example.com)");
    }

    #[tokio::test]
    async fn undefined_variables_render_empty() {
        let renderer = MiniJinjaRenderer::new();
        let out = renderer
            .render("[{{author}}]", &VariableContext::default(), "https://example.com")
            .await
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[tokio::test]
    async fn numbers_render_without_fraction() {
        let renderer = MiniJinjaRenderer::new();
        let context: VariableContext =
            [("wordCount".to_string(), VariableValue::from(1200usize))]
                .into_iter()
                .collect();
        let out = renderer.render("{{wordCount}}", &context, "").await.unwrap();
        assert_eq!(out, "1200");
    }

    #[tokio::test]
    async fn schema_keys_are_addressable() {
        let renderer = MiniJinjaRenderer::new();
        let context = ctx(&[("schema:author", "Jane"), ("schema:headline", "News")]);

        let out = renderer
            .render("{{schema:author}} / {{ schema.headline }}", &context, "")
            .await
            .unwrap();
        assert_eq!(out, "Jane / News");
    }

    #[test]
    fn schema_rewrite_leaves_plain_text_alone() {
        assert_eq!(
            rewrite_schema_refs("see schema:author and {{schema:author}}"),
            r#"see schema:author and {{schema["author"]}}"#
        );
        assert_eq!(
            rewrite_schema_refs("{% if schema:name %}x{% endif %}"),
            r#"{% if schema["name"] %}x{% endif %}"#
        );
    }

    #[test]
    fn schema_rewrite_skips_string_literals() {
        assert_eq!(
            rewrite_schema_refs(r#"{{ x | replace("schema:a", "") }}"#),
            r#"{{ x | replace("schema:a", "") }}"#
        );
        assert_eq!(
            rewrite_schema_refs(r#"{{ schema:name ~ 'schema:b' ~ "say \"schema:c\"" }}"#),
            r#"{{ schema["name"] ~ 'schema:b' ~ "say \"schema:c\"" }}"#
        );
    }

    #[tokio::test]
    async fn literal_schema_text_renders_unchanged() {
        let renderer = MiniJinjaRenderer::new();
        let context = ctx(&[("title", "schema:a Title"), ("schema:author", "Jane")]);
        let out = renderer
            .render(r#"{{ title | replace("schema:a ", "") }} by {{schema:author}}"#, &context, "")
            .await
            .unwrap();
        assert_eq!(out, "Title by Jane");
    }

    #[tokio::test]
    async fn url_falls_back_to_render_url() {
        let renderer = MiniJinjaRenderer::new();
        let out = renderer
            .render("{{url}}", &VariableContext::default(), "https://example.com/a")
            .await
            .unwrap();
        assert_eq!(out, "https://example.com/a");

        let context = ctx(&[("url", "https://example.com/context")]);
        let out = renderer
            .render("{{url}}", &context, "https://example.com/other")
            .await
            .unwrap();
        assert_eq!(out, "https://example.com/context");
    }

    #[tokio::test]
    async fn keeps_trailing_newline_and_does_not_escape_html() {
        let renderer = MiniJinjaRenderer::new();
        let context = ctx(&[("content", "<b>bold</b> & more")]);
        let out = renderer.render("{{content}}\n", &context, "").await.unwrap();
        assert_eq!(out, "<b>bold</b> & more\n");
    }

    #[tokio::test]
    async fn filters_are_available() {
        let renderer = MiniJinjaRenderer::new();
        let context = ctx(&[("title", "Hello")]);
        let out = renderer
            .render("{{ title | upper }}", &context, "")
            .await
            .unwrap();
        assert_eq!(out, "HELLO");
    }

    #[tokio::test]
    async fn syntax_errors_become_render_errors() {
        let renderer = MiniJinjaRenderer::new();
        let err = renderer
            .render("{{ title ", &VariableContext::default(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, WebClipError::Render { .. }));

        let err = renderer
            .render("{{ title | no_such_filter }}", &ctx(&[("title", "x")]), "")
            .await
            .unwrap_err();
        assert!(matches!(err, WebClipError::Render { .. }));
    }
}
