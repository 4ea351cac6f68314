//! Document assembly: template + extracted page -> Markdown note.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use webclip_shared::{ExtractedPage, RenderedProperty, Result, Template};

use crate::frontmatter::generate_frontmatter;
use crate::renderer::TemplateRenderer;
use crate::variables::build_variable_context_at;

/// Convert `page` into a Markdown note using `template`.
///
/// This is the main entry point. It:
/// 1. Builds the variable context once
/// 2. Renders each property value, in declaration order
/// 3. Serializes the rendered properties as YAML frontmatter
/// 4. Renders the note body (empty when the template has none)
/// 5. Joins frontmatter and body with a single newline
///
/// Any renderer failure aborts the conversion and is returned unchanged.
pub async fn convert_to_markdown(
    page: &ExtractedPage,
    template: &Template,
    renderer: &dyn TemplateRenderer,
) -> Result<String> {
    convert_to_markdown_at(page, template, renderer, Utc::now()).await
}

/// Like [`convert_to_markdown`], with `date`/`time` variables fixed to `now`.
#[instrument(skip_all, fields(url = %page.url, properties = template.properties.len()))]
pub async fn convert_to_markdown_at(
    page: &ExtractedPage,
    template: &Template,
    renderer: &dyn TemplateRenderer,
    now: DateTime<Utc>,
) -> Result<String> {
    let variables = build_variable_context_at(page, now);

    // One render at a time, in declaration order.
    let mut rendered = Vec::with_capacity(template.properties.len());
    for property in &template.properties {
        let value = renderer.render(&property.value, &variables, &page.url).await?;
        debug!(name = %property.name, kind = %property.kind, "property rendered");
        rendered.push(RenderedProperty {
            name: property.name.clone(),
            value: value.into(),
            kind: property.kind.clone(),
        });
    }

    let frontmatter = generate_frontmatter(&rendered);

    let content = match &template.note_content_format {
        Some(format) => renderer.render(format, &variables, &page.url).await?,
        None => String::new(),
    };

    let markdown = if frontmatter.is_empty() {
        content
    } else {
        format!("{frontmatter}\n{content}")
    };

    info!(
        frontmatter_len = frontmatter.len(),
        markdown_len = markdown.len(),
        "conversion complete"
    );

    Ok(markdown)
}
