//! Content-to-document conversion pipeline for WebClip.
//!
//! This crate turns an [`ExtractedPage`](webclip_shared::ExtractedPage) and a
//! [`Template`](webclip_shared::Template) into a Markdown note:
//! - [`variables`] builds the flat variable context from page metadata
//! - [`frontmatter`] serializes rendered properties into YAML frontmatter
//! - [`converter`] orchestrates rendering and assembles the final document
//! - [`renderer`] defines the template-renderer seam and a MiniJinja implementation

pub mod converter;
pub mod frontmatter;
pub mod renderer;
pub mod variables;

pub use converter::{convert_to_markdown, convert_to_markdown_at};
pub use frontmatter::{MultitextItems, generate_frontmatter, parse_multitext};
pub use renderer::{MiniJinjaRenderer, TemplateRenderer};
pub use variables::{VariableContext, VariableValue, build_variable_context, build_variable_context_at};
