//! Shared types, error model, and configuration for WebClip.
//!
//! This crate is the foundation depended on by all other WebClip crates.
//! It provides:
//! - [`WebClipError`]: the unified error type
//! - Domain types ([`ExtractedPage`], [`Template`], [`PropertyDefinition`], [`RenderedProperty`])
//! - Configuration ([`AppConfig`], [`ServerConfig`], [`FetchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FetchConfig, ServerConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{Result, WebClipError};
pub use types::{
    ExtractedPage, PropertyDefinition, PropertyType, RenderedProperty, RenderedValue, Template,
};
