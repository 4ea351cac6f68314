//! Error types for WebClip.
//!
//! Library crates use [`WebClipError`] via `thiserror`.
//! The `webclip` binary wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all WebClip operations.
#[derive(Debug, thiserror::Error)]
pub enum WebClipError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The requested URL was rejected before any network traffic.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport failure or non-success HTTP status while fetching a page.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// HTML parsing or metadata extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// The template renderer failed on a property value or body expression.
    #[error("render error: {message}")]
    Render { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WebClipError>;

impl WebClipError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an invalid-URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a render error from any displayable message.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = WebClipError::config("missing port");
        assert_eq!(err.to_string(), "config error: missing port");

        let err = WebClipError::render("unknown filter `slugify`");
        assert!(err.to_string().starts_with("render error:"));
        assert!(err.to_string().contains("slugify"));

        let err = WebClipError::parse("cannot extract a page from content type 'image/png'");
        assert!(err.to_string().starts_with("parse error:"));

        let err = WebClipError::invalid_url("ftp://example.com", "unsupported scheme");
        assert_eq!(
            err.to_string(),
            "invalid URL 'ftp://example.com': unsupported scheme"
        );
    }
}
