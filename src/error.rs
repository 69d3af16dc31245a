//! Structured error types for the proforma engine.
//!
//! `Config` and `Layout` abort document generation. `ImageFetch` is produced
//! by resolvers and swallowed by the layout engine, which substitutes a
//! placeholder and keeps going.

use thiserror::Error;

/// The unified error type returned by all public proforma API functions.
#[derive(Debug, Error)]
pub enum ProformaError {
    /// The column schema or layout configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// An image could not be retrieved or decoded.
    #[error("Image error: could not load '{src}': {reason}")]
    ImageFetch { src: String, reason: String },

    /// A single row cannot fit even on an empty page.
    #[error("Layout error: {0}")]
    Layout(String),

    /// Order JSON failed to parse.
    #[error("Failed to parse order: {source}{}", render_hint(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// A cart operation was rejected (duplicate code, bad index).
    #[error("Cart error: {0}")]
    Cart(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn render_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl ProformaError {
    pub(crate) fn image(src: &str, reason: impl Into<String>) -> Self {
        ProformaError::ImageFetch {
            src: abbreviate_src(src),
            reason: reason.into(),
        }
    }
}

/// Data URIs can be megabytes long; keep error messages readable.
fn abbreviate_src(src: &str) -> String {
    const MAX: usize = 64;
    if src.chars().count() <= MAX {
        src.to_string()
    } else {
        let head: String = src.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

impl From<serde_json::Error> for ProformaError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the order schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        ProformaError::Parse { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_hint() {
        let err: ProformaError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse order"));
        assert!(msg.contains("Hint: Check for trailing commas"));
    }

    #[test]
    fn long_image_sources_are_abbreviated() {
        let src = format!("data:image/png;base64,{}", "A".repeat(500));
        let err = ProformaError::image(&src, "bad data");
        let msg = err.to_string();
        assert!(msg.len() < 200, "message too long: {}", msg.len());
        assert!(msg.contains("..."));
        assert!(msg.ends_with("bad data"));
    }
}
