use thiserror::Error;

/// Structured errors surfaced by the rendering pipeline.
///
/// Individual fragment failures (a highlighter or typesetter rejecting its
/// input) are recovered internally with an escaped fallback and never reach
/// the caller; only document-level failures propagate.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown serialization failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlight { language: String, message: String },
    #[error("math typesetting failed: {message}")]
    Math { message: String },
}

impl RenderError {
    pub fn markdown(message: impl Into<String>) -> Self {
        Self::Markdown {
            message: message.into(),
        }
    }

    pub fn highlight(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Highlight {
            language: language.into(),
            message: message.into(),
        }
    }

    pub fn math(message: impl Into<String>) -> Self {
        Self::Math {
            message: message.into(),
        }
    }
}

/// Transport failure reported by a [`Cache`](crate::cache::Cache)
/// implementation.
///
/// The pipeline degrades these to cache misses rather than failing the
/// document render; they are logged and otherwise swallowed.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {message}")]
    Unavailable { message: String },
    #[error("cache operation failed: {message}")]
    Operation { message: String },
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
        }
    }
}
