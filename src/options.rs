//! Render options and their mapping onto the markdown parser.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use comrak::options::Options;
use futures::future::BoxFuture;
use serde::{Serialize, Serializer};

use crate::error::RenderError;

/// Options for one document render.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderOptions {
    pub markdown: MarkdownOptions,
    pub highlight: HighlightOptions,
    pub math: MathOptions,
}

impl RenderOptions {
    /// Deterministic JSON snapshot of the options, used as part of cache
    /// keys. A custom highlighter is recorded only as `"custom"`; see
    /// [`Highlighter`].
    pub(crate) fn fingerprint(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("render options serialize to JSON")
    }
}

/// Markdown grammar options passed through to comrak.
#[derive(Debug, Clone, Serialize)]
pub struct MarkdownOptions {
    /// Pass raw HTML in the source through to the output. When disabled, raw
    /// HTML is entity-escaped rather than dropped.
    pub raw_html: bool,
    /// Render soft line breaks as `<br />`.
    pub hardbreaks: bool,
    /// Autodetect bare links.
    pub autolink: bool,
    /// GFM tables.
    pub tables: bool,
    /// GFM strikethrough.
    pub strikethrough: bool,
    /// `$…$` / `$$…$$` math spans. Disabling this leaves dollar signs as
    /// ordinary text and the math renderer idle.
    pub math: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            raw_html: true,
            hardbreaks: false,
            autolink: true,
            tables: true,
            strikethrough: true,
            math: true,
        }
    }
}

pub(crate) fn comrak_options(markdown: &MarkdownOptions) -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.table = markdown.tables;
    ext.strikethrough = markdown.strikethrough;
    ext.autolink = markdown.autolink;
    ext.math_dollars = markdown.math;
    ext.math_code = markdown.math;

    // Placeholders are emitted as raw HTML nodes. `escape` keeps user HTML
    // inert without dropping those nodes, so it stands in for unsafe=false.
    let render = &mut options.render;
    render.hardbreaks = markdown.hardbreaks;
    render.r#unsafe = true;
    render.escape = !markdown.raw_html;

    options
}

/// Future returned by a custom highlighter.
pub type HighlightFuture = BoxFuture<'static, Result<String, RenderError>>;

/// Function invoked for a custom highlighter override: `(code, normalized
/// language) -> HTML fragment`.
pub type HighlightFn = dyn Fn(String, String) -> HighlightFuture + Send + Sync;

/// Which highlighting implementation to invoke for a code block.
///
/// Cache keys record only whether a custom highlighter is installed, not its
/// identity. Swapping one custom highlighter for another against a warm
/// persistent cache can serve results produced by the previous one; clear the
/// cache when doing so.
#[derive(Clone, Default)]
pub enum Highlighter {
    /// Syntect, classed HTML output.
    #[default]
    Default,
    /// Caller-supplied function; may be async.
    Custom(Arc<HighlightFn>),
}

impl Highlighter {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(String, String) -> HighlightFuture + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }
}

impl fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Serialize for Highlighter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            Self::Default => "default",
            Self::Custom(_) => "custom",
        })
    }
}

/// Options for the highlight task renderer.
#[derive(Debug, Clone, Serialize)]
pub struct HighlightOptions {
    /// Strings wrapped around every highlighted fragment.
    pub wrapper: (String, String),
    /// Expand literal tab characters to this many spaces.
    pub expand_tab: Option<u8>,
    /// Highlighting implementation.
    pub highlighter: Highlighter,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            wrapper: ("<pre><code>".to_string(), "</code></pre>".to_string()),
            expand_tab: None,
            highlighter: Highlighter::Default,
        }
    }
}

/// Options passed through to KaTeX.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MathOptions {
    /// Custom macro definitions, e.g. `\RR` → `\mathbb{R}`.
    pub macros: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let options = RenderOptions::default();
        assert_eq!(options.fingerprint(), options.fingerprint());
    }

    #[test]
    fn fingerprint_distinguishes_custom_highlighter() {
        let default_options = RenderOptions::default();
        let mut custom_options = RenderOptions::default();
        custom_options.highlight.highlighter =
            Highlighter::custom(|code, _| Box::pin(async move { Ok(code) }));

        assert_ne!(
            default_options.fingerprint(),
            custom_options.fingerprint()
        );
    }

    #[test]
    fn raw_html_disabled_escapes_instead_of_dropping() {
        let markdown = MarkdownOptions {
            raw_html: false,
            ..Default::default()
        };
        let options = comrak_options(&markdown);
        assert!(options.render.escape);
        assert!(options.render.r#unsafe);
    }
}
