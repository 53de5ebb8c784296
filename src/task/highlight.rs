//! Syntax-highlight task renderer.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Serialize;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::cache::{Cache, keys};
use crate::error::RenderError;
use crate::options::{HighlightOptions, Highlighter};

use super::{RenderKind, render_one};

/// Sentinel language for pass-through text: rendered as escaped literal code,
/// never cached.
pub(crate) const PLAIN_LANGUAGE: &str = "plain";

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Fence-label aliases, applied after lowercasing. Unknown labels pass
/// through unchanged.
const LANGUAGE_ALIASES: [(&str, &str); 12] = [
    ("c++", "cpp"),
    ("js", "javascript"),
    ("python", "py"),
    ("rb", "ruby"),
    ("sh", "bash"),
    ("c#", "csharp"),
    ("cs", "csharp"),
    ("ts", "typescript"),
    ("md", "markdown"),
    ("plaintext", PLAIN_LANGUAGE),
    ("text", PLAIN_LANGUAGE),
    ("txt", PLAIN_LANGUAGE),
];

pub(crate) fn normalize_language(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return PLAIN_LANGUAGE.to_string();
    }
    for (alias, canonical) in LANGUAGE_ALIASES {
        if lower == alias {
            return canonical.to_string();
        }
    }
    lower
}

/// One deferred highlight request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct HighlightTask {
    pub(crate) code: String,
    pub(crate) language: String,
}

impl HighlightTask {
    /// The language is normalized here, before the task enters a batch, so
    /// hashing and rendering both see the canonical name.
    pub(crate) fn new(code: impl Into<String>, language: Option<&str>) -> Self {
        Self {
            code: code.into(),
            language: normalize_language(language.unwrap_or_default()),
        }
    }
}

pub(crate) struct HighlightKind {
    options: HighlightOptions,
}

impl HighlightKind {
    pub(crate) fn new(options: HighlightOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl RenderKind for HighlightKind {
    type Payload = HighlightTask;

    const KIND: &'static str = "highlight";

    fn cache_seed(&self) -> serde_json::Value {
        serde_json::to_value(&self.options).expect("highlight options serialize to JSON")
    }

    fn cacheable(&self, payload: &HighlightTask) -> bool {
        payload.language != PLAIN_LANGUAGE
    }

    async fn render(&self, payload: &HighlightTask) -> Result<String, RenderError> {
        match &self.options.highlighter {
            Highlighter::Custom(highlighter) => {
                highlighter(payload.code.clone(), payload.language.clone()).await
            }
            Highlighter::Default => highlight_html(&payload.code, &payload.language),
        }
    }

    fn fallback(&self, payload: &HighlightTask) -> String {
        html_escape::encode_text(&payload.code).into_owned()
    }

    fn post_process(&self, _payload: &HighlightTask, html: String) -> String {
        let (open, close) = &self.options.wrapper;
        let wrapped = format!("{open}{html}{close}");
        match self.options.expand_tab {
            Some(width) if width > 0 => wrapped.replace('\t', &" ".repeat(usize::from(width))),
            _ => wrapped,
        }
    }
}

/// Default highlighter: classed syntect HTML keyed by the normalized
/// language, plain-text grammar when the language is unknown.
fn highlight_html(code: &str, language: &str) -> Result<String, RenderError> {
    if language == PLAIN_LANGUAGE {
        return Ok(html_escape::encode_text(code).into_owned());
    }

    let syntax_set = &*SYNTAX_SET;
    let syntax =
        find_syntax(syntax_set, language).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, CLASS_STYLE);
    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::highlight(language, err.to_string()))?;
    }

    Ok(generator.finalize())
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    syntax_set
        .find_syntax_by_token(token)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(token))
}

/// One-shot highlight outside a document render, sharing cache entries with
/// batched rendering. Failures degrade to escaped code; this never errors.
pub async fn highlight(
    code: &str,
    language: Option<&str>,
    cache: Option<&dyn Cache>,
    options: &HighlightOptions,
) -> String {
    let kind = HighlightKind::new(options.clone());
    let task = HighlightTask::new(code, language);
    let key = keys::task_key(HighlightKind::KIND, &kind.cache_seed(), &task);
    render_one(&kind, cache, &key, &task).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn languages_are_lowercased_and_aliased() {
        assert_eq!(normalize_language("JS"), "javascript");
        assert_eq!(normalize_language("c++"), "cpp");
        assert_eq!(normalize_language("TXT"), "plain");
        assert_eq!(normalize_language("rust"), "rust");
        assert_eq!(normalize_language(""), "plain");
        assert_eq!(normalize_language("zig"), "zig");
    }

    #[test]
    fn plain_tasks_are_not_cacheable() {
        let kind = HighlightKind::new(HighlightOptions::default());
        assert!(!kind.cacheable(&HighlightTask::new("hello", Some("text"))));
        assert!(kind.cacheable(&HighlightTask::new("fn main() {}", Some("rust"))));
    }

    #[test]
    fn default_highlighter_emits_classed_spans() {
        let html = highlight_html("let x = 1;", "rust").unwrap();
        assert!(html.contains("hl-"));
        assert!(html.contains("let"));
    }

    #[test]
    fn plain_language_renders_as_escaped_text() {
        let html = highlight_html("<b>raw</b>", PLAIN_LANGUAGE).unwrap();
        assert_eq!(html, "&lt;b&gt;raw&lt;/b&gt;");
    }

    #[test]
    fn post_process_wraps_then_expands_tabs() {
        let options = HighlightOptions {
            wrapper: ("[".to_string(), "]".to_string()),
            expand_tab: Some(2),
            highlighter: Highlighter::Default,
        };
        let kind = HighlightKind::new(options);
        let task = HighlightTask::new("a\tb", Some("text"));

        assert_eq!(kind.post_process(&task, "a\tb".to_string()), "[a  b]");
    }

    #[test]
    fn fallback_escapes_the_raw_code() {
        let kind = HighlightKind::new(HighlightOptions::default());
        let task = HighlightTask::new("<b>", Some("js"));
        assert_eq!(kind.fallback(&task), "&lt;b&gt;");
    }

    #[tokio::test]
    async fn one_shot_highlight_uses_the_cache() {
        use crate::cache::MemoryCache;

        let cache = MemoryCache::new();
        let options = HighlightOptions::default();

        let first = highlight("let x = 1;", Some("rust"), Some(&cache), &options).await;
        assert_eq!(cache.len().await, 1);

        let second = highlight("let x = 1;", Some("rust"), Some(&cache), &options).await;
        assert_eq!(first, second);
        assert_eq!(cache.len().await, 1);
    }
}
