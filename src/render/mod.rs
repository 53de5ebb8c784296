//! Document orchestrator.
//!
//! Drives one document render: whole-document cache probe, synchronous parse
//! and placeholder rewrite, serialization, caller filter, concurrent batch
//! rendering of both task engines, placeholder substitution, cache
//! write-back.

mod rewrite;

use std::sync::Arc;

use comrak::{Arena, format_html, parse_document};
use tracing::warn;

use crate::cache::{Cache, keys};
use crate::error::RenderError;
use crate::options::{RenderOptions, comrak_options};
use crate::task::highlight::HighlightKind;
use crate::task::math::MathKind;
use crate::task::{ReplacementMap, TaskEngine};

/// Renders markdown documents to HTML, optionally backed by a [`Cache`].
///
/// The renderer is cheap to construct; one instance can serve any number of
/// documents. The expensive collaborators (the syntax set) are shared
/// process-wide.
pub struct DocumentRenderer {
    options: RenderOptions,
    cache: Option<Arc<dyn Cache>>,
}

impl DocumentRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            cache: None,
        }
    }

    /// Attach a content cache. Both per-fragment results and whole rendered
    /// documents are stored under content-addressed keys.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Render one markdown document to HTML.
    ///
    /// Individual fragment failures are recovered with escaped fallbacks;
    /// the only propagating failure is a serialization error from the
    /// markdown collaborator.
    pub async fn render(&self, input: &str) -> Result<String, RenderError> {
        self.render_inner(input, None::<fn(String) -> String>).await
    }

    /// Render with a caller-supplied filter applied to the serialized HTML
    /// before deferred fragments are rendered.
    ///
    /// The filter may delete or alter emitted placeholders; tasks whose
    /// placeholder no longer appears in the filtered text are skipped
    /// entirely, which is why liveness is evaluated after this step and not
    /// before.
    pub async fn render_with_filter<F>(&self, input: &str, filter: F) -> Result<String, RenderError>
    where
        F: FnOnce(String) -> String,
    {
        self.render_inner(input, Some(filter)).await
    }

    async fn render_inner<F>(&self, input: &str, filter: Option<F>) -> Result<String, RenderError>
    where
        F: FnOnce(String) -> String,
    {
        let document_key = self
            .cache
            .as_ref()
            .map(|_| keys::document_key(input, &self.options.fingerprint()));

        if let (Some(cache), Some(key)) = (self.cache.as_deref(), document_key.as_deref()) {
            match cache.get(key).await {
                Ok(Some(html)) => return Ok(html),
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        target = "respiro::render",
                        "document cache read failed, treating as miss: {err}"
                    );
                }
            }
        }

        let replacements = Arc::new(ReplacementMap::new());
        let mut highlight = TaskEngine::new(
            HighlightKind::new(self.options.highlight.clone()),
            self.cache.clone(),
            Arc::clone(&replacements),
        );
        let mut math = TaskEngine::new(
            MathKind::new(self.options.math.clone()),
            self.cache.clone(),
            Arc::clone(&replacements),
        );

        let comrak = comrak_options(&self.options.markdown);
        let arena = Arena::new();
        let root = parse_document(&arena, input, &comrak);
        rewrite::defer_fragments(root, &mut highlight, &mut math);

        let mut html = String::new();
        format_html(root, &comrak, &mut html)
            .map_err(|err| RenderError::markdown(err.to_string()))?;

        if let Some(filter) = filter {
            html = filter(html);
        }

        {
            let is_unused = |placeholder: &str| !html.contains(placeholder);
            tokio::join!(
                highlight.render_all(&is_unused),
                math.render_all(&is_unused)
            );
        }

        let html = replacements.apply(html);

        if let (Some(cache), Some(key)) = (self.cache.as_deref(), document_key.as_deref()) {
            if let Err(err) = cache.set(key, html.clone()).await {
                warn!(
                    target = "respiro::render",
                    "document cache write failed: {err}"
                );
            }
        }

        Ok(html)
    }
}

/// Render one document with no cache attached.
pub async fn render(input: &str, options: RenderOptions) -> Result<String, RenderError> {
    DocumentRenderer::new(options).render(input).await
}
