//! Respiro renders markdown containing embedded math expressions and fenced
//! code blocks into HTML. The markdown parse is synchronous; math typesetting
//! and syntax highlighting are potentially slow and run as a deferred,
//! cache-backed batch.
//!
//! While the document is parsed, every embedded fragment is replaced by an
//! opaque placeholder token and recorded as a render task. Once the
//! surrounding HTML exists, all tasks render concurrently, deduplicated by a
//! content-addressed cache key and skipped entirely when a post-parse filter
//! removed their placeholder, and the results are spliced back in by literal
//! token replacement. A fragment that fails to render degrades to escaped
//! literal text; a document render only fails on parser-level errors.
//!
//! ```
//! use respiro::{RenderOptions, render};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), respiro::RenderError> {
//! let html = render("# Title\n\n```js\nconst x = 1;\n```\n\n$x+1$", RenderOptions::default()).await?;
//! assert!(html.contains("<h1>Title</h1>"));
//! # Ok(())
//! # }
//! ```
//!
//! Caching is optional: attach anything implementing [`Cache`], such as the
//! shipped [`MemoryCache`] or a persistent store, and both individual
//! fragments and whole documents are reused across renders and processes.
//!
//! ```
//! use std::sync::Arc;
//! use respiro::{DocumentRenderer, MemoryCache, RenderOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), respiro::RenderError> {
//! let renderer = DocumentRenderer::new(RenderOptions::default())
//!     .with_cache(Arc::new(MemoryCache::new()));
//! let html = renderer.render("Euler: $e^{i\\pi} + 1 = 0$").await?;
//! assert!(html.contains("katex"));
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod error;
mod options;
mod render;
mod task;

pub use cache::{Cache, MemoryCache};
pub use error::{CacheError, RenderError};
pub use options::{
    HighlightFn, HighlightFuture, HighlightOptions, Highlighter, MarkdownOptions, MathOptions,
    RenderOptions,
};
pub use render::{DocumentRenderer, render};
pub use task::highlight::highlight;
pub use task::math::typeset;
