//! The deferred-rendering task engine.
//!
//! A synchronous parse cannot await a highlighter or a typesetter, so every
//! embedded fragment is registered here as a task and stands in for itself as
//! an opaque placeholder token. Once the surrounding document text exists,
//! [`TaskEngine::render_all`] executes the whole batch: live tasks are
//! grouped by content-addressed cache key, each unique group renders exactly
//! once, all groups run concurrently, and results land in the shared
//! [`ReplacementMap`] under their placeholders.

pub(crate) mod highlight;
pub(crate) mod math;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::cache::{Cache, keys};
use crate::error::RenderError;

/// Fixed prefix of every placeholder token. The full token is the prefix plus
/// a UUID v4 in simple form: fixed length, alphabet `[a-z0-9-]`, never a
/// substring of another token.
pub(crate) const PLACEHOLDER_PREFIX: &str = "deferred-fragment-";

fn mint_placeholder() -> String {
    format!("{PLACEHOLDER_PREFIX}{}", Uuid::new_v4().simple())
}

/// One concrete renderer kind (highlighting, math typesetting).
///
/// The engine owns batching, caching, dedup and pruning; a kind contributes
/// the actual rendering call, the escape fallback, the generic
/// post-processing, and its cache policy.
#[async_trait]
pub(crate) trait RenderKind: Send + Sync {
    type Payload: Serialize + Send + Sync;

    /// Kind tag embedded in every cache key.
    const KIND: &'static str;

    /// Fingerprint of the kind-level options folded into every task key.
    fn cache_seed(&self) -> serde_json::Value;

    fn cacheable(&self, _payload: &Self::Payload) -> bool {
        true
    }

    async fn render(&self, payload: &Self::Payload) -> Result<String, RenderError>;

    /// Safe rendering of the raw input, used when `render` fails or returns
    /// nothing.
    fn fallback(&self, payload: &Self::Payload) -> String;

    fn post_process(&self, _payload: &Self::Payload, html: String) -> String {
        html
    }
}

/// Placeholder → rendered HTML, shared by every engine participating in one
/// document render. Writes are partitioned by placeholder, which is unique
/// per task, so no entry is ever written twice.
#[derive(Default)]
pub(crate) struct ReplacementMap {
    entries: DashMap<String, String>,
}

impl ReplacementMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, placeholder: String, html: String) {
        self.entries.insert(placeholder, html);
    }

    /// Substitute the first literal occurrence of every recorded placeholder.
    /// Order-independent: placeholders are globally unique within the
    /// document and carry one pending replacement each.
    pub(crate) fn apply(&self, html: String) -> String {
        self.entries
            .iter()
            .fold(html, |acc, entry| acc.replacen(entry.key().as_str(), entry.value(), 1))
    }
}

struct PendingTask<P> {
    placeholder: String,
    payload: P,
}

struct TaskGroup<P> {
    key: String,
    payload: P,
    placeholders: Vec<String>,
}

/// Batch of deferred render tasks for one renderer kind.
///
/// Single-use: the batch grows through [`register`](Self::register) and is
/// sealed and executed exactly once by [`render_all`](Self::render_all),
/// which consumes the engine.
pub(crate) struct TaskEngine<K: RenderKind> {
    kind: K,
    cache: Option<Arc<dyn Cache>>,
    replacements: Arc<ReplacementMap>,
    tasks: Vec<PendingTask<K::Payload>>,
}

impl<K: RenderKind> TaskEngine<K> {
    pub(crate) fn new(
        kind: K,
        cache: Option<Arc<dyn Cache>>,
        replacements: Arc<ReplacementMap>,
    ) -> Self {
        Self {
            kind,
            cache,
            replacements,
            tasks: Vec::new(),
        }
    }

    /// Append a task and return its freshly minted placeholder. No rendering
    /// happens here; the call is synchronous and cheap.
    pub(crate) fn register(&mut self, payload: K::Payload) -> String {
        let placeholder = mint_placeholder();
        self.tasks.push(PendingTask {
            placeholder: placeholder.clone(),
            payload,
        });
        placeholder
    }

    /// Render every task whose placeholder is still live, concurrently.
    ///
    /// Tasks with identical cache keys are grouped and rendered once; tasks
    /// for which `is_unused` returns true are skipped without a cache lookup,
    /// a render call, or a map entry. Every group settles before this
    /// returns, including ones that fail internally.
    pub(crate) async fn render_all<F>(self, is_unused: F)
    where
        F: Fn(&str) -> bool,
    {
        let Self {
            kind,
            cache,
            replacements,
            tasks,
        } = self;

        let seed = kind.cache_seed();
        let mut groups: Vec<TaskGroup<K::Payload>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for task in tasks {
            if is_unused(&task.placeholder) {
                continue;
            }
            let key = keys::task_key(K::KIND, &seed, &task.payload);
            match index.get(&key) {
                Some(&at) => groups[at].placeholders.push(task.placeholder),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(TaskGroup {
                        key,
                        payload: task.payload,
                        placeholders: vec![task.placeholder],
                    });
                }
            }
        }

        let kind = &kind;
        let cache = cache.as_deref();
        let replacements = replacements.as_ref();

        future::join_all(groups.into_iter().map(|group| async move {
            let html = render_one(kind, cache, &group.key, &group.payload).await;
            for placeholder in group.placeholders {
                replacements.insert(placeholder, html.clone());
            }
        }))
        .await;
    }
}

/// Execute one unit of rendering work: cache lookup, render call with escape
/// fallback, kind post-processing, cache write-back.
///
/// Cache transport errors degrade to misses or dropped writes; an individual
/// render failure never escapes this function.
pub(crate) async fn render_one<K: RenderKind>(
    kind: &K,
    cache: Option<&dyn Cache>,
    key: &str,
    payload: &K::Payload,
) -> String {
    if let Some(cache) = cache {
        match cache.get(key).await {
            Ok(Some(cached)) => return cached,
            Ok(None) => {}
            Err(err) => {
                warn!(
                    target = "respiro::task",
                    key, "cache read failed, treating as miss: {err}"
                );
            }
        }
    }

    let rendered = match kind.render(payload).await {
        Ok(html) if !html.is_empty() => html,
        Ok(_) => {
            warn!(
                target = "respiro::task",
                kind = K::KIND,
                "renderer produced empty output, using fallback"
            );
            kind.fallback(payload)
        }
        Err(err) => {
            warn!(
                target = "respiro::task",
                kind = K::KIND,
                "render failed, using fallback: {err}"
            );
            kind.fallback(payload)
        }
    };

    let html = kind.post_process(payload, rendered);

    if let Some(cache) = cache {
        if kind.cacheable(payload) {
            if let Err(err) = cache.set(key, html.clone()).await {
                warn!(target = "respiro::task", key, "cache write failed: {err}");
            }
        }
    }

    html
}
