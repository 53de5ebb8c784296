//! Content cache contract and the shipped in-memory implementation.
//!
//! The pipeline consumes any async key→value store through [`Cache`]. Keys
//! are content-addressed and versioned (see `keys`), so a persistent backend
//! shared between processes, or between unrelated document renders, stays
//! coherent without coordination.

pub(crate) mod keys;
mod memory;

use async_trait::async_trait;

use crate::error::CacheError;

pub use memory::MemoryCache;

/// Async key→value store consumed by the rendering pipeline.
///
/// No semantics beyond `get` and `set` are assumed. Implementations must
/// tolerate concurrent calls from unrelated document renders. Transport
/// errors are degraded to misses by the pipeline, never surfaced.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
}
