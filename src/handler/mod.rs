//! Request handler module
//!
//! Defines the handler capability shared by scriptlets and static assets,
//! and hosts the resolver that maps request paths onto handlers.
//!
//! A handler is invoked once per request with a mutable [`RequestContext`].
//! It may adjust the status and headers, then hands back a [`ChunkStream`]:
//! a lazy, finite, single-pass stream of chunks that the dispatcher forwards
//! to the client as they are produced. Synchronous producers wrap their
//! output with the helpers in [`chunks`].

pub mod builtin;
pub mod chunks;
pub mod context;
pub mod loader;
pub mod resolver;
pub mod static_files;
#[cfg(test)]
pub(crate) mod testing;

use crate::error::HandlerError;
use futures_util::future::{self, BoxFuture, FutureExt};
use futures_util::stream::BoxStream;
use hyper::body::Bytes;
use std::sync::Arc;

pub use context::RequestContext;
pub use loader::{ManifestLoader, ModuleLoader, Scriptlet, ScriptletRegistry};
pub use resolver::{HandlerResolver, MountKind, MountPoint};
pub use static_files::StaticAssetHandler;

/// One piece of a response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Bytes(Bytes),
    Text(String),
}

impl Chunk {
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Bytes(b) => b,
            Self::Text(s) => Bytes::from(s),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(b) => b.len(),
            Self::Text(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Chunk {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Bytes> for Chunk {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(v))
    }
}

/// Response body produced by a handler
pub type ChunkStream = BoxStream<'static, Result<Chunk, HandlerError>>;

/// A resolved unit of request handling logic
pub trait Handler: Send + Sync {
    /// Handle one request
    ///
    /// Status and headers must be set on `ctx` before the returned future
    /// resolves; they are sent ahead of the first chunk.
    fn invoke<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, Result<ChunkStream, HandlerError>>;
}

/// Handler backed by a synchronous closure
pub struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut RequestContext) -> Result<ChunkStream, HandlerError> + Send + Sync,
{
    fn invoke<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, Result<ChunkStream, HandlerError>> {
        future::ready((self.0)(ctx)).boxed()
    }
}

/// Wrap a closure as a shareable handler
///
/// # Examples
/// ```
/// use rootserve::handler::{chunks, handler_fn};
/// let hello = handler_fn(|ctx| {
///     ctx.status(200).header("content-type", &["text/plain"]);
///     Ok(chunks::once("hello"))
/// });
/// # drop(hello);
/// ```
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: Fn(&mut RequestContext) -> Result<ChunkStream, HandlerError> + Send + Sync + 'static,
{
    Arc::new(HandlerFn(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_conversions() {
        assert_eq!(Chunk::from("ok").into_bytes(), Bytes::from_static(b"ok"));
        assert_eq!(Chunk::from(vec![1u8, 2, 3]).len(), 3);
        assert!(Chunk::from(String::new()).is_empty());
        assert_eq!(
            Chunk::from(Bytes::from_static(b"raw")),
            Chunk::Bytes(Bytes::from_static(b"raw"))
        );
    }
}
