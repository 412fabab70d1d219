//! Constructors for [`ChunkStream`] values
//!
//! Every handler returns the same stream shape. Output that is already
//! available up front is converted here instead of each handler building
//! its own stream.

use super::{Chunk, ChunkStream};
use crate::error::HandlerError;
use futures_util::stream::{self, StreamExt};

/// A body with no chunks
pub fn empty() -> ChunkStream {
    stream::empty().boxed()
}

/// A body made of a single chunk
pub fn once(chunk: impl Into<Chunk>) -> ChunkStream {
    stream::once(std::future::ready(Ok::<_, HandlerError>(chunk.into()))).boxed()
}

/// A body yielding each item of `items` in order
pub fn iter<I, C>(items: I) -> ChunkStream
where
    I: IntoIterator<Item = C>,
    I::IntoIter: Send + 'static,
    C: Into<Chunk> + 'static,
{
    stream::iter(items.into_iter().map(ok_chunk::<C>)).boxed()
}

fn ok_chunk<C: Into<Chunk>>(item: C) -> Result<Chunk, HandlerError> {
    Ok(item.into())
}
