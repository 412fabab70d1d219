//! Streaming response body
//!
//! Adapts a handler's [`ChunkStream`] to hyper's `Body` trait, one frame
//! per chunk. A completion hook fires exactly once: when the stream ends,
//! when it fails, or when hyper drops the body early (client went away).

use crate::error::HandlerError;
use crate::handler::{chunks, ChunkStream};
use futures_util::Stream;
use hyper::body::{Body, Bytes, Frame};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// How a response body finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyOutcome {
    pub bytes_sent: usize,
    pub state: BodyState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    /// All chunks were delivered
    Complete,
    /// The handler's stream yielded an error
    Failed,
    /// Dropped before the end, e.g. on client disconnect
    Aborted,
}

type CompletionHook = Box<dyn FnOnce(BodyOutcome) + Send>;

pub struct ResponseBody {
    stream: ChunkStream,
    bytes_sent: usize,
    finished: bool,
    on_complete: Option<CompletionHook>,
}

impl ResponseBody {
    pub fn new(stream: ChunkStream) -> Self {
        Self {
            stream,
            bytes_sent: 0,
            finished: false,
            on_complete: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(chunks::empty())
    }

    pub fn text(message: impl Into<String>) -> Self {
        Self::new(chunks::once(message.into()))
    }

    /// Register a hook run once the body is done, whatever the outcome
    #[must_use]
    pub fn on_complete(mut self, hook: impl FnOnce(BodyOutcome) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    fn complete(&mut self, state: BodyState) {
        self.finished = true;
        if let Some(hook) = self.on_complete.take() {
            hook(BodyOutcome {
                bytes_sent: self.bytes_sent,
                state,
            });
        }
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = HandlerError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    // Empty frames would look like end-of-body to some clients
                    if chunk.is_empty() {
                        continue;
                    }
                    let data = chunk.into_bytes();
                    this.bytes_sent += data.len();
                    return Poll::Ready(Some(Ok(Frame::data(data))));
                }
                Poll::Ready(Some(Err(err))) => {
                    this.complete(BodyState::Failed);
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    this.complete(BodyState::Complete);
                    return Poll::Ready(None);
                }
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.finished
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        if !self.finished {
            self.complete(BodyState::Aborted);
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("bytes_sent", &self.bytes_sent)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
