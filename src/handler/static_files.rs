//! Static file serving module
//!
//! Serves files below a static root with MIME detection, long-lived cache
//! headers and `If-Modified-Since` revalidation. Bodies are read lazily in
//! fixed-size chunks.

use super::{chunks, Chunk, ChunkStream, Handler, RequestContext};
use crate::error::HandlerError;
use crate::http::cache::{self, CachePolicy};
use crate::http::MimeTable;
use crate::logger;
use crate::path;
use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};
use std::fs::Metadata;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Handler bound to one static root
///
/// The file served is `base_path` joined with the request path; a directory
/// is coalesced to its first existing index file.
pub struct StaticAssetHandler {
    base_path: String,
    index_files: Vec<String>,
    mime: Arc<MimeTable>,
}

impl StaticAssetHandler {
    /// `base_path` must already be absolute and normalized
    pub fn new(base_path: impl Into<String>, index_files: Vec<String>, mime: Arc<MimeTable>) -> Self {
        Self {
            base_path: base_path.into(),
            index_files,
            mime,
        }
    }

    /// Find the file backing `request_path` and stat it
    async fn locate(&self, request_path: &str) -> Result<(PathBuf, Metadata), HandlerError> {
        let file = PathBuf::from(path::join_under(&self.base_path, request_path));
        let metadata = fs::metadata(&file).await.map_err(|e| {
            HandlerError::NotFound(format!("Static resource unavailable: {request_path} ({e})"))
        })?;

        if metadata.is_file() {
            return Ok((file, metadata));
        }

        if metadata.is_dir() {
            for index in &self.index_files {
                let candidate = file.join(index);
                if let Ok(meta) = fs::metadata(&candidate).await {
                    if meta.is_file() {
                        return Ok((candidate, meta));
                    }
                }
            }
        }

        Err(HandlerError::NotFound(format!(
            "No static resource for {request_path}"
        )))
    }
}

impl Handler for StaticAssetHandler {
    fn invoke<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, Result<ChunkStream, HandlerError>> {
        async move {
            let (file, metadata) = self.locate(ctx.path()).await?;
            let mtime = metadata.modified()?;

            let policy = CachePolicy::default();
            let expires = policy.expires_at(Utc::now()).unwrap_or_default();
            let last_modified = cache::format_http_date(cache::to_http_precision(mtime));
            let not_modified = cache::is_not_modified(mtime, ctx.get_header("if-modified-since"));

            ctx.header("content-type", &[self.mime.for_path(&file)])
                .header("cache-control", &[policy.to_header_value().as_str()])
                .header("expires", &[expires.as_str()])
                .header("last-modified", &[last_modified.as_str()]);

            if not_modified {
                logger::log_debug(&format!("Not modified, client cache is current: {}", ctx.path()));
                ctx.status(304);
                return Ok(chunks::empty());
            }

            logger::log_debug(&format!("Loading static resource: {}", file.display()));
            let handle = File::open(&file).await?;
            ctx.status(200);
            Ok::<_, HandlerError>(read_chunks(handle))
        }
        .boxed()
    }
}

/// Stream a file's contents without reading it all up front
fn read_chunks(file: File) -> ChunkStream {
    stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok::<_, HandlerError>(Some((Chunk::from(buf), file)))
    })
    .boxed()
}
