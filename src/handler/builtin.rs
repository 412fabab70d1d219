//! Built-in scriptlet handlers
//!
//! - `text`: fixed body with optional `status` and `content_type`
//! - `echo`: request line and inbound headers, one per line
//! - `listing`: sorted entries of the scriptlet's own directory
//! - `redirect`: `target` with optional `code` (default 302)

use super::loader::{ScriptletRegistry, ScriptletSource};
use super::{chunks, handler_fn, ChunkStream, Handler, RequestContext};
use crate::error::{HandlerError, LoadError};
use futures_util::future::{BoxFuture, FutureExt};
use std::path::PathBuf;
use std::sync::Arc;

pub fn register(registry: &mut ScriptletRegistry) {
    registry
        .register("text", text)
        .register("echo", echo)
        .register("listing", listing)
        .register("redirect", redirect);
}

fn text(source: &ScriptletSource<'_>) -> Result<Arc<dyn Handler>, LoadError> {
    let body = source.str_param("body")?.unwrap_or_default().to_string();
    let content_type = source
        .str_param("content_type")?
        .unwrap_or("text/plain")
        .to_string();
    let status = source.u16_param("status")?.unwrap_or(200);
    if hyper::StatusCode::from_u16(status).is_err() {
        return Err(source.invalid(&format!("invalid status {status}")));
    }

    Ok(handler_fn(move |ctx| {
        ctx.status(status).header("content-type", &[content_type.as_str()]);
        Ok(chunks::once(body.clone()))
    }))
}

#[allow(clippy::unnecessary_wraps)]
fn echo(_source: &ScriptletSource<'_>) -> Result<Arc<dyn Handler>, LoadError> {
    Ok(handler_fn(|ctx| {
        let mut lines = vec![format!("{} {}\n", ctx.method(), ctx.uri())];
        for (name, value) in &ctx.request().headers {
            lines.push(format!("{name}: {}\n", String::from_utf8_lossy(value.as_bytes())));
        }
        ctx.status(200).header("content-type", &["text/plain; charset=utf-8"]);
        Ok(chunks::iter(lines))
    }))
}

fn listing(source: &ScriptletSource<'_>) -> Result<Arc<dyn Handler>, LoadError> {
    let dir = source
        .path
        .parent()
        .ok_or_else(|| source.invalid("scriptlet has no parent directory"))?
        .to_path_buf();
    Ok(Arc::new(DirectoryListing { dir }))
}

/// Streams the names in a directory, read on every request
struct DirectoryListing {
    dir: PathBuf,
}

impl Handler for DirectoryListing {
    fn invoke<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, Result<ChunkStream, HandlerError>> {
        async move {
            let mut entries = tokio::fs::read_dir(&self.dir).await?;
            let mut names = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                names.push(format!("{}\n", entry.file_name().to_string_lossy()));
            }
            names.sort();

            ctx.status(200).header("content-type", &["text/plain; charset=utf-8"]);
            Ok::<_, HandlerError>(chunks::iter(names))
        }
        .boxed()
    }
}

fn redirect(source: &ScriptletSource<'_>) -> Result<Arc<dyn Handler>, LoadError> {
    let target = source
        .str_param("target")?
        .ok_or_else(|| source.invalid("'target' is required"))?
        .to_string();
    let code = source.u16_param("code")?.unwrap_or(302);
    if !(300..400).contains(&code) {
        return Err(source.invalid(&format!("{code} is not a redirect status")));
    }

    Ok(handler_fn(move |ctx| {
        ctx.status(code).header("location", &[target.as_str()]);
        Ok(chunks::empty())
    }))
}
