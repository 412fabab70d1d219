//! Test helpers shared by the resolver and dispatcher tests

use super::{ManifestLoader, ModuleLoader, RequestContext, Scriptlet};
use crate::error::LoadError;
use futures_util::future::{BoxFuture, FutureExt};
use hyper::Request;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Manifest loader that counts how often it is asked to load
#[derive(Default)]
pub struct CountingLoader {
    inner: ManifestLoader,
    loads: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingLoader {
    /// Hold each load open for `delay` so concurrent callers overlap
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModuleLoader for CountingLoader {
    fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Scriptlet, LoadError>> {
        async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.inner.load(path).await
        }
        .boxed()
    }
}

/// Write a scriptlet manifest, creating parent directories
pub fn write_manifest(path: &Path, manifest: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, manifest).unwrap();
}

/// Manifest for a `text` scriptlet answering `body`
pub fn text_manifest(body: &str) -> String {
    format!("handler = \"text\"\n[params]\nbody = \"{body}\"\n")
}

pub fn context(uri: &str) -> RequestContext {
    let (parts, ()) = Request::builder().uri(uri).body(()).unwrap().into_parts();
    RequestContext::new(parts)
}
