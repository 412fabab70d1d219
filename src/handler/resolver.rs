//! Handler resolution module
//!
//! Maps a request path onto a handler by searching the code roots, then the
//! static roots, in configured order. Loaded scriptlets are cached by their
//! normalized path unless dev mode is on.

use super::{Handler, ModuleLoader, StaticAssetHandler};
use crate::error::ResolveError;
use crate::http::MimeTable;
use crate::logger;
use crate::path::{self, Normalizer};
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    /// Files are scriptlets loaded through the module loader
    Code,
    /// Files are served as they are
    Static,
}

/// A configured root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    path: String,
    kind: MountKind,
    priority: usize,
}

impl MountPoint {
    pub fn new(normalizer: &Normalizer, raw: &str, kind: MountKind, priority: usize) -> Self {
        Self {
            path: normalizer.normalize(raw),
            kind,
            priority,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub const fn kind(&self) -> MountKind {
        self.kind
    }

    /// Position in its list, lower wins
    pub const fn priority(&self) -> usize {
        self.priority
    }
}

/// Resolver inputs taken from configuration
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub roots: Vec<String>,
    pub static_roots: Vec<String>,
    pub index_files: Vec<String>,
    pub static_index_files: Vec<String>,
    pub dev_mode: bool,
    pub not_found_message: Option<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            static_roots: Vec::new(),
            index_files: vec!["index.toml".to_string()],
            static_index_files: vec!["index.html".to_string(), "index.htm".to_string()],
            dev_mode: false,
            not_found_message: None,
        }
    }
}

pub struct HandlerResolver {
    code_roots: Vec<MountPoint>,
    static_roots: Vec<(MountPoint, Arc<StaticAssetHandler>)>,
    index_files: Vec<String>,
    static_index_files: Vec<String>,
    dev_mode: bool,
    not_found_message: Option<String>,
    loader: Arc<dyn ModuleLoader>,
    cache: DashMap<String, Arc<dyn Handler>>,
    // Held across the cache re-check and the load of one key
    loading: DashMap<String, Arc<Mutex<()>>>,
}

impl HandlerResolver {
    pub fn new(
        options: ResolverOptions,
        normalizer: &Normalizer,
        loader: Arc<dyn ModuleLoader>,
        mime: Arc<MimeTable>,
    ) -> Self {
        let code_roots = options
            .roots
            .iter()
            .enumerate()
            .map(|(i, raw)| MountPoint::new(normalizer, raw, MountKind::Code, i))
            .collect();

        let static_roots = options
            .static_roots
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let mount = MountPoint::new(normalizer, raw, MountKind::Static, i);
                let handler = Arc::new(StaticAssetHandler::new(
                    mount.path(),
                    options.static_index_files.clone(),
                    Arc::clone(&mime),
                ));
                (mount, handler)
            })
            .collect();

        Self {
            code_roots,
            static_roots,
            index_files: options.index_files,
            static_index_files: options.static_index_files,
            dev_mode: options.dev_mode,
            not_found_message: options.not_found_message,
            loader,
            cache: DashMap::new(),
            loading: DashMap::new(),
        }
    }

    /// All mount points, code roots first, each list in priority order
    pub fn mounts(&self) -> impl Iterator<Item = &MountPoint> {
        self.code_roots
            .iter()
            .chain(self.static_roots.iter().map(|(mount, _)| mount))
    }

    /// Number of cached keys
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Find the handler for a decoded request path
    pub async fn resolve(&self, request_path: &str) -> Result<Arc<dyn Handler>, ResolveError> {
        for root in &self.code_roots {
            let candidate = path::join_under(root.path(), request_path);
            if let Some(handler) = self.resolve_code(&candidate).await? {
                return Ok(handler);
            }
        }

        for (root, assets) in &self.static_roots {
            let candidate = path::join_under(root.path(), request_path);
            if let Some(handler) = self.resolve_static(&candidate, assets).await {
                return Ok(handler);
            }
        }

        Err(ResolveError::NotFound {
            message: self.not_found(request_path),
        })
    }

    fn not_found(&self, request_path: &str) -> String {
        self.not_found_message.clone().unwrap_or_else(|| {
            format!("Unable to locate handler for \x1b[33m{request_path}\x1b[0m")
        })
    }

    async fn resolve_code(
        &self,
        candidate: &str,
    ) -> Result<Option<Arc<dyn Handler>>, ResolveError> {
        if self.dev_mode {
            return self.load_code(candidate).await;
        }

        if let Some(handler) = self.cached(candidate) {
            return Ok(Some(handler));
        }

        let slot = LoadSlot::claim(&self.loading, candidate);
        let _guard = slot.lock.lock().await;

        // Another task may have finished the load while we waited
        if let Some(handler) = self.cached(candidate) {
            return Ok(Some(handler));
        }

        self.load_code(candidate).await
    }

    async fn load_code(&self, candidate: &str) -> Result<Option<Arc<dyn Handler>>, ResolveError> {
        let Some(file) = locate(candidate, &self.index_files).await else {
            return Ok(None);
        };

        let scriptlet = self
            .loader
            .load(Path::new(&file))
            .await
            .map_err(|source| ResolveError::Load {
                path: file.clone(),
                source,
            })?;

        if scriptlet.cacheable {
            self.remember(candidate, &file, &scriptlet.handler);
        } else {
            logger::log_debug(&format!("Scriptlet opted out of caching: {file}"));
        }
        Ok(Some(scriptlet.handler))
    }

    async fn resolve_static(
        &self,
        candidate: &str,
        assets: &Arc<StaticAssetHandler>,
    ) -> Option<Arc<dyn Handler>> {
        if let Some(cached) = self.cached(candidate) {
            return Some(cached);
        }

        let file = locate(candidate, &self.static_index_files).await?;
        let handler: Arc<dyn Handler> = Arc::clone(assets) as Arc<dyn Handler>;
        self.remember(candidate, &file, &handler);
        Some(handler)
    }

    fn cached(&self, key: &str) -> Option<Arc<dyn Handler>> {
        if self.dev_mode {
            return None;
        }
        let handler = self.cache.get(key).map(|entry| Arc::clone(entry.value()));
        if handler.is_some() {
            logger::log_debug(&format!("Handler cache hit: {key}"));
        }
        handler
    }

    /// Cache under the candidate and, for a coalesced directory, the index file
    fn remember(&self, candidate: &str, file: &str, handler: &Arc<dyn Handler>) {
        if self.dev_mode {
            return;
        }
        self.cache.insert(candidate.to_string(), Arc::clone(handler));
        if file != candidate {
            self.cache.insert(file.to_string(), Arc::clone(handler));
        }
    }
}

/// A claim on the first-load lock of one key
///
/// Dropping the last claim removes the key from the lock table, also when
/// the resolving future is cancelled mid-load.
struct LoadSlot<'a> {
    table: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl<'a> LoadSlot<'a> {
    fn claim(table: &'a DashMap<String, Arc<Mutex<()>>>, key: &str) -> Self {
        let lock = Arc::clone(table.entry(key.to_string()).or_default().value());
        Self {
            table,
            key: key.to_string(),
            lock,
        }
    }
}

impl Drop for LoadSlot<'_> {
    fn drop(&mut self) {
        // The table holds one reference and this claim the other
        self.table.remove_if(&self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}

/// The file that serves `candidate`: itself if a file, else its first index
///
/// Stat failures count as absence.
async fn locate(candidate: &str, index_files: &[String]) -> Option<String> {
    let metadata = tokio::fs::metadata(candidate).await.ok()?;
    if !metadata.is_dir() {
        return Some(candidate.to_string());
    }

    for index in index_files {
        let file = path::join_under(candidate, index);
        match tokio::fs::metadata(&file).await {
            Ok(meta) if !meta.is_dir() => return Some(file),
            _ => {}
        }
    }
    None
}
