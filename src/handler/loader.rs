//! Scriptlet loading module
//!
//! A scriptlet is a file under a code root that declares which compiled-in
//! handler serves it. Loading is behind the [`ModuleLoader`] trait so the
//! resolver does not care how a file turns into a handler.
//!
//! The default [`ManifestLoader`] reads TOML manifests:
//!
//! ```toml
//! handler = "text"      # name registered in the ScriptletRegistry
//! cacheable = true      # optional, defaults to true
//!
//! [params]              # handed to the handler factory
//! body = "ok"
//! ```

use super::{builtin, Handler};
use crate::error::LoadError;
use crate::logger;
use futures_util::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A loaded scriptlet: its handler and whether the resolver may keep it
#[derive(Clone)]
pub struct Scriptlet {
    pub handler: Arc<dyn Handler>,
    pub cacheable: bool,
}

/// Turns a file found under a code root into a [`Scriptlet`]
pub trait ModuleLoader: Send + Sync {
    fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Scriptlet, LoadError>>;
}

#[derive(Debug, Deserialize)]
struct ScriptletManifest {
    handler: String,
    #[serde(default = "default_cacheable")]
    cacheable: bool,
    #[serde(default)]
    params: toml::Table,
}

#[allow(clippy::missing_const_for_fn)]
fn default_cacheable() -> bool {
    true
}

/// What a handler factory gets to build its handler from
pub struct ScriptletSource<'a> {
    /// Manifest file path
    pub path: &'a Path,
    /// Registry name the manifest asked for
    pub handler: &'a str,
    pub params: &'a toml::Table,
}

impl ScriptletSource<'_> {
    pub fn str_param(&self, key: &str) -> Result<Option<&str>, LoadError> {
        match self.params.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.invalid(&format!("'{key}' must be a string"))),
        }
    }

    pub fn u16_param(&self, key: &str) -> Result<Option<u16>, LoadError> {
        match self.params.get(key) {
            None => Ok(None),
            Some(toml::Value::Integer(n)) => u16::try_from(*n)
                .map(Some)
                .map_err(|_| self.invalid(&format!("'{key}' is out of range"))),
            Some(_) => Err(self.invalid(&format!("'{key}' must be an integer"))),
        }
    }

    pub fn invalid(&self, reason: &str) -> LoadError {
        LoadError::InvalidParams {
            handler: self.handler.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Builds a handler from a manifest
pub type ScriptletFactory =
    dyn Fn(&ScriptletSource<'_>) -> Result<Arc<dyn Handler>, LoadError> + Send + Sync;

/// Compiled-in handler factories, keyed by the name manifests refer to
#[derive(Default)]
pub struct ScriptletRegistry {
    factories: HashMap<String, Arc<ScriptletFactory>>,
}

impl ScriptletRegistry {
    /// Registry with no factories
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the `text`, `echo`, `listing` and `redirect` handlers
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register(&mut registry);
        registry
    }

    /// Register (or replace) a factory under `name`
    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&ScriptletSource<'_>) -> Result<Arc<dyn Handler>, LoadError> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn build(&self, source: &ScriptletSource<'_>) -> Result<Arc<dyn Handler>, LoadError> {
        let factory = self
            .factories
            .get(source.handler)
            .ok_or_else(|| LoadError::UnknownHandler(source.handler.to_string()))?;
        factory(source)
    }
}

/// Loads TOML scriptlet manifests against a [`ScriptletRegistry`]
pub struct ManifestLoader {
    registry: Arc<ScriptletRegistry>,
}

impl ManifestLoader {
    pub const fn new(registry: Arc<ScriptletRegistry>) -> Self {
        Self { registry }
    }

    /// Parse manifest text; split out so it can be tested without files
    pub fn parse(&self, path: &Path, text: &str) -> Result<Scriptlet, LoadError> {
        let manifest: ScriptletManifest = toml::from_str(text)?;
        let source = ScriptletSource {
            path,
            handler: &manifest.handler,
            params: &manifest.params,
        };
        let handler = self.registry.build(&source)?;
        Ok(Scriptlet {
            handler,
            cacheable: manifest.cacheable,
        })
    }
}

impl Default for ManifestLoader {
    fn default() -> Self {
        Self::new(Arc::new(ScriptletRegistry::with_builtins()))
    }
}

impl ModuleLoader for ManifestLoader {
    fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Scriptlet, LoadError>> {
        async move {
            logger::log_verbose(&format!("Loading scriptlet: {}", path.display()));
            let text = tokio::fs::read_to_string(path).await?;
            self.parse(path, &text)
        }
        .boxed()
    }
}
