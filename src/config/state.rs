// Application state module
// Shared by every connection task through an Arc

use std::sync::Arc;

use super::types::Config;
use crate::handler::{HandlerResolver, ManifestLoader, ModuleLoader, ScriptletRegistry};
use crate::http::MimeTable;
use crate::path::Normalizer;

/// Application state
pub struct AppState {
    pub config: Config,
    pub resolver: HandlerResolver,
    /// Copy of `logging.access_log`
    pub access_log: bool,
}

impl AppState {
    /// State with the built-in scriptlet handlers
    pub fn new(config: &Config) -> Self {
        Self::with_registry(config, ScriptletRegistry::with_builtins())
    }

    /// State whose manifests bind against `registry`
    pub fn with_registry(config: &Config, registry: ScriptletRegistry) -> Self {
        let loader = Arc::new(ManifestLoader::new(Arc::new(registry)));
        Self::with_loader(config, loader, &Normalizer::from_env())
    }

    /// State with an arbitrary module loader, roots normalized by `normalizer`
    pub fn with_loader(
        config: &Config,
        loader: Arc<dyn ModuleLoader>,
        normalizer: &Normalizer,
    ) -> Self {
        let resolver = HandlerResolver::new(
            config.resolver_options(),
            normalizer,
            loader,
            Arc::new(MimeTable::new(&config.mime)),
        );

        Self {
            config: config.clone(),
            resolver,
            access_log: config.logging.access_log,
        }
    }
}
