// Configuration types module
// Defines all configuration-related data structures

use crate::logger::LogLevel;
use serde::Deserialize;
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub mounts: MountsConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Extension to content type overrides, e.g. `webmanifest = "application/manifest+json"`
    #[serde(default)]
    pub mime: HashMap<String, String>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Worker threads; unset runs a single-threaded event loop
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_true")]
    pub keep_alive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            keep_alive: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default = "default_true")]
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            access_log: true,
            access_log_format: default_access_log_format(),
            access_log_file: None,
        }
    }
}

/// Roots searched for handlers, in priority order
#[derive(Debug, Deserialize, Clone)]
pub struct MountsConfig {
    /// Code roots holding scriptlets
    #[serde(default)]
    pub roots: Vec<String>,
    /// Static roots served as plain files
    #[serde(default)]
    pub static_roots: Vec<String>,
    /// Scriptlet a code directory coalesces to
    #[serde(default = "default_index_files")]
    pub index_files: Vec<String>,
    /// File a static directory coalesces to
    #[serde(default = "default_static_index_files")]
    pub static_index_files: Vec<String>,
}

impl Default for MountsConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            static_roots: Vec::new(),
            index_files: default_index_files(),
            static_index_files: default_static_index_files(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ResolverConfig {
    /// Reload handlers on every request instead of caching them
    #[serde(default)]
    pub dev_mode: bool,
    /// Replaces the default 404 body
    #[serde(default)]
    pub not_found_message: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

pub(super) fn default_index_files() -> Vec<String> {
    vec!["index.toml".to_string()]
}

pub(super) fn default_static_index_files() -> Vec<String> {
    vec!["index.html".to_string(), "index.htm".to_string()]
}
