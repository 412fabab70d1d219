// Configuration module entry point
// Loads layered configuration and owns the shared application state

mod state;
mod types;

use crate::cli::Cli;
use crate::handler::resolver::ResolverOptions;
use crate::logger;
use crate::path;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use std::net::SocketAddr;
use std::path::Path;

// Re-export public types
pub use state::AppState;
pub use types::{Config, LoggingConfig, MountsConfig, ResolverConfig, ServerConfig};

/// Prefix of environment overrides, e.g. `ROOTSERVE_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "ROOTSERVE";

impl Config {
    /// Load configuration from specified file path
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        Self::builder(config_path)?.build()?.try_deserialize()
    }

    /// Load file and environment configuration, then apply command line overrides
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        cli.apply(Self::builder(cli.config_path())?)?
            .build()?
            .try_deserialize()
    }

    fn builder(config_path: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("mounts.roots")
                    .with_list_parse_key("mounts.static_roots")
                    .with_list_parse_key("mounts.index_files")
                    .with_list_parse_key("mounts.static_index_files"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.keep_alive", true)?
            .set_default("logging.level", "request")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("mounts.index_files", types::default_index_files())?
            .set_default("mounts.static_index_files", types::default_static_index_files())?
            .set_default("resolver.dev_mode", false)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// What the handler resolver needs from the configuration
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            roots: self.mounts.roots.clone(),
            static_roots: self.mounts.static_roots.clone(),
            index_files: self.mounts.index_files.clone(),
            static_index_files: self.mounts.static_index_files.clone(),
            dev_mode: self.resolver.dev_mode,
            not_found_message: self.resolver.not_found_message.clone(),
        }
    }

    /// Warn about settings that load but cannot serve anything useful
    pub fn validate(&self) -> bool {
        let mut ok = true;
        if let Err(e) = self.get_socket_addr() {
            logger::log_warning(&e);
            ok = false;
        }
        if self.mounts.roots.is_empty() && self.mounts.static_roots.is_empty() {
            logger::log_warning("No code or static roots configured; every request will 404");
            ok = false;
        }
        for raw in self.mounts.roots.iter().chain(&self.mounts.static_roots) {
            let root = path::normalize(raw);
            if !Path::new(&root).is_dir() {
                logger::log_warning(&format!("Root {raw} ({root}) is not a directory"));
                ok = false;
            }
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;
    use clap::Parser;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let config = Config::load_from(missing.to_str().unwrap()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(config.server.workers.is_none());
        assert_eq!(config.logging.level, LogLevel::Request);
        assert_eq!(config.logging.access_log_format, "combined");
        assert_eq!(config.mounts.index_files, ["index.toml"]);
        assert_eq!(config.mounts.static_index_files, ["index.html", "index.htm"]);
        assert!(!config.resolver.dev_mode);
        assert!(!config.validate());
    }

    #[test]
    fn test_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rootserve.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9090
workers = 4

[logging]
level = "verbose"
access_log_format = "json"

[mounts]
roots = ["app", "lib"]
static_roots = ["public"]

[resolver]
not_found_message = "Nothing here"

[mime]
webmanifest = "application/manifest+json"
"#,
        )
        .unwrap();

        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.workers, Some(4));
        assert_eq!(config.logging.level, LogLevel::Verbose);
        assert_eq!(config.mounts.roots, ["app", "lib"]);
        assert_eq!(config.mime["webmanifest"], "application/manifest+json");

        let options = config.resolver_options();
        assert_eq!(options.static_roots, ["public"]);
        assert_eq!(options.not_found_message.as_deref(), Some("Nothing here"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(&path, "[server]\nport = 9090\n[mounts]\nroots = [\"app\"]\n").unwrap();

        let cli = Cli::parse_from([
            "rootserve",
            "other",
            "-c",
            path.to_str().unwrap(),
            "-p",
            "7000",
            "--dev",
        ]);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.mounts.roots, ["other"]);
        assert!(config.resolver.dev_mode);
    }

    #[test]
    fn test_socket_addr() {
        let mut config = Config::default();
        assert_eq!(config.get_socket_addr().unwrap().port(), 8080);
        config.server.host = "not a host".to_string();
        assert!(config.get_socket_addr().is_err());
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();

        let mut config = Config::default();
        assert!(!config.validate());

        config.mounts.roots = vec![root.clone()];
        config.mounts.static_roots = vec![format!("{root}/public/..")];
        assert!(config.validate());

        config.mounts.static_roots.push(format!("{root}/missing"));
        assert!(!config.validate());
    }
}
