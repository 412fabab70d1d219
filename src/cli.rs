//! Command line interface
//!
//! Values given here override the configuration file and `ROOTSERVE_*`
//! environment variables.

use crate::logger::LogLevel;
use clap::Parser;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};

/// Serve a directory tree of request handlers over HTTP
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "rootserve", version, about)]
pub struct Cli {
    /// Code roots searched for scriptlets, highest priority first
    #[arg(value_name = "ROOT")]
    pub roots: Vec<String>,

    /// Static root served as plain files (repeatable)
    #[arg(short = 's', long = "static", value_name = "DIR")]
    pub static_roots: Vec<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Reload handlers on every request
    #[arg(long)]
    pub dev: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,
}

impl Cli {
    /// Default configuration file, looked up as `rootserve.toml`
    pub const DEFAULT_CONFIG: &'static str = "rootserve";

    pub fn config_path(&self) -> &str {
        self.config.as_deref().unwrap_or(Self::DEFAULT_CONFIG)
    }

    /// Layer command line values over a configuration builder
    pub fn apply(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let mut builder = builder
            .set_override_option("server.port", self.port.map(i64::from))?
            .set_override_option("server.host", self.host.clone())?
            .set_override_option("logging.level", self.log_level.map(|l| l.to_string()))?;

        if !self.roots.is_empty() {
            builder = builder.set_override("mounts.roots", self.roots.clone())?;
        }
        if !self.static_roots.is_empty() {
            builder = builder.set_override("mounts.static_roots", self.static_roots.clone())?;
        }
        if self.dev {
            builder = builder.set_override("resolver.dev_mode", true)?;
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::parse_from([
            "rootserve",
            "app",
            "lib",
            "-s",
            "public",
            "--static",
            "assets",
            "-p",
            "9000",
            "--log-level",
            "verbose",
            "--dev",
        ]);
        assert_eq!(cli.roots, ["app", "lib"]);
        assert_eq!(cli.static_roots, ["public", "assets"]);
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.log_level, Some(LogLevel::Verbose));
        assert!(cli.dev);
        assert_eq!(cli.config_path(), "rootserve");
    }

    #[test]
    fn test_log_level_alias() {
        let cli = Cli::parse_from(["rootserve", "--log-level", "error"]);
        assert_eq!(cli.log_level, Some(LogLevel::Err));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["rootserve", "-p", "http"]).is_err());
    }
}
