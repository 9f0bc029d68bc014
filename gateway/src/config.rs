//! Command-line and environment configuration.
//!
//! Each flag falls back to an environment variable, then to a default. The
//! rules directory defaults to the working directory and must contain
//! `rules/main.conf`; schemas are served from `<rules-dir>/schemas`.
//!
//! Deployments configured with `-rulesDir` / `CORAZA_RULES_DIR` keep working:
//! those names are accepted as a hidden fallback after `--rules-dir` /
//! `VALIDATION_RULES_DIR`.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;

pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Parser)]
#[command(name = "validation-gateway")]
#[command(about = "HTTP gateway that checks requests against an inspection rule set", long_about = None)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "VALIDATION_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Directory containing rules/main.conf and schemas/ (defaults to the working directory)
    #[arg(long, env = "VALIDATION_RULES_DIR")]
    pub rules_dir: Option<PathBuf>,

    #[arg(long = "rulesDir", env = "CORAZA_RULES_DIR", hide = true)]
    pub legacy_rules_dir: Option<PathBuf>,

    /// Largest request body buffered for inspection
    #[arg(long, env = "VALIDATION_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

/// Configuration with every path derived and checked.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub bind: IpAddr,
    pub rules_dir: PathBuf,
    pub rules_file: PathBuf,
    pub schemas_dir: PathBuf,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let rules_dir = match self.rules_dir.or(self.legacy_rules_dir) {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(ConfigError::WorkingDir)?,
        };
        let rules_file = rules_dir.join("rules").join("main.conf");
        if !rules_file.is_file() {
            return Err(ConfigError::MissingRulesFile(rules_file));
        }

        Ok(Settings {
            port: self.port,
            bind: self.bind,
            schemas_dir: rules_dir.join("schemas"),
            rules_file,
            rules_dir,
            max_body_bytes: self.max_body_bytes,
        })
    }
}
