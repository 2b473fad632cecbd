//! Configuration loading for the `svdrp` tool.
//!
//! Settings come from, in order of precedence:
//! 1. The TOML file given with `--config`, or `svdrp.toml` in the current directory
//! 2. Environment variables (`SVDRP_*`, timeouts in milliseconds)
//! 3. Default values
//!
//! Command line `--host`/`--port` are applied on top by the binary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::client::ConnectionConfig;

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "svdrp.toml";

const DEFAULT_RETENTION_DAYS: u64 = 7;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Everything the binary needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Config file the settings were read from, if any.
    pub source: Option<PathBuf>,
    pub connection: ConnectionConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Write a daily log file here. Console only if unset.
    pub log_dir: Option<PathBuf>,
    pub retention_days: u64,
    /// Default filter when `RUST_LOG` is not set.
    pub level: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_dir: None,
            retention_days: DEFAULT_RETENTION_DAYS,
            level: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, Deserialize, Default)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
    connect_timeout_ms: Option<u64>,
    read_timeout_ms: Option<u64>,
    quit_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingSection {
    log_dir: Option<String>,
    retention_days: Option<u64>,
    level: Option<String>,
}

/// Load settings, reading a config file if one is found.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let env = load_from_env(|name| std::env::var(name).ok());

    match find_config_file(explicit) {
        Some(path) => {
            let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let file: ConfigFile =
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;
            let mut settings = apply_file(env, file);
            settings.source = Some(path);
            Ok(settings)
        }
        None => Ok(Settings {
            source: None,
            connection: env,
            logging: LoggingSettings::default(),
        }),
    }
}

fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let path = PathBuf::from(DEFAULT_CONFIG_FILE);
    path.exists().then_some(path)
}

/// Overlay file values on a base connection config.
fn apply_file(base: ConnectionConfig, file: ConfigFile) -> Settings {
    let server = file.server;
    let connection = ConnectionConfig {
        host: server.host.unwrap_or(base.host),
        port: server.port.unwrap_or(base.port),
        connect_timeout: server
            .connect_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(base.connect_timeout),
        read_timeout: server
            .read_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(base.read_timeout),
        quit_timeout: server
            .quit_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(base.quit_timeout),
    };

    let logging = LoggingSettings {
        log_dir: file.logging.log_dir.map(PathBuf::from),
        retention_days: file
            .logging
            .retention_days
            .unwrap_or(DEFAULT_RETENTION_DAYS),
        level: file.logging.level,
    };

    Settings {
        source: None,
        connection,
        logging,
    }
}

/// Build a connection config from `SVDRP_*` variables over the defaults.
fn load_from_env<F>(var: F) -> ConnectionConfig
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ConnectionConfig::default();
    let millis = |name: &str, default: Duration| {
        var(name)
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(default)
    };

    ConnectionConfig {
        host: var("SVDRP_HOST").unwrap_or(defaults.host),
        port: var("SVDRP_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port),
        connect_timeout: millis("SVDRP_CONNECT_TIMEOUT", defaults.connect_timeout),
        read_timeout: millis("SVDRP_READ_TIMEOUT", defaults.read_timeout),
        quit_timeout: millis("SVDRP_QUIT_TIMEOUT", defaults.quit_timeout),
    }
}
