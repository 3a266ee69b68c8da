//! Configuration file handling for schemadiff.
//!
//! Looks for `.config/schemadiff.styx` in the current directory or any parent directory.

pub use schemadiff_config::{Config, ConnectionConfig};

use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = ".config/schemadiff.styx";

/// Load configuration from `.config/schemadiff.styx`, searching up the directory tree.
pub fn load() -> Result<(Config, PathBuf), ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(e.to_string()))?;
    load_from(&cwd)
}

/// Load configuration starting from a specific directory.
pub fn load_from(start: &Path) -> Result<(Config, PathBuf), ConfigError> {
    let config_path = find_config_file(start)?;
    let content =
        std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io(e.to_string()))?;

    let config = parse(&content)?;
    Ok((config, config_path))
}

pub fn parse(content: &str) -> Result<Config, ConfigError> {
    facet_styx::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Find `.config/schemadiff.styx` by searching up the directory tree.
fn find_config_file(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

/// Pick the connection for one side: the flag wins over the configured default.
///
/// `Ok(None)` means neither names a connection.
pub fn resolve<'a>(
    config: &'a Config,
    flag: Option<&'a str>,
    configured: Option<&'a str>,
) -> Result<Option<(&'a str, &'a ConnectionConfig)>, ConfigError> {
    let Some(name) = flag.or(configured) else {
        return Ok(None);
    };
    config
        .connection(name)
        .map(|connection| Some((name, connection)))
        .ok_or_else(|| ConfigError::UnknownConnection(name.to_string()))
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No `.config/schemadiff.styx` found in any parent directory
    #[error("No {path} found in current directory or any parent", path = CONFIG_FILE)]
    NotFound,
    /// I/O error reading the file
    #[error("Failed to read {path}: {0}", path = CONFIG_FILE)]
    Io(String),
    /// Parse error in the Styx file
    #[error("Failed to parse {path}: {0}", path = CONFIG_FILE)]
    Parse(String),
    /// A connection name that is not in the file
    #[error("No connection named '{0}' in {path}", path = CONFIG_FILE)]
    UnknownConnection(String),
}
