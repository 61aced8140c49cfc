//! Process configuration loaded from TOML.
//!
//! ```toml
//! listen = "0.0.0.0:3000"
//!
//! [log]
//! level = "info"
//! create_file = true
//! rotation = "daily"
//! max_files = 30
//! ```
//!
//! Every key is optional.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;
use crate::logging::LogConfig;
use crate::paths;

/// File name looked up in [`paths::install_dir`] by [`Config::discover`].
pub const FILE_NAME: &str = "relay.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: SocketAddr,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        Self::from_toml(&fs::read_to_string(path)?)
    }

    /// Loads `<install_dir>/relay.toml`, or the defaults when there is none.
    pub fn discover() -> Result<Self, Error> {
        let path = paths::install_dir()?.join(FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}
