use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WorkshopError;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Https,
    Ssh,
    File,
}

/// Per-host fetch options, keyed by host name in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostOptions {
    #[serde(default)]
    pub protocol: Protocol,
    pub token: Option<String>,
    pub user: Option<String>,
    /// Replaces `<protocol>://<host>` when building repository URLs.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopConfig {
    #[serde(default)]
    pub hosts: BTreeMap<String, HostOptions>,
}

impl WorkshopConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Loads the config file, treating a missing file as an empty config.
    pub fn load(path: &Path) -> Result<Self, WorkshopError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(WorkshopError::persist("reading config", path, err)),
        };

        Self::from_toml_str(&content).map_err(|source| WorkshopError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn host_options(&self, host: &str) -> HostOptions {
        self.hosts.get(host).cloned().unwrap_or_default()
    }
}
