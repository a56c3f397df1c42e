use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dslpack_core::{WorkshopError, CONFIG_FILE_NAME};

pub const ROOT_ENV_VAR: &str = "DSLPACK_ROOT";

/// Shared per-user state: fetch cache, materialized packages and host config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkshopLayout {
    root: PathBuf,
}

impl WorkshopLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn ensure_base_dirs(&self) -> Result<(), WorkshopError> {
        for dir in [self.cache_dir(), self.packages_dir()] {
            fs::create_dir_all(&dir)
                .map_err(|err| WorkshopError::persist("creating workshop directory", &dir, err))?;
        }
        Ok(())
    }
}

pub fn default_workshop_root() -> Result<PathBuf> {
    if let Some(root) = std::env::var_os(ROOT_ENV_VAR).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows workshop root")?;
        return Ok(PathBuf::from(app_data).join("Dslpack"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve workshop root")?;
    Ok(PathBuf::from(home).join(".dslpack"))
}
