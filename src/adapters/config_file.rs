//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] on a single JSON document.  A missing file
//! yields defaults; fields absent from the file keep their defaults.
//! Both load and save validate before accepting a config.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::BusyLightConfig;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<BusyLightConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("no config at {}, using defaults", self.path.display());
                return Ok(BusyLightConfig::default());
            }
            Err(e) => {
                warn!("could not read {}: {}", self.path.display(), e);
                return Err(ConfigError::IoError);
            }
        };
        let config: BusyLightConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("config {} unreadable: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        config.validate()?;
        info!("loaded config from {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &BusyLightConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let text = serde_json::to_string_pretty(config).map_err(|_| ConfigError::Corrupted)?;
        fs::write(&self.path, text).map_err(|e| {
            warn!("could not write {}: {}", self.path.display(), e);
            ConfigError::IoError
        })
    }
}
