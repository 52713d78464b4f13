use std::fs;
use std::path::Path;

use cadence_core::Config;

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "config.toml";

/// Read `config.toml` from `dir`. A missing file yields the defaults;
/// out-of-range values are repaired with a warning.
pub fn load_config(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no {} found, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(e) => return Err(StoreError::Io(e)),
    };
    let config: Config = toml::from_str(&content)?;
    tracing::info!("loaded config from {}", path.display());
    Ok(config.sanitized())
}
