// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{FlatwatchError, Result};
use crate::watch::patterns::validate_patterns;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::FlatwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.watcher, raw.watch))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watcher_section(cfg)?;
    validate_requests(cfg)?;
    Ok(())
}

fn validate_watcher_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watcher.batch_delay_ms == 0 {
        return Err(FlatwatchError::ConfigError(
            "[watcher].batch_delay_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_requests(cfg: &RawConfigFile) -> Result<()> {
    for (index, request) in cfg.watch.iter().enumerate() {
        if !request.path.is_absolute() {
            return Err(FlatwatchError::ConfigError(format!(
                "watch entry #{} has a relative path '{}'; paths must be absolute",
                index + 1,
                request.path.display()
            )));
        }
        validate_patterns(&request.includes)?;
        validate_patterns(&request.excludes)?;
    }
    Ok(())
}
