//! Hierarchical configuration loader
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. Global config (`~/.lunar/lunar.yaml`)
//! 3. Project config (`./lunar.yaml`, or an explicit path)
//! 4. Environment variables (`LUNAR_*` prefix)
//! 5. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::Version;
use crate::utils::get_home_dir;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use tracing::debug;

/// Configuration file name searched in the global and project locations
pub const CONFIG_FILE_NAME: &str = "lunar.yaml";

/// Default grace delay before a root patch group is unapplied
const DEFAULT_UNPATCH_DELAY_SECS: u64 = 0;

/// Effective Lunar configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LunarConfig {
    /// Directory holding installed packages
    pub mods_dir: Option<Utf8PathBuf>,

    /// Running host version used for `MinGameVersion` checks
    pub host_version: Option<Version>,

    /// Default grace delay for root patch groups
    pub unpatch_delay_secs: u64,

    /// Move legacy assemblies into `Backup/` during preparation
    pub cleanup_old_assemblies: bool,

    /// Module names reported as already present in the host
    pub preloaded_modules: Vec<String>,

    /// Log filter used when neither `-v` nor `RUST_LOG` is given
    pub log_level: Option<String>,
}

impl Default for LunarConfig {
    fn default() -> Self {
        Self {
            mods_dir: None,
            host_version: None,
            unpatch_delay_secs: DEFAULT_UNPATCH_DELAY_SECS,
            cleanup_old_assemblies: true,
            preloaded_modules: Vec::new(),
            log_level: None,
        }
    }
}

/// Partial config as written in a file; absent keys leave lower layers intact
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    mods_dir: Option<Utf8PathBuf>,
    host_version: Option<Version>,
    unpatch_delay_secs: Option<u64>,
    cleanup_old_assemblies: Option<bool>,
    preloaded_modules: Option<Vec<String>>,
    log_level: Option<String>,
}

impl LunarConfig {
    /// Load configuration from every source
    ///
    /// An explicit `path` must exist; the implicit global and project files
    /// are optional.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global) = Self::global_config_path() {
            if global.exists() {
                config.merge(Self::read_layer(&global)?);
            }
        }

        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::config_not_found(p.as_str()));
                }
                config.merge(Self::read_layer(p)?);
            }
            None => {
                let local = Utf8PathBuf::from(CONFIG_FILE_NAME);
                if local.exists() {
                    config.merge(Self::read_layer(&local)?);
                }
            }
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse a single YAML document on top of the defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        let layer: ConfigLayer = serde_yaml_ng::from_str(content)?;
        let mut config = Self::default();
        config.merge(layer);
        Ok(config)
    }

    /// `~/.lunar/lunar.yaml`, if a home directory can be determined
    pub fn global_config_path() -> Option<Utf8PathBuf> {
        let home = get_home_dir().ok()?;
        let home = Utf8PathBuf::from_path_buf(home).ok()?;
        Some(home.join(".lunar").join(CONFIG_FILE_NAME))
    }

    fn read_layer(path: &Utf8Path) -> Result<ConfigLayer> {
        debug!("Loading config layer from {}", path);
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    fn merge(&mut self, layer: ConfigLayer) {
        if layer.mods_dir.is_some() {
            self.mods_dir = layer.mods_dir;
        }
        if layer.host_version.is_some() {
            self.host_version = layer.host_version;
        }
        if let Some(delay) = layer.unpatch_delay_secs {
            self.unpatch_delay_secs = delay;
        }
        if let Some(cleanup) = layer.cleanup_old_assemblies {
            self.cleanup_old_assemblies = cleanup;
        }
        if let Some(modules) = layer.preloaded_modules {
            self.preloaded_modules = modules;
        }
        if layer.log_level.is_some() {
            self.log_level = layer.log_level;
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("LUNAR_MODS_DIR") {
            self.mods_dir = Some(Utf8PathBuf::from(val));
        }

        if let Ok(val) = env::var("LUNAR_HOST_VERSION") {
            self.host_version = Some(val.parse().map_err(|_| {
                Error::invalid_config("LUNAR_HOST_VERSION must be a dotted version")
            })?);
        }

        if let Ok(val) = env::var("LUNAR_UNPATCH_DELAY_SECS") {
            self.unpatch_delay_secs = val.parse().map_err(|_| {
                Error::invalid_config("LUNAR_UNPATCH_DELAY_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("LUNAR_CLEANUP_OLD_ASSEMBLIES") {
            self.cleanup_old_assemblies = val.parse().map_err(|_| {
                Error::invalid_config("LUNAR_CLEANUP_OLD_ASSEMBLIES must be true or false")
            })?;
        }

        if let Ok(val) = env::var("LUNAR_PRELOADED_MODULES") {
            self.preloaded_modules = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(val) = env::var("LUNAR_LOG_LEVEL") {
            self.log_level = Some(val);
        }

        Ok(())
    }
}
