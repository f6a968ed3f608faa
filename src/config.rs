use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use reaper_runtime::DEFAULT_REMOVAL_DELAY;

/// Contents of `reaper.toml`. Every key is optional.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PurgeConfig {
    /// Permission node required to run `removeblock`.
    pub command_permission: String,

    // Message templates; `&` colour codes are resolved on reload.
    pub permission: String,
    pub block_name: String,
    pub unknown_block_name: String,
    pub unknown_world_name: String,
    pub blocks_deleted: String,
    pub reload_complete: String,
    pub reload_failed: String,
    pub not_ready: String,

    #[serde(rename = "dont-remove-blocks-placed-by-players")]
    pub track_placed_blocks: bool,
    pub remove_on_chunk_load: bool,
    #[serde(rename = "world-guard-protection", alias = "region-protection")]
    pub region_protection: bool,
    #[serde(rename = "remove-blocks-on-chunk-load")]
    pub watched_materials: Vec<String>,
    pub removal_delay_ticks: u64,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            command_permission: "reaper.command".to_string(),
            permission: "&cYou don't have permission to do that.".to_string(),
            block_name: "&cPlease write a block name.".to_string(),
            unknown_block_name: "&cUnknown block name!".to_string(),
            unknown_world_name: "&cUnknown world name!".to_string(),
            blocks_deleted: "&aBlocks scheduled for removal in &e%s &ans.".to_string(),
            reload_complete: "&aReload complete.".to_string(),
            reload_failed: "&cReload failed, see the console.".to_string(),
            not_ready: "&cBlock removal is not ready yet; try again after a reload.".to_string(),
            track_placed_blocks: true,
            remove_on_chunk_load: true,
            region_protection: true,
            watched_materials: vec!["SPAWNER".to_string()],
            removal_delay_ticks: DEFAULT_REMOVAL_DELAY,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: io::Error },
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => write!(f, "{}: {}", path.display(), source),
            ConfigError::Parse(e) => write!(f, "parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl PurgeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Parse)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    /// Writes the defaults to `path` unless a file is already there.
    pub fn save_default(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        let text = toml::to_string_pretty(&PurgeConfig::default()).map_err(ConfigError::Serialize)?;
        fs::write(path, text).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }
}
