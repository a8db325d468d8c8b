//! Configuration loading and parsing for the buffer core.
//!
//! Parses `limn.toml`, preferring one in the working directory before the
//! platform config directory. Only buffer-core tunables live here: the undo
//! history window and display-path compaction. Unknown fields are ignored so
//! the file can grow without tripping older builds, and a file that fails to
//! parse falls back to defaults rather than blocking startup.

use std::{fs, path::PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct UndoConfig {
    /// Committed undo groups retained per buffer; 0 = unlimited.
    #[serde(default = "UndoConfig::default_group_limit")]
    pub group_limit: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            group_limit: Self::default_group_limit(),
        }
    }
}

impl UndoConfig {
    const fn default_group_limit() -> usize {
        200
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// Shorten file-backed buffer names relative to cwd / home.
    #[serde(default = "DisplayConfig::default_compact_paths")]
    pub compact_paths: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            compact_paths: Self::default_compact_paths(),
        }
    }
}

impl DisplayConfig {
    const fn default_compact_paths() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub undo: UndoConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Default, Clone)]
pub struct Config {
    /// Original file contents, when a file was read.
    pub raw: Option<String>,
    /// Parsed (or default) data.
    pub file: ConfigFile,
}

/// Best-effort config path: `./limn.toml` first, then the platform config
/// directory.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("limn.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("limn").join("limn.toml");
    }
    PathBuf::from("limn.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config {
                raw: Some(content),
                file,
            })
        }
        Err(error) => {
            warn!(target: "config", path = %path.display(), %error, "config_parse_failed");
            Ok(Config::default())
        }
    }
}
