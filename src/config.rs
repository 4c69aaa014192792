//! Configuration for toplevel peers
//!
//! Loads optional overrides from `~/.config/xtoplevel/config.toml` and the
//! process environment. Nothing is ever written back; a missing file just
//! means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable whose presence forces non-reparenting behaviour
pub const ENV_NON_REPARENTING: &str = "XTOPLEVEL_NONREPARENTING";

/// Environment variable whose presence enables the static-gravity workaround
pub const ENV_STATIC_GRAVITY: &str = "XTOPLEVEL_STATIC_GRAVITY";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub insets: InsetsConfig,
    pub grab: GrabConfig,
}

impl Config {
    /// Load configuration from the user config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            Some(path) => {
                debug!("Config file not found at {:?}, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var_os(name).is_some());
        Ok(config)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid configuration")?;
        debug!("Config: {:?}", config);
        Ok(config)
    }

    /// Apply presence-only overrides. `is_set` answers whether a variable exists.
    pub fn apply_env(&mut self, is_set: impl Fn(&str) -> bool) {
        if is_set(ENV_NON_REPARENTING) {
            info!("{} set, treating window manager as non-reparenting", ENV_NON_REPARENTING);
            self.detection.non_reparenting = true;
        }
        if is_set(ENV_STATIC_GRAVITY) {
            info!("{} set, enabling static gravity workaround", ENV_STATIC_GRAVITY);
            self.detection.static_gravity = true;
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("xtoplevel").join("config.toml"))
    }
}

/// Window manager detection overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Treat the running window manager as non-reparenting regardless of identity
    pub non_reparenting: bool,
    /// Take ConfigureNotify positions as root coordinates even when reparented
    pub static_gravity: bool,
    /// Server vendor substrings that mean no window manager can be running
    pub no_wm_vendors: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            non_reparenting: false,
            static_gravity: false,
            no_wm_vendors: vec!["eXcursion".to_string()],
        }
    }
}

/// Inset negotiation limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsetsConfig {
    /// Attribute re-query attempts while waiting for the WM to settle a reparent
    pub retry_limit: u32,
    /// Largest believable border on any side, in pixels
    pub max_inset: i32,
}

impl Default for InsetsConfig {
    fn default() -> Self {
        Self {
            retry_limit: 10,
            max_inset: 100,
        }
    }
}

/// Input grab behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Keep logical grab state but never take a native pointer/keyboard grab
    pub disable_grab: bool,
}
