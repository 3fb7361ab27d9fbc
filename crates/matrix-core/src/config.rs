use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::rain::{DEFAULT_FADE, DEFAULT_GLYPHS, DEFAULT_RESET_CHANCE};

pub const SERVER_URL_ENV: &str = "MATRIX_AI_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    /// Delay after a successful send before the speaking flag clears
    pub reply_settle_ms: u64,
    /// Reveal speed for assistant entries
    pub reveal_ms: u64,
    /// Reveal speed for the welcome banner
    pub welcome_reveal_ms: u64,
    pub rain: RainConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RainConfig {
    pub enabled: bool,
    pub frame_ms: u64,
    pub glyph_size: u32,
    pub reset_chance: f64,
    pub fade: f32,
    pub glyphs: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frame_ms: 35,
            glyph_size: 1,
            reset_chance: DEFAULT_RESET_CHANCE,
            fade: DEFAULT_FADE,
            glyphs: DEFAULT_GLYPHS.to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            server_url: "http://localhost:5000".to_string(),
            reply_settle_ms: 2000,
            reveal_ms: 30,
            welcome_reveal_ms: 50,
            rain: RainConfig::default(),
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Missing file means defaults; a file that fails to parse is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Environment wins over the file
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                self.server_url = url.trim().to_string();
            }
        }
    }

    pub fn reply_settle(&self) -> Duration {
        Duration::from_millis(self.reply_settle_ms)
    }

    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_ms)
    }

    pub fn welcome_reveal_interval(&self) -> Duration {
        Duration::from_millis(self.welcome_reveal_ms)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("matrix-ai").join("config.json"))
    }
}

impl RainConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }
}
