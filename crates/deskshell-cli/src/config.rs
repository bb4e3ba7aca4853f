use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

pub const DEFAULT_KEYRING_SERVICE: &str = "deskshell";
pub const DEFAULT_KEYRING_ACCOUNT: &str = "settings-key";

/// User-level configuration loaded from `~/.config/deskshell/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Override for the directory holding `settings.enc` / `settings.json`.
    pub data_dir: Option<PathBuf>,
    /// Remove plaintext settings once an encrypted copy is known good.
    #[serde(default)]
    pub purge_stale_legacy: bool,
    /// Where the settings data key lives in the OS keychain.
    pub keyring: Option<KeyringConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct KeyringConfig {
    pub service: Option<String>,
    pub account: Option<String>,
}

impl Config {
    pub fn keyring_service(&self) -> &str {
        self.keyring
            .as_ref()
            .and_then(|k| k.service.as_deref())
            .unwrap_or(DEFAULT_KEYRING_SERVICE)
    }

    pub fn keyring_account(&self) -> &str {
        self.keyring
            .as_ref()
            .and_then(|k| k.account.as_deref())
            .unwrap_or(DEFAULT_KEYRING_ACCOUNT)
    }
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("deskshell").join("config.toml"))
}

/// Write the given config to the default path unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_to_path_if_missing(config, &default_path()?)
}

/// Never clobbers an existing file, to avoid losing user edits.
pub fn write_to_path_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
