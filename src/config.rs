use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "mysic";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
}

/// Remote music-discovery service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// When false every read goes straight to the local dataset
    pub enabled: bool,
    pub base_url: String,
    pub api_path: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://openwhyd.org".to_string(),
            api_path: "/api".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Bundled dataset and result sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Dataset JSON (empty = default data dir)
    pub dataset_path: Option<String>,
    pub search_limit: usize,
    pub hot_limit: usize,
    /// Hot tracks scanned to build artist recommendations
    pub artist_seed_limit: usize,
    pub track_cache_size: usize,
    pub fallback_cover: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dataset_path: None,
            search_limit: 20,
            hot_limit: 10,
            artist_seed_limit: 20,
            track_cache_size: 500,
            fallback_cover: "/assets/images/fallback.svg".to_string(),
        }
    }
}

/// Durable storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file (empty = default data dir)
    pub path: Option<String>,
    /// Maximum play history entries kept
    pub history_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            history_size: 500,
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR_NAME);

        fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from `path`, writing defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;

            let config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;

            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Resolved dataset location
    pub fn dataset_path(&self) -> Result<PathBuf> {
        match &self.catalog.dataset_path {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Ok(data_dir()?.join("data.json")),
        }
    }

    /// Resolved database location
    pub fn storage_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => {
                let dir = data_dir()?;
                fs::create_dir_all(&dir).context("Failed to create data directory")?;
                Ok(dir.join("storage.redb"))
            }
        }
    }

    /// Generate example config content for documentation
    pub fn example_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn data_dir() -> Result<PathBuf> {
    Ok(dirs::data_dir()
        .context("Failed to get data directory")?
        .join(APP_DIR_NAME))
}
