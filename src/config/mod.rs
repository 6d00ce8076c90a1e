//! # Configuration Management Module
//!
//! TOML configuration for the guildquest binary. Every section has serde
//! defaults, so a partial file (or none at all, via [`Config::default`]) is
//! enough to run.
//!
//! ## Configuration Structure
//!
//! - [`ServiceConfig`] - Display name of the installation
//! - [`StorageConfig`] - Data directory and sled settings
//! - [`ProgressionConfig`] - Level thresholds and leaderboard size
//! - [`LoggingConfig`] - Log level and optional log file
//! - [`SecurityConfig`] - Argon2 password hashing parameters
//!
//! ## Usage
//!
//! ```rust,no_run
//! use guildquest::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("guildquest.toml").await?;
//!     let config = Config::load("guildquest.toml").await?;
//!     println!("XP per level: {}", config.progression.xp_per_level);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [service]
//! name = "Household Guilds"
//!
//! [storage]
//! data_dir = "./data"
//!
//! [progression]
//! xp_per_level = 100
//! leaderboard_limit = 100
//!
//! [logging]
//! level = "info"
//! file = "guildquest.log"
//!
//! [security.argon2]
//! memory_kib = 19456
//! time_cost = 2
//! parallelism = 1
//! ```

use anyhow::{anyhow, Result};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::game::leaderboard::DEFAULT_LEADERBOARD_LIMIT;
use crate::game::progression::{ProgressionRules, DEFAULT_XP_PER_LEVEL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub progression: ProgressionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: Option<SecurityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "guildquest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Override for the sled database path; defaults to `<data_dir>/guildquest.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
    /// Sled page cache in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_capacity: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            db_path: None,
            cache_capacity: None,
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("guildquest.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default = "default_xp_per_level")]
    pub xp_per_level: u64,
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: usize,
}

fn default_xp_per_level() -> u64 {
    DEFAULT_XP_PER_LEVEL
}

fn default_leaderboard_limit() -> usize {
    DEFAULT_LEADERBOARD_LIMIT
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            xp_per_level: default_xp_per_level(),
            leaderboard_limit: default_leaderboard_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("guildquest.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Argon2Config {
    #[serde(default)]
    pub memory_kib: Option<u32>,
    #[serde(default)]
    pub time_cost: Option<u32>,
    #[serde(default)]
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub argon2: Option<Argon2Config>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Load the file if it exists. A missing file yields `None`; a file that
    /// exists but cannot be read or parsed is an error.
    pub async fn load_if_present(path: &str) -> Result<Option<Self>> {
        if !Path::new(path).exists() {
            return Ok(None);
        }
        Config::load(path).await.map(Some)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn progression_rules(&self) -> ProgressionRules {
        ProgressionRules::new(self.progression.xp_per_level)
    }

    /// Argon2id hasher built from `[security.argon2]`, library defaults otherwise.
    pub fn password_hasher(&self) -> Argon2<'static> {
        match self.security.as_ref().and_then(|s| s.argon2.as_ref()) {
            Some(a) => crate::game::argon2_hasher(a.memory_kib, a.time_cost, a.parallelism),
            None => Argon2::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            service: ServiceConfig::default(),
            storage: StorageConfig::default(),
            progression: ProgressionConfig::default(),
            logging: LoggingConfig::default(),
            security: Some(SecurityConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.progression.xp_per_level, 100);
        assert_eq!(config.progression.leaderboard_limit, 100);
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.storage.database_path(),
            PathBuf::from("./data").join("guildquest.db")
        );
        assert_eq!(config.progression_rules(), ProgressionRules::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [progression]
            xp_per_level = 250

            [storage]
            data_dir = "/var/lib/guildquest"
            db_path = "/tmp/gq.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.progression.xp_per_level, 250);
        assert_eq!(config.progression.leaderboard_limit, 100);
        assert_eq!(config.service.name, "guildquest");
        assert_eq!(config.storage.database_path(), PathBuf::from("/tmp/gq.db"));
        assert!(config.security.is_none());
    }

    #[test]
    fn test_zero_xp_per_level_is_clamped() {
        let mut config = Config::default();
        config.progression.xp_per_level = 0;
        assert_eq!(config.progression_rules().xp_per_level, 1);
    }

    #[test]
    fn test_load_if_present_distinguishes_missing_from_malformed() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");
        let bad = dir.path().join("bad.toml");
        std::fs::write(
            &bad,
            "[storage]\ndata_dir = \"./mydata\"\n\n[progression]\nxp_per_level = \"oops\"\n",
        )
        .unwrap();
        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[progression]\nxp_per_level = 40\n").unwrap();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let absent = Config::load_if_present(missing.to_str().unwrap()).await.unwrap();
            assert!(absent.is_none());

            let err = Config::load_if_present(bad.to_str().unwrap()).await.unwrap_err();
            assert!(err.to_string().contains("Failed to parse config file"));

            let loaded = Config::load_if_present(good.to_str().unwrap())
                .await
                .unwrap()
                .expect("present");
            assert_eq!(loaded.progression.xp_per_level, 40);
        });
    }

    #[test]
    fn test_create_default_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guildquest.toml");
        let path = path.to_str().unwrap();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            Config::create_default(path).await.unwrap();
            let loaded = Config::load(path).await.unwrap();
            assert_eq!(loaded.service.name, "guildquest");
            assert_eq!(loaded.logging.file.as_deref(), Some("guildquest.log"));
            assert!(Config::load("/nonexistent/guildquest.toml").await.is_err());
        });
    }
}
