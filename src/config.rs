use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable that overrides `trakt.client_id`.
pub const TRAKT_CLIENT_ID_ENV: &str = "EPISODA_TRAKT_CLIENT_ID";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub trakt: TraktConfig,

    pub tvmaze: TvmazeConfig,

    pub resolution: ResolutionConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/episoda.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraktConfig {
    pub base_url: String,

    /// API key sent as `trakt-api-key`. Prefer setting it through the environment.
    pub client_id: String,

    pub request_timeout_seconds: u64,
}

impl Default for TraktConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.trakt.tv".to_string(),
            client_id: String::new(),
            request_timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TvmazeConfig {
    pub base_url: String,

    pub request_timeout_seconds: u64,
}

impl Default for TvmazeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tvmaze.com".to_string(),
            request_timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Upper bound for any single catalog call inside the pipeline.
    pub step_timeout_seconds: u64,

    /// How long a "no artwork" answer is trusted. 0 disables the negative cache.
    pub negative_cache_hours: u32,

    /// Pause between episode lookups during a bulk show backfill.
    pub backfill_delay_ms: u64,

    /// Shows whose secondary id is being discovered at the same time.
    pub max_concurrent_discoveries: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            step_timeout_seconds: 8,
            negative_cache_hours: 24,
            backfill_delay_ms: 250,
            max_concurrent_discoveries: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 6790,
            cors_allowed_origins: vec![
                "http://localhost:6790".to_string(),
                "http://127.0.0.1:6790".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = match paths.iter().find(|path| path.exists()) {
            Some(path) => {
                info!("Loading config from: {}", path.display());
                Self::load_from_path(path)?
            }
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = std::env::var(TRAKT_CLIENT_ID_ENV)
            && !client_id.trim().is_empty()
        {
            self.trakt.client_id = client_id.trim().to_string();
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("episoda").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".episoda").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution.step_timeout_seconds == 0 {
            anyhow::bail!("resolution.step_timeout_seconds must be > 0");
        }

        if self.resolution.max_concurrent_discoveries == 0 {
            anyhow::bail!("resolution.max_concurrent_discoveries must be > 0");
        }

        if self.trakt.base_url.trim().is_empty() {
            anyhow::bail!("Trakt base URL cannot be empty");
        }

        if self.tvmaze.base_url.trim().is_empty() {
            anyhow::bail!("TVMaze base URL cannot be empty");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("min_db_connections cannot exceed max_db_connections");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.resolution.negative_cache_hours, 24);
        assert_eq!(config.resolution.max_concurrent_discoveries, 4);
        assert_eq!(config.tvmaze.base_url, "https://api.tvmaze.com");
        assert!(config.observability.metrics_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[trakt]"));
        assert!(toml_str.contains("[resolution]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [resolution]
            negative_cache_hours = 0
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.resolution.negative_cache_hours, 0);

        assert_eq!(config.resolution.step_timeout_seconds, 8);
        assert_eq!(config.trakt.base_url, "https://api.trakt.tv");
    }

    #[test]
    fn test_validate_rejects_zero_step_timeout() {
        let mut config = Config::default();
        config.resolution.step_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_discovery_cap() {
        let mut config = Config::default();
        config.resolution.max_concurrent_discoveries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_catalog_url() {
        let mut config = Config::default();
        config.tvmaze.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
